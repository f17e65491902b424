//! Errors surfaced by the detector.
//!
//! None of these end a session: a rejected tick leaves state untouched, and
//! sink failures are reported without retry.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DetectorError {
    /// Volume sample that is negative, NaN, or infinite.
    #[error("Invalid volume sample: {0}")]
    InvalidVolume(f32),

    /// The recording sink or audio pipeline refused a command.
    #[error("{command} failed: {message}")]
    Sink {
        command: &'static str,
        message: String,
    },

    /// Configuration can only change before the first tick.
    #[error("Configuration is locked once ticks have been processed")]
    ConfigLocked,
}

impl DetectorError {
    pub fn sink(command: &'static str, err: anyhow::Error) -> Self {
        Self::Sink {
            command,
            message: format!("{:#}", err),
        }
    }
}
