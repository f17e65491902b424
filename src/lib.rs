//! Volume-threshold speech detection.
//!
//! Consumes one smoothed loudness sample per tick, decides when a spoken
//! segment starts and whether it ended as valid speech or noise, and drives
//! a recording sink accordingly. See [`detector::SpeechDetector`].

pub mod config;
pub mod detector;
pub mod dispatch;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod sink;
pub mod vad;

pub use config::DetectorConfig;
pub use detector::SpeechDetector;
pub use error::DetectorError;
pub use ipc::DetectorEvent;
pub use sink::{AudioPipeline, RecordedChunk, RecordingSink};
