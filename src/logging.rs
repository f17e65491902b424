//! Tracing setup for the detector binary.
//!
//! stdout carries the IPC protocol, so console logs go to stderr. A
//! daily-rolling file is written to the per-user log directory, or to
//! `SPEECH_GATE_LOG_DIR` when set. Setting it to an empty string disables
//! file logging.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::paths::get_log_dir;

/// Environment variable selecting the log file directory.
pub const LOG_DIR_ENV: &str = "SPEECH_GATE_LOG_DIR";

/// Directory for file logs, or `None` when file logging is disabled.
pub fn resolve_log_dir() -> Option<PathBuf> {
    log_dir_from(std::env::var_os(LOG_DIR_ENV))
}

fn log_dir_from(value: Option<OsString>) -> Option<PathBuf> {
    match value {
        Some(dir) if dir.is_empty() => None,
        Some(dir) => Some(PathBuf::from(dir)),
        None => Some(get_log_dir()),
    }
}

/// Initialize logging. The returned guard flushes the file writer on drop
/// and must be kept alive for the lifetime of the process.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG overrides; defaults to info.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("speech-gate")
                .filename_suffix("log")
                .max_log_files(5)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
