//! Per-user directories for the detector.
//!
//!   Windows: %APPDATA%/speech-gate/{data,logs}
//!   macOS:   ~/Library/Application Support/speech-gate/{data,logs}
//!   Linux:   $XDG_CONFIG_HOME/speech-gate/{data,logs} (default ~/.config)

use std::path::PathBuf;

const APP_DIR_NAME: &str = "speech-gate";

/// Holds `detector_config.json`.
pub fn get_data_dir() -> PathBuf {
    app_dir().join("data")
}

/// Default directory for the rolling log files.
pub fn get_log_dir() -> PathBuf {
    app_dir().join("logs")
}

fn app_dir() -> PathBuf {
    // dirs::config_dir resolves %APPDATA%, Application Support and
    // XDG_CONFIG_HOME; fall back to ~/.config, then the working directory.
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_and_logs_share_app_dir() {
        let data = get_data_dir();
        let logs = get_log_dir();
        assert!(data.ends_with("speech-gate/data"));
        assert!(logs.ends_with("speech-gate/logs"));
        assert_eq!(data.parent(), logs.parent());
    }
}
