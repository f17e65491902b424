//! Detector configuration and data directory paths.
//!
//! `detector_config.json` uses camelCase keys; every field is optional and
//! falls back to the defaults below.

pub mod paths;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use paths::get_data_dir;

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SPEECH_GATE_CONFIG";

/// Thresholds and timings for one detection session.
///
/// Volumes are smoothed RMS values in `[0, 1]`; durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Nominal cadence of incoming ticks; unit of the pre-roll counter.
    pub tick_interval_ms: u32,
    /// Period of the pre-roll hint while no segment is open.
    pub pre_roll_window_ms: u32,
    /// Volumes strictly above this are classified as signal.
    pub speech_min_volume: f32,
    /// Background level between mute and signal. Reported to hosts for
    /// meter display; classification itself only uses the mute and
    /// speech thresholds.
    pub silence_max_volume: f32,
    /// Volumes strictly below this are classified as mute.
    pub mute_max_volume: f32,
    /// Trailing silence that closes an open segment.
    pub max_inter_segment_silence_ms: u32,
    /// Cadence of the signal source, when it differs from `tick_interval_ms`.
    /// Only used to derive the silence timeout in ticks.
    pub sample_polling_ms: Option<u32>,
    /// Segments with less speech-bearing time than this are aborted.
    pub min_segment_duration_ms: u32,
    /// Segments quieter than this on average are aborted.
    pub min_average_segment_volume: f32,
    /// Initial value of the recording gate.
    pub recording_enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            pre_roll_window_ms: 600,
            speech_min_volume: 0.02,
            silence_max_volume: 0.001,
            mute_max_volume: 0.0001,
            max_inter_segment_silence_ms: 600,
            sample_polling_ms: None,
            min_segment_duration_ms: 400,
            min_average_segment_volume: 0.04,
            recording_enabled: true,
        }
    }
}

impl DetectorConfig {
    /// Number of consecutive silence ticks that closes a segment.
    pub fn max_silence_ticks(&self) -> u32 {
        let cadence = self.sample_polling_ms.unwrap_or(self.tick_interval_ms).max(1);
        let ticks = (self.max_inter_segment_silence_ms as f64 / cadence as f64).round() as u32;
        ticks.max(1)
    }

    /// Sanity problems the host should hear about. Nothing here is enforced.
    pub fn threshold_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.mute_max_volume >= self.silence_max_volume {
            warnings.push(format!(
                "muteMaxVolume ({}) should be below silenceMaxVolume ({})",
                self.mute_max_volume, self.silence_max_volume
            ));
        }
        if self.silence_max_volume >= self.speech_min_volume {
            warnings.push(format!(
                "silenceMaxVolume ({}) should be below speechMinVolume ({})",
                self.silence_max_volume, self.speech_min_volume
            ));
        }
        if self.tick_interval_ms == 0 && self.pre_roll_window_ms > 0 {
            warnings.push("tickIntervalMs is 0; pre-roll hints never fire".to_string());
        }
        if self.sample_polling_ms == Some(0) {
            warnings.push("samplePollingMs is 0; treated as 1".to_string());
        }
        warnings
    }
}

/// Path to detector_config.json, honouring `SPEECH_GATE_CONFIG`.
pub fn get_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => get_data_dir().join("detector_config.json"),
    }
}

/// Read the detector config, falling back to defaults when the file is
/// missing or invalid.
pub fn read_detector_config() -> DetectorConfig {
    let path = get_config_path();
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            if path.exists() {
                warn!("Using default detector config: {:#}", e);
            }
            DetectorConfig::default()
        }
    }
}

/// Load and parse a config file.
pub fn load_config_from(path: &Path) -> anyhow::Result<DetectorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}
