//! Mutable per-session state, owned by exactly one `SpeechDetector`.

use crate::config::DetectorConfig;
use crate::vad::{PreRollNotifier, SegmentTracker, TransitionTracker};

#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub current_volume: f32,
    pub transitions: TransitionTracker,
    pub segments: SegmentTracker,
    pub pre_roll: PreRollNotifier,
    /// Gate: when false, ticks are ignored.
    pub recording_enabled: bool,
    /// Set once the host has touched the gate (start, stop, resume or an
    /// explicit override). From then on the config value no longer applies.
    pub gate_overridden: bool,
    /// Whether the audio pipeline was last resumed (true) or suspended.
    pub pipeline_running: bool,
    pub ticks_processed: u64,
}

impl RuntimeState {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            current_volume: 0.0,
            transitions: TransitionTracker::new(),
            segments: SegmentTracker::new(config),
            pre_roll: PreRollNotifier::new(config),
            recording_enabled: config.recording_enabled,
            gate_overridden: false,
            pipeline_running: false,
            ticks_processed: 0,
        }
    }
}
