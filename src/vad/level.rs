//! Volume classification and mic open/close edge detection.

use crate::config::DetectorConfig;

/// Loudness band of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    /// Below the mute threshold: the mic is effectively closed.
    Mute,
    /// Above the speech threshold: possibly speech.
    Signal,
    /// Mic open, but only background noise.
    Silence,
}

impl VolumeLevel {
    pub fn is_mute(self) -> bool {
        self == Self::Mute
    }
}

impl std::fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mute => write!(f, "mute"),
            Self::Signal => write!(f, "signal"),
            Self::Silence => write!(f, "silence"),
        }
    }
}

/// Map a volume sample to its level. Computed fresh on every tick.
pub fn classify(volume: f32, config: &DetectorConfig) -> VolumeLevel {
    if volume < config.mute_max_volume {
        VolumeLevel::Mute
    } else if volume > config.speech_min_volume {
        VolumeLevel::Signal
    } else {
        VolumeLevel::Silence
    }
}

/// Edge between a mute run and a non-mute run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicTransition {
    Opened,
    Closed,
}

/// Remembers the last level so mic transitions fire once per run.
#[derive(Debug, Clone)]
pub struct TransitionTracker {
    level: VolumeLevel,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self {
            level: VolumeLevel::Mute,
        }
    }

    /// Last observed level.
    pub fn level(&self) -> VolumeLevel {
        self.level
    }

    /// Record `level` and report a transition if the mute/non-mute side changed.
    pub fn observe(&mut self, level: VolumeLevel) -> Option<MicTransition> {
        let previous = std::mem::replace(&mut self.level, level);
        match (previous.is_mute(), level.is_mute()) {
            (false, true) => Some(MicTransition::Closed),
            (true, false) => Some(MicTransition::Opened),
            _ => None,
        }
    }
}

impl Default for TransitionTracker {
    fn default() -> Self {
        Self::new()
    }
}
