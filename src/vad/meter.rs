//! Smoothed RMS volume meter.
//!
//! Turns raw mono PCM frames into the scalar loudness the detector ticks on.
//! The level decays geometrically between frames, so short dips between
//! syllables do not read as silence.

/// Per-frame decay applied to the previous level.
pub const SMOOTHING_FACTOR: f32 = 0.8;

/// Root mean square of a frame. Empty frames have zero energy.
///
/// Accumulates in f64; only NaN or infinite samples give a non-finite result.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / frame.len() as f64).sqrt() as f32
}

#[derive(Debug, Clone, Default)]
pub struct VolumeMeter {
    volume: f32,
}

impl VolumeMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame and return the updated level.
    ///
    /// A frame whose level is not finite is returned as-is and leaves the
    /// meter untouched.
    pub fn update(&mut self, frame: &[f32]) -> f32 {
        let level = rms(frame);
        if !level.is_finite() {
            return level;
        }
        self.volume = level.max(self.volume * SMOOTHING_FACTOR);
        self.volume
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}
