//! Volume-threshold voice activity detection.
//!
//! - `level`: classify a volume sample and track mic open/close edges
//! - `segment`: open/close speech segments and judge them
//! - `pre_roll`: periodic hint while no segment is open
//! - `meter`: smoothed RMS loudness from raw frames

pub mod level;
pub mod meter;
pub mod pre_roll;
pub mod segment;

pub use level::{classify, MicTransition, TransitionTracker, VolumeLevel};
pub use meter::VolumeMeter;
pub use pre_roll::PreRollNotifier;
pub use segment::{
    judge, AbortReason, SegmentId, SegmentTracker, SegmentVerdict, Timestamp, Verdict,
    VerdictGates,
};
