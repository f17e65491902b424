//! Speech segment state machine.
//!
//! A segment opens on the first signal tick and closes after
//! `max_silence_ticks` consecutive silence ticks, at which point a verdict is
//! computed from its speech-bearing duration and average volume. The tracker
//! only decides; issuing recorder commands is the dispatcher's job.

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Monotonic per-session segment identifier. Recorder commands and the
/// chunks they produce carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a segment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    TooShort,
    TooQuiet,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(f, "too short"),
            Self::TooQuiet => write!(f, "too quiet"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Abort(AbortReason),
}

/// The two acceptance thresholds a closed segment must clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerdictGates {
    pub min_duration_ms: i64,
    pub min_average_volume: f32,
}

impl VerdictGates {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_duration_ms: i64::from(config.min_segment_duration_ms),
            min_average_volume: config.min_average_segment_volume,
        }
    }
}

/// Judge a closed segment. The duration gate is checked first.
pub fn judge(active_duration_ms: i64, average_volume: f32, gates: &VerdictGates) -> Verdict {
    if active_duration_ms < gates.min_duration_ms {
        Verdict::Abort(AbortReason::TooShort)
    } else if average_volume < gates.min_average_volume {
        Verdict::Abort(AbortReason::TooQuiet)
    } else {
        Verdict::Valid
    }
}

/// Outcome of closing a segment, with the values the verdict was based on.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentVerdict {
    pub id: SegmentId,
    pub verdict: Verdict,
    /// Time from segment open to the closing silence tick.
    pub elapsed_ms: i64,
    /// `elapsed_ms` minus the trailing silence window.
    pub active_duration_ms: i64,
    pub average_volume: f32,
}

/// Volumes collected while a segment is open. Never empty: it is created
/// from the sample that opened the segment.
#[derive(Debug, Clone)]
struct SegmentSamples {
    samples: Vec<f32>,
}

impl SegmentSamples {
    fn starting_with(volume: f32) -> Self {
        Self {
            samples: vec![volume],
        }
    }

    fn push(&mut self, volume: f32) {
        self.samples.push(volume);
    }

    /// Mean volume rounded to four decimals.
    fn average(&self) -> f32 {
        let sum: f64 = self.samples.iter().map(|&v| f64::from(v)).sum();
        let mean = sum / self.samples.len() as f64;
        ((mean * 10_000.0).round() / 10_000.0) as f32
    }
}

#[derive(Debug, Clone)]
struct OpenSegment {
    id: SegmentId,
    started_at: Timestamp,
    samples: SegmentSamples,
}

#[derive(Debug, Clone)]
enum SegmentState {
    Closed,
    Open(OpenSegment),
}

/// Result of feeding a signal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalStep {
    /// Set when this tick opened a new segment.
    pub opened: Option<SegmentId>,
    /// Consecutive signal ticks, including this one.
    pub items: u32,
}

/// Result of feeding a silence tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceStep {
    /// Consecutive silence ticks, including this one.
    pub items: u32,
    /// Set on the tick that reaches the silence timeout of an open segment.
    pub verdict: Option<SegmentVerdict>,
}

#[derive(Debug, Clone)]
pub struct SegmentTracker {
    state: SegmentState,
    next_id: u64,
    last_started_at: Option<Timestamp>,
    consecutive_signal_ticks: u32,
    consecutive_silence_ticks: u32,
    max_silence_ticks: u32,
    max_inter_segment_silence_ms: i64,
    gates: VerdictGates,
}

impl SegmentTracker {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            state: SegmentState::Closed,
            next_id: 1,
            last_started_at: None,
            consecutive_signal_ticks: 0,
            consecutive_silence_ticks: 0,
            max_silence_ticks: config.max_silence_ticks(),
            max_inter_segment_silence_ms: i64::from(config.max_inter_segment_silence_ms),
            gates: VerdictGates::from_config(config),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SegmentState::Open(_))
    }

    /// Id of the open segment, if any.
    pub fn open_segment(&self) -> Option<SegmentId> {
        match &self.state {
            SegmentState::Open(segment) => Some(segment.id),
            SegmentState::Closed => None,
        }
    }

    /// Milliseconds since the most recent segment opened.
    pub fn elapsed_since_start(&self, now: Timestamp) -> Option<i64> {
        self.last_started_at.map(|start| now.saturating_sub(start))
    }

    pub fn on_signal(&mut self, volume: f32, now: Timestamp) -> SignalStep {
        self.consecutive_silence_ticks = 0;
        self.consecutive_signal_ticks += 1;

        let mut opened = None;
        match &mut self.state {
            SegmentState::Open(segment) => segment.samples.push(volume),
            SegmentState::Closed => {
                let id = SegmentId(self.next_id);
                self.next_id += 1;
                self.last_started_at = Some(now);
                self.state = SegmentState::Open(OpenSegment {
                    id,
                    started_at: now,
                    samples: SegmentSamples::starting_with(volume),
                });
                opened = Some(id);
            }
        }

        SignalStep {
            opened,
            items: self.consecutive_signal_ticks,
        }
    }

    pub fn on_silence(&mut self, now: Timestamp) -> SilenceStep {
        self.consecutive_signal_ticks = 0;
        self.consecutive_silence_ticks += 1;

        let timed_out = self.consecutive_silence_ticks == self.max_silence_ticks;
        let verdict = match &self.state {
            SegmentState::Open(segment) if timed_out => {
                let elapsed_ms = now.saturating_sub(segment.started_at);
                let active_duration_ms =
                    elapsed_ms.saturating_sub(self.max_inter_segment_silence_ms);
                let average_volume = segment.samples.average();
                Some(SegmentVerdict {
                    id: segment.id,
                    verdict: judge(active_duration_ms, average_volume, &self.gates),
                    elapsed_ms,
                    active_duration_ms,
                    average_volume,
                })
            }
            _ => None,
        };
        if verdict.is_some() {
            self.state = SegmentState::Closed;
        }

        SilenceStep {
            items: self.consecutive_silence_ticks,
            verdict,
        }
    }

    /// Drop the open segment without judging it.
    pub fn close_without_verdict(&mut self) -> Option<SegmentId> {
        match std::mem::replace(&mut self.state, SegmentState::Closed) {
            SegmentState::Open(segment) => Some(segment.id),
            SegmentState::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tracker() -> SegmentTracker {
        SegmentTracker::new(&DetectorConfig::default())
    }

    #[test]
    fn test_verdict_boundary_grid() {
        let gates = VerdictGates {
            min_duration_ms: 400,
            min_average_volume: 0.04,
        };
        let short = 399;
        let long = 400;
        let quiet = 0.0399;
        let loud = 0.04;

        assert_eq!(judge(short, quiet, &gates), Verdict::Abort(AbortReason::TooShort));
        assert_eq!(judge(short, loud, &gates), Verdict::Abort(AbortReason::TooShort));
        assert_eq!(judge(long, quiet, &gates), Verdict::Abort(AbortReason::TooQuiet));
        assert_eq!(judge(long, loud, &gates), Verdict::Valid);
    }

    #[test]
    fn test_first_signal_opens_segment() {
        let mut t = tracker();
        assert!(!t.is_open());
        assert_eq!(t.elapsed_since_start(100), None);

        let step = t.on_signal(0.05, 1_000);
        assert_eq!(step.opened, Some(SegmentId(1)));
        assert_eq!(step.items, 1);
        assert!(t.is_open());

        let step = t.on_signal(0.05, 1_050);
        assert_eq!(step.opened, None);
        assert_eq!(step.items, 2);
        assert_eq!(t.elapsed_since_start(1_100), Some(100));
    }

    #[test]
    fn test_silence_resets_signal_count() {
        let mut t = tracker();
        t.on_signal(0.05, 0);
        t.on_signal(0.05, 50);
        assert_eq!(t.on_silence(100).items, 1);
        assert_eq!(t.on_signal(0.05, 150).items, 1);
        assert_eq!(t.on_silence(200).items, 1);
    }

    #[test]
    fn test_silence_while_closed_never_judges() {
        let mut t = tracker();
        for i in 0..30 {
            let step = t.on_silence(i * 50);
            assert_eq!(step.items, i as u32 + 1);
            assert!(step.verdict.is_none());
        }
    }

    #[test]
    fn test_valid_segment_after_timeout() {
        let mut t = tracker();
        for i in 0..5 {
            t.on_signal(0.05, i * 100);
        }
        // 12 silence ticks; the last one lands 1100 ms after the open.
        let mut verdicts = Vec::new();
        for i in 0..12 {
            if let Some(v) = t.on_silence(550 + i * 50).verdict {
                verdicts.push(v);
            }
        }
        assert_eq!(verdicts.len(), 1);
        let v = &verdicts[0];
        assert_eq!(v.id, SegmentId(1));
        assert_eq!(v.elapsed_ms, 1_100);
        assert_eq!(v.active_duration_ms, 500);
        assert_eq!(v.average_volume, 0.05);
        assert_eq!(v.verdict, Verdict::Valid);
        assert!(!t.is_open());
    }

    #[test]
    fn test_timeout_fires_once_per_silence_run() {
        let mut t = tracker();
        t.on_signal(0.05, 0);
        let verdicts = (0..40)
            .filter_map(|i| t.on_silence(2_000 + i * 50).verdict)
            .count();
        assert_eq!(verdicts, 1);
    }

    #[test]
    fn test_average_is_rounded() {
        let mut samples = SegmentSamples::starting_with(0.03);
        samples.push(0.04);
        samples.push(0.04);
        assert_eq!(samples.average(), 0.0367);
    }

    #[test]
    fn test_next_segment_gets_new_id() {
        let mut t = tracker();
        t.on_signal(0.05, 0);
        for i in 0..12 {
            t.on_silence(1_000 + i * 50);
        }
        let step = t.on_signal(0.05, 5_000);
        assert_eq!(step.opened, Some(SegmentId(2)));
        assert_eq!(t.elapsed_since_start(5_010), Some(10));
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut t = tracker();
        t.on_signal(0.05, i64::MIN);
        assert_eq!(t.elapsed_since_start(i64::MAX), Some(i64::MAX));

        let verdict = (0..12)
            .filter_map(|_| t.on_silence(i64::MAX).verdict)
            .next()
            .unwrap();
        assert_eq!(verdict.elapsed_ms, i64::MAX);
        assert_eq!(verdict.active_duration_ms, i64::MAX - 600);
        assert_eq!(verdict.verdict, Verdict::Valid);

        // Clock running backwards past the lower bound.
        t.on_signal(0.05, i64::MAX);
        assert_eq!(t.elapsed_since_start(-2), Some(i64::MIN));
        let verdict = (0..12)
            .filter_map(|_| t.on_silence(-2).verdict)
            .next()
            .unwrap();
        assert_eq!(verdict.active_duration_ms, i64::MIN);
        assert_eq!(verdict.verdict, Verdict::Abort(AbortReason::TooShort));
    }

    #[test]
    fn test_close_without_verdict() {
        let mut t = tracker();
        assert_eq!(t.close_without_verdict(), None);
        t.on_signal(0.05, 0);
        assert_eq!(t.close_without_verdict(), Some(SegmentId(1)));
        assert!(!t.is_open());
        // The remaining silence run does not produce a verdict.
        for i in 0..12 {
            assert!(t.on_silence(100 + i * 50).verdict.is_none());
        }
    }

    proptest! {
        #[test]
        fn prop_signal_then_timeout_yields_one_verdict(
            signal_ticks in 1usize..40,
            extra_silence in 0usize..40,
            volume in 0.021f32..1.0,
        ) {
            let mut t = tracker();
            let mut now = 0;
            for _ in 0..signal_ticks {
                t.on_signal(volume, now);
                now += 50;
            }
            let mut verdicts = 0;
            for _ in 0..(12 + extra_silence) {
                if t.on_silence(now).verdict.is_some() {
                    verdicts += 1;
                }
                now += 50;
            }
            prop_assert_eq!(verdicts, 1);
            prop_assert!(!t.is_open());
        }

        #[test]
        fn prop_judge_is_ordered(duration in -1_000i64..2_000, average in 0.0f32..0.2) {
            let gates = VerdictGates { min_duration_ms: 400, min_average_volume: 0.04 };
            let verdict = judge(duration, average, &gates);
            if duration < 400 {
                prop_assert_eq!(verdict, Verdict::Abort(AbortReason::TooShort));
            } else if average < 0.04 {
                prop_assert_eq!(verdict, Verdict::Abort(AbortReason::TooQuiet));
            } else {
                prop_assert_eq!(verdict, Verdict::Valid);
            }
        }
    }
}
