//! Periodic pre-roll hint.
//!
//! Counts ticks independently of the segment tracker and fires once per
//! `pre_roll_window_ms` while no segment is open, so the host can start
//! buffering before speech is confirmed.

use crate::config::DetectorConfig;

#[derive(Debug, Clone)]
pub struct PreRollNotifier {
    ticks: u32,
    tick_interval_ms: u64,
    window_ms: u64,
}

impl PreRollNotifier {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            ticks: 0,
            tick_interval_ms: u64::from(config.tick_interval_ms),
            window_ms: u64::from(config.pre_roll_window_ms),
        }
    }

    /// Count one tick. Returns the number of ticks in the elapsed window when
    /// a hint should be emitted. The counter restarts at the end of every
    /// window, hint or not. With a zero tick interval the window never
    /// elapses and no hint fires.
    pub fn tick(&mut self, segment_open: bool) -> Option<u32> {
        self.ticks = self.ticks.saturating_add(1);
        if u64::from(self.ticks) * self.tick_interval_ms < self.window_ms {
            return None;
        }
        let items = std::mem::take(&mut self.ticks);
        (!segment_open).then_some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_every_window() {
        let mut notifier = PreRollNotifier::new(&DetectorConfig::default());
        let fired: Vec<usize> = (1..=36)
            .filter(|_| notifier.tick(false).is_some())
            .collect::<Vec<_>>();
        assert_eq!(fired, vec![12, 24, 36]);
    }

    #[test]
    fn test_reports_window_ticks() {
        let mut notifier = PreRollNotifier::new(&DetectorConfig::default());
        for _ in 0..11 {
            assert_eq!(notifier.tick(false), None);
        }
        assert_eq!(notifier.tick(false), Some(12));
    }

    #[test]
    fn test_open_segment_suppresses_but_resets() {
        let mut notifier = PreRollNotifier::new(&DetectorConfig::default());
        for _ in 0..11 {
            notifier.tick(true);
        }
        assert_eq!(notifier.tick(true), None);
        // Counter restarted, so the next window needs 12 more ticks.
        for _ in 0..11 {
            assert_eq!(notifier.tick(false), None);
        }
        assert_eq!(notifier.tick(false), Some(12));
    }

    #[test]
    fn test_zero_interval_never_fires() {
        let config = DetectorConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        let mut notifier = PreRollNotifier::new(&config);
        for _ in 0..100 {
            assert_eq!(notifier.tick(false), None);
        }
        notifier.ticks = u32::MAX - 1;
        assert_eq!(notifier.tick(false), None);
        assert_eq!(notifier.tick(false), None);
        assert_eq!(notifier.ticks, u32::MAX);
    }

    #[test]
    fn test_window_not_a_multiple_of_interval() {
        let config = DetectorConfig {
            tick_interval_ms: 70,
            pre_roll_window_ms: 200,
            ..Default::default()
        };
        let mut notifier = PreRollNotifier::new(&config);
        assert_eq!(notifier.tick(false), None);
        assert_eq!(notifier.tick(false), None);
        // 3 * 70 = 210 >= 200
        assert_eq!(notifier.tick(false), Some(3));
    }
}
