// src/transport/progress.rs

/// Minimum advance of the completion ratio between two reports
pub const REPORT_THRESHOLD: f64 = 0.1;

/// Coalesces byte counts into a bounded number of progress reports
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    last_reported: f64,
}

impl ProgressTracker {
    /// Track a transfer of `total` bytes; `None` disables reporting
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            received: 0,
            last_reported: 0.0,
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Record `n` more bytes; returns a ratio when it is due to be reported
    pub fn advance(&mut self, n: u64) -> Option<f64> {
        self.received = self.received.saturating_add(n);
        let total = self.total?;

        let ratio = (self.received as f64 / total as f64).min(1.0);
        if ratio - self.last_reported > REPORT_THRESHOLD {
            self.last_reported = ratio;
            Some(ratio)
        } else {
            None
        }
    }

    /// Completion report, if the last one fell short of 100%
    pub fn finish(&mut self) -> Option<f64> {
        self.total?;

        if self.last_reported < 1.0 {
            self.last_reported = 1.0;
            Some(1.0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(total: u64, steps: &[u64]) -> Vec<f64> {
        let mut tracker = ProgressTracker::new(Some(total));
        let mut reports: Vec<f64> = steps.iter().filter_map(|&n| tracker.advance(n)).collect();
        reports.extend(tracker.finish());
        reports
    }

    #[test]
    fn test_reports_are_bounded_and_spaced() {
        let reports = collect(1000, &[1; 1000]);

        assert!(reports.len() <= 11, "too many reports: {:?}", reports);
        assert_eq!(*reports.last().unwrap(), 1.0);

        let mut previous = 0.0;
        for (i, ratio) in reports.iter().enumerate() {
            let is_final = i == reports.len() - 1;
            if !is_final {
                assert!(ratio - previous > REPORT_THRESHOLD, "{:?}", reports);
            }
            assert!(*ratio > previous);
            previous = *ratio;
        }
    }

    #[test]
    fn test_large_chunks_report_each_jump() {
        let reports = collect(100, &[50, 50]);
        assert_eq!(reports, vec![0.5, 1.0]);
    }

    #[test]
    fn test_small_advance_is_not_reported() {
        let mut tracker = ProgressTracker::new(Some(100));
        assert_eq!(tracker.advance(10), None);
        assert_eq!(tracker.advance(1), Some(0.11));
        assert_eq!(tracker.advance(5), None);
    }

    #[test]
    fn test_unknown_total_never_reports() {
        let mut tracker = ProgressTracker::new(None);
        assert_eq!(tracker.advance(1 << 20), None);
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.received(), 1 << 20);
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let mut tracker = ProgressTracker::new(Some(10));
        assert_eq!(tracker.advance(20), Some(1.0));
        assert_eq!(tracker.finish(), None);
    }
}
