//! Throttled performance snapshots for the UI.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum interval between emitted snapshots
const EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Display thresholds, not correctness constraints
const EXCELLENT_MS: f64 = 300.0;
const GOOD_MS: f64 = 800.0;

#[derive(Clone, Debug, Default)]
pub struct PerfSnapshot {
    pub recognition_queue: usize,
    pub translation_queue: usize,
    /// Mean over the last 20 recorded processing durations
    pub avg_processing_ms: f64,
    pub dropped_segments: u64,
}

impl PerfSnapshot {
    /// Classification band for display purposes.
    pub fn band(&self) -> &'static str {
        if self.avg_processing_ms < EXCELLENT_MS {
            "excellent"
        } else if self.avg_processing_ms < GOOD_MS {
            "good"
        } else {
            "slow"
        }
    }
}

pub struct PerformanceMonitor {
    last_emit: Mutex<Instant>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            // Backdated so the first snapshot emits immediately
            last_emit: Mutex::new(
                Instant::now()
                    .checked_sub(EMIT_INTERVAL)
                    .unwrap_or_else(Instant::now),
            ),
        }
    }

    /// True at most once per second, by wall-clock comparison against the
    /// last emission.
    pub fn should_emit(&self) -> bool {
        let mut last = self.last_emit.lock().unwrap();
        if last.elapsed() >= EMIT_INTERVAL {
            *last = Instant::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_match_thresholds() {
        let snapshot = |ms: f64| PerfSnapshot {
            avg_processing_ms: ms,
            ..Default::default()
        };
        assert_eq!(snapshot(0.0).band(), "excellent");
        assert_eq!(snapshot(299.9).band(), "excellent");
        assert_eq!(snapshot(300.0).band(), "good");
        assert_eq!(snapshot(799.9).band(), "good");
        assert_eq!(snapshot(800.0).band(), "slow");
        assert_eq!(snapshot(5000.0).band(), "slow");
    }

    #[test]
    fn emission_is_throttled() {
        let monitor = PerformanceMonitor::new();
        assert!(monitor.should_emit());
        // Immediately after emitting, the window is closed
        assert!(!monitor.should_emit());
        assert!(!monitor.should_emit());
    }
}
