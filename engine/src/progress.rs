//! Progress reporting trait.
//!
//! This module defines the SplitReporter trait, which decouples the split
//! engine from any specific front end. The console reporter in the CLI and
//! the queue reporter used by the background worker both implement it.

use std::time::{Duration, Instant};

/// Minimum spacing between FileProgress events on the event queue.
pub const PROGRESS_INTERVAL_QUEUE: Duration = Duration::from_millis(130);

/// Minimum spacing between progress lines on a console.
pub const PROGRESS_INTERVAL_CONSOLE: Duration = Duration::from_millis(50);

/// Trait for receiving progress updates from a split.
///
/// All methods are called synchronously on the thread running the split,
/// in the order documented on each hook. Every hook defaults to a no-op.
/// Reporters are notifications only: they have no way to fail the split.
pub trait SplitReporter: Send {
    /// Called once, before any part is started.
    fn on_initial_info(&self, _total_parts: u64, _total_bytes: u64) {}

    /// Called before the first byte of part `part_number` (0-based) is written.
    fn on_start_part(&self, _part_number: u64, _total_parts: u64) {}

    /// Called after part `part_number` has been flushed and closed.
    fn on_finish_part(&self, _part_number: u64, _total_parts: u64) {}

    /// Called after every chunk. `written_bytes` is cumulative across parts.
    fn on_file_progress(&self, _written_bytes: u64, _total_bytes: u64) {}

    /// Called once after all parts are written. `None` means success.
    fn on_archive_bit(&self, _error: Option<&str>) {}
}

/// Reporter that ignores every hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl SplitReporter for NoopReporter {}

/// Drops events that arrive sooner than `interval` after the last admitted one.
///
/// The mark starts at construction, so a burst right after creation is
/// dropped entirely.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Instant,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Throttle {
            interval,
            last: start,
        }
    }

    /// Admit an event observed at `now`, updating the mark if admitted.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_within_interval_admits_at_most_one() {
        let start = Instant::now();
        let mut throttle = Throttle::starting_at(PROGRESS_INTERVAL_QUEUE, start);

        // 1000 calls spread over 10 ms of simulated time
        let admitted = (0..1000)
            .map(|i| start + Duration::from_micros(i * 10))
            .filter(|&t| throttle.admit_at(t))
            .count();
        assert!(admitted <= 1, "admitted {} events", admitted);
    }

    #[test]
    fn test_admits_again_after_interval() {
        let start = Instant::now();
        let mut throttle = Throttle::starting_at(Duration::from_millis(50), start);

        assert!(!throttle.admit_at(start + Duration::from_millis(10)));
        assert!(throttle.admit_at(start + Duration::from_millis(50)));
        assert!(!throttle.admit_at(start + Duration::from_millis(99)));
        assert!(throttle.admit_at(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_noop_reporter_accepts_every_hook() {
        let reporter = NoopReporter;
        reporter.on_initial_info(2, 10);
        reporter.on_start_part(0, 2);
        reporter.on_file_progress(5, 10);
        reporter.on_finish_part(0, 2);
        reporter.on_archive_bit(Some("unsupported"));
    }
}
