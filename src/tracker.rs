//! Process-wide database operation counters.
//!
//! Counts reads and writes, in total and for the current 24 hour window.
//! Crossing a daily threshold logs a warning once per window; nothing is
//! throttled.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

pub const DEFAULT_DAILY_READ_LIMIT: u64 = 50_000;
pub const DEFAULT_DAILY_WRITE_LIMIT: u64 = 20_000;
const WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

lazy_static! {
    pub static ref TRACKER: OperationTracker =
        OperationTracker::new(DEFAULT_DAILY_READ_LIMIT, DEFAULT_DAILY_WRITE_LIMIT);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStats {
    pub total_reads: u64,
    pub total_writes: u64,
    pub daily_reads: u64,
    pub daily_writes: u64,
    pub daily_read_limit: u64,
    pub daily_write_limit: u64,
    pub window_age_secs: u64,
}

#[derive(Debug)]
struct Counters {
    total_reads: u64,
    total_writes: u64,
    daily_reads: u64,
    daily_writes: u64,
    window_start: Instant,
    read_warned: bool,
    write_warned: bool,
}

#[derive(Debug)]
pub struct OperationTracker {
    read_limit: u64,
    write_limit: u64,
    counters: Mutex<Counters>,
}

impl OperationTracker {
    pub fn new(read_limit: u64, write_limit: u64) -> Self {
        Self {
            read_limit,
            write_limit,
            counters: Mutex::new(Counters {
                total_reads: 0,
                total_writes: 0,
                daily_reads: 0,
                daily_writes: 0,
                window_start: Instant::now(),
                read_warned: false,
                write_warned: false,
            }),
        }
    }

    pub fn record_reads(&self, count: usize) {
        self.record_reads_at(count as u64, Instant::now());
    }

    pub fn record_writes(&self, count: usize) {
        self.record_writes_at(count as u64, Instant::now());
    }

    pub fn record_reads_at(&self, count: u64, now: Instant) {
        let mut c = self.lock();
        Self::roll_window(&mut c, now);
        c.total_reads += count;
        c.daily_reads += count;
        if c.daily_reads > self.read_limit && !c.read_warned {
            c.read_warned = true;
            warn!(
                "Daily read count {} exceeded threshold {}",
                c.daily_reads, self.read_limit
            );
        }
    }

    pub fn record_writes_at(&self, count: u64, now: Instant) {
        let mut c = self.lock();
        Self::roll_window(&mut c, now);
        c.total_writes += count;
        c.daily_writes += count;
        if c.daily_writes > self.write_limit && !c.write_warned {
            c.write_warned = true;
            warn!(
                "Daily write count {} exceeded threshold {}",
                c.daily_writes, self.write_limit
            );
        }
    }

    pub fn snapshot(&self) -> OperationStats {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> OperationStats {
        let mut c = self.lock();
        Self::roll_window(&mut c, now);
        OperationStats {
            total_reads: c.total_reads,
            total_writes: c.total_writes,
            daily_reads: c.daily_reads,
            daily_writes: c.daily_writes,
            daily_read_limit: self.read_limit,
            daily_write_limit: self.write_limit,
            window_age_secs: now.saturating_duration_since(c.window_start).as_secs(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        // counters stay consistent even if a holder panicked
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn roll_window(c: &mut Counters, now: Instant) {
        if now.saturating_duration_since(c.window_start) >= WINDOW {
            c.daily_reads = 0;
            c.daily_writes = 0;
            c.read_warned = false;
            c.write_warned = false;
            c.window_start = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let tracker = OperationTracker::new(100, 100);
        tracker.record_reads(3);
        tracker.record_reads(2);
        tracker.record_writes(4);

        let stats = tracker.snapshot();
        assert_eq!(stats.total_reads, 5);
        assert_eq!(stats.daily_reads, 5);
        assert_eq!(stats.total_writes, 4);
        assert_eq!(stats.daily_writes, 4);
    }

    #[test]
    fn test_daily_counts_reset_after_a_day() {
        let tracker = OperationTracker::new(100, 100);
        let start = Instant::now();
        tracker.record_reads_at(10, start);
        tracker.record_writes_at(7, start);

        let later = start + WINDOW + Duration::from_secs(1);
        let stats = tracker.snapshot_at(later);
        assert_eq!(stats.daily_reads, 0);
        assert_eq!(stats.daily_writes, 0);
        assert_eq!(stats.total_reads, 10);
        assert_eq!(stats.total_writes, 7);
        assert_eq!(stats.window_age_secs, 0);
    }

    #[test]
    fn test_threshold_is_reported_but_not_enforced() {
        let tracker = OperationTracker::new(5, 5);
        let start = Instant::now();
        tracker.record_writes_at(6, start);
        tracker.record_writes_at(6, start);

        let stats = tracker.snapshot_at(start);
        assert_eq!(stats.daily_writes, 12);
        assert!(tracker.lock().write_warned);
    }
}
