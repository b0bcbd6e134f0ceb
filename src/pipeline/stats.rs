//! Pipeline counters shared by scanners and workers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline statistics (thread-safe)
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Completed scan passes
    pub scans: AtomicU64,

    /// Scan passes that failed
    pub scan_failures: AtomicU64,

    /// Tasks pushed into the queue (refreshes included)
    pub tasks_queued: AtomicU64,

    /// Tasks dropped to make room in a full queue
    pub tasks_evicted: AtomicU64,

    /// Reservation attempts started by workers
    pub attempts: AtomicU64,

    pub lock_rejected: AtomicU64,
    pub captcha_rejected: AtomicU64,
    pub reserved: AtomicU64,

    /// Attempts that ended with an error
    pub attempt_errors: AtomicU64,
}

impl PipelineStats {
    /// Create new stats counter
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_scan(&self, queued: usize) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.tasks_queued.fetch_add(queued as u64, Ordering::Relaxed);
    }

    pub fn record_scan_failure(&self) {
        self.scan_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.tasks_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock_rejected(&self) {
        self.lock_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_captcha_rejected(&self) {
        self.captcha_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reserved(&self) {
        self.reserved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt_error(&self) {
        self.attempt_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            scans: self.scans.load(Ordering::Relaxed),
            scan_failures: self.scan_failures.load(Ordering::Relaxed),
            tasks_queued: self.tasks_queued.load(Ordering::Relaxed),
            tasks_evicted: self.tasks_evicted.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            lock_rejected: self.lock_rejected.load(Ordering::Relaxed),
            captcha_rejected: self.captcha_rejected.load(Ordering::Relaxed),
            reserved: self.reserved.load(Ordering::Relaxed),
            attempt_errors: self.attempt_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub scans: u64,
    pub scan_failures: u64,
    pub tasks_queued: u64,
    pub tasks_evicted: u64,
    pub attempts: u64,
    pub lock_rejected: u64,
    pub captcha_rejected: u64,
    pub reserved: u64,
    pub attempt_errors: u64,
}

impl StatsSnapshot {
    /// Share of attempts that got past the lock race (0.0 - 1.0)
    pub fn lock_win_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        let won = self.attempts - self.lock_rejected.min(self.attempts);
        won as f64 / self.attempts as f64
    }
}
