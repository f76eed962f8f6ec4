//! Worker pool statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub rejected: AtomicU64,
    pub running: AtomicUsize,
}

impl PoolCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatistics {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Jobs waiting for a worker
    pub queued: usize,
    /// Jobs currently executing, excluding abandoned ones
    pub running: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    /// Submissions refused because the queue was full
    pub rejected: u64,
}

impl PoolStatistics {
    pub(crate) fn collect(
        counters: &PoolCounters,
        workers: usize,
        queue_capacity: usize,
        queued: usize,
    ) -> Self {
        Self {
            workers,
            queue_capacity,
            queued,
            running: counters.running.load(Ordering::Relaxed),
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            timed_out: counters.timed_out.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
        }
    }
}
