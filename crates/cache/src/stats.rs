//! Cache statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal cache statistics with atomic counters
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    swept: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.swept.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    /// Entries physically present, expired or not
    pub total: usize,
    /// Entries still visible to readers
    pub active: usize,
    /// Entries past their expiry awaiting the sweeper
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// Entries removed by sweeps since creation
    pub swept: u64,
}

impl CacheStatistics {
    pub(crate) fn from_counts(total: usize, expired: usize, counters: &CacheCounters) -> Self {
        Self {
            total,
            active: total - expired,
            expired,
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            writes: counters.writes.load(Ordering::Relaxed),
            swept: counters.swept.load(Ordering::Relaxed),
        }
    }

    /// Fraction of reads that found a live entry
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let counters = CacheCounters::default();
        assert_eq!(CacheStatistics::from_counts(0, 0, &counters).hit_rate(), 0.0);

        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        let stats = CacheStatistics::from_counts(4, 1, &counters);
        assert_eq!(stats.active, 3);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
