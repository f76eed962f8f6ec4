//! Background sweep of expired entries

use super::types::{CacheInner, TtlCache};
use keeper_utils::PeriodicTask;
use std::hash::Hash;
use std::sync::Arc;
use tokio::time::Instant;

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(super) fn start_sweeper(inner: &Arc<CacheInner<K, V>>) -> PeriodicTask {
        PeriodicTask::spawn(
            "cache_sweep",
            inner.config.sweep_interval,
            Arc::downgrade(inner),
            |inner: &CacheInner<K, V>| {
                let removed = inner.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            },
        )
    }

    /// Whether the background sweeper is active
    #[must_use]
    pub fn sweeper_running(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweeper; expiry on read is unaffected
    pub fn stop_sweeper(&self) {
        self.sweeper.cancel();
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash,
{
    /// Physically remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();

        // Only take the write lock when something has expired
        if !self.entries.read().values().any(|e| !e.is_live(now)) {
            return 0;
        }

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        drop(entries);

        self.counters.record_swept(removed);
        removed
    }
}
