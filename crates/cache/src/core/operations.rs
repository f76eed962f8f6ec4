//! Cache read and write operations

use super::types::{CacheEntry, TtlCache};
use crate::stats::CacheStatistics;
use keeper_utils::deadline_after;
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Store `value` under `key`, visible until `ttl` elapses.
    ///
    /// Overwrites any previous entry and restarts its expiry. A zero TTL
    /// stores nothing visible.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = deadline_after(ttl);
        self.inner
            .entries
            .write()
            .insert(key, CacheEntry { value, expires_at });
        self.inner.counters.record_write();
    }

    /// Store `value` with the configured default TTL
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.inner.config.default_ttl);
    }

    /// Get a live value.
    ///
    /// Expiry is checked here, so an expired entry is absent even if the
    /// sweeper has not removed it yet.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let value = self
            .inner
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());

        if value.is_some() {
            self.inner.counters.record_hit();
        } else {
            self.inner.counters.record_miss();
        }
        value
    }

    /// Whether a live value exists, without touching hit/miss counters
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Time left before `key` expires
    pub fn remaining_ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now)
    }

    /// Remove `key`, returning whether a live value was present
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.inner
            .entries
            .write()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Remove every entry and reset counters
    pub fn clear(&self) {
        self.inner.entries.write().clear();
        self.inner.counters.reset();
    }

    /// Run a sweep now instead of waiting for the background interval
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Number of entries physically stored, including expired ones not yet swept
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Snapshot of entry counts and counters
    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        let now = Instant::now();
        let entries = self.inner.entries.read();
        let total = entries.len();
        let expired = entries.values().filter(|e| !e.is_live(now)).count();
        drop(entries);

        CacheStatistics::from_counts(total, expired, &self.inner.counters)
    }
}
