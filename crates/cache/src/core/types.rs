//! Core cache types and structures

use crate::config::CacheConfig;
use crate::stats::CacheCounters;
use keeper_utils::PeriodicTask;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::time::Instant;

/// Value plus the instant it stops being visible
#[derive(Debug, Clone)]
pub(super) struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    #[inline]
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Concurrent key/value store with per-entry expiry.
///
/// Cloning is cheap and yields a handle to the same storage. The background
/// sweeper stops when the last handle is dropped.
pub struct TtlCache<K, V> {
    pub(super) inner: Arc<CacheInner<K, V>>,
    pub(super) sweeper: Arc<PeriodicTask>,
}

pub(super) struct CacheInner<K, V> {
    pub config: CacheConfig,
    pub entries: RwLock<HashMap<K, CacheEntry<V>>>,
    pub counters: CacheCounters,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache and start its background sweeper.
    ///
    /// The sweeper only runs when called inside a tokio runtime and
    /// `sweep_interval` is non-zero.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        let inner = Arc::new(CacheInner {
            config,
            entries: RwLock::new(HashMap::new()),
            counters: CacheCounters::default(),
        });
        let sweeper = Self::start_sweeper(&inner);
        Self {
            inner,
            sweeper: Arc::new(sweeper),
        }
    }

    /// Configuration this cache was built with
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.inner.config)
            .field("entry_count", &self.inner.entries.read().len())
            .field("sweeper_running", &self.sweeper.is_running())
            .finish()
    }
}
