//! In-memory TTL cache for keeper
//!
//! A generic concurrent key/value store where every entry carries its own
//! expiry. Expiry is checked on every read, so a value is never returned past
//! its deadline even if the background sweep has not run yet. The sweep only
//! bounds memory for keys that are written once and never read again.
//!
//! Entries leave the cache only through expiry, `delete` or `clear`; there
//! is no size-based eviction.

pub mod config;
pub mod core;
pub mod keys;
pub mod stats;

pub use config::CacheConfig;
pub use crate::core::TtlCache;
pub use keys::CacheKey;
pub use stats::CacheStatistics;
