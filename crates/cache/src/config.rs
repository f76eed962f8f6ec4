//! Cache configuration

use keeper_core::{Error, Result};
use std::time::Duration;

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Default TTL used by [`TtlCache::insert`](crate::TtlCache::insert)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Runtime configuration for a [`TtlCache`](crate::TtlCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How often expired entries are physically removed. Zero disables the
    /// background sweeper.
    pub sweep_interval: Duration,
    /// TTL applied when the caller does not pass one
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Configuration without a background sweeper
    #[must_use]
    pub fn without_sweeper() -> Self {
        Self {
            sweep_interval: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Reject configurations that would make every entry expire immediately
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(Error::configuration("cache default TTL must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(120));
        assert!(config.validate().is_ok());
        assert!(CacheConfig::without_sweeper().sweep_interval.is_zero());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CacheConfig {
            default_ttl: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { .. })
        ));
    }
}
