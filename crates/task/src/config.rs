//! Worker pool configuration

use keeper_core::{Error, Result};
use std::time::Duration;

/// Lower bound for the default pool size
pub const MIN_DEFAULT_WORKERS: usize = 2;
/// Upper bound for the default pool size
pub const MAX_DEFAULT_WORKERS: usize = 8;
/// Hard ceiling accepted by [`PoolConfig::validate`]
pub const MAX_WORKERS: usize = 64;

/// Runtime configuration for a [`WorkerPool`](crate::WorkerPool)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of workers; fixed for the pool's lifetime
    pub size: usize,
    /// Jobs that may wait for a free worker before submission fails
    pub queue_depth: usize,
    /// Deadline applied to jobs submitted without one
    pub job_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            queue_depth: 100,
            job_timeout: Duration::from_secs(60),
        }
    }
}

impl PoolConfig {
    /// Pool with an explicit size and the default queue and timeout
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.size > MAX_WORKERS {
            return Err(Error::configuration(format!(
                "worker pool size must be between 1 and {MAX_WORKERS}, got {}",
                self.size
            )));
        }
        if self.queue_depth == 0 {
            return Err(Error::configuration("job queue depth must be non-zero"));
        }
        if self.job_timeout.is_zero() {
            return Err(Error::configuration("job timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Available parallelism clamped to 2..=8
#[must_use]
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_DEFAULT_WORKERS)
        .clamp(MIN_DEFAULT_WORKERS, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_size_is_clamped() {
        let size = default_pool_size();
        assert!((MIN_DEFAULT_WORKERS..=MAX_DEFAULT_WORKERS).contains(&size));
        assert_eq!(PoolConfig::default().queue_depth, 100);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PoolConfig::with_size(0).validate().is_err());
        assert!(PoolConfig::with_size(65).validate().is_err());
        assert!(PoolConfig::with_size(64).validate().is_ok());

        let config = PoolConfig {
            queue_depth: 0,
            ..PoolConfig::with_size(2)
        };
        assert!(config.validate().is_err());
    }
}
