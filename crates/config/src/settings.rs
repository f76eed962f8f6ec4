//! Serializable configuration surface
//!
//! Durations are stored as integer seconds or milliseconds so the JSON file
//! stays hand-editable. Every section has `#[serde(default)]`, so a config
//! file only needs the keys it changes.

use keeper_cache::CacheConfig;
use keeper_core::{Error, Result, HEALTH_CHECK_PATH, OFFLINE_SESSION_TTL, VALID_SESSION_TTL};
use keeper_security::KdfConfig;
use keeper_task::{config::default_pool_size, PoolConfig};
use keeper_utils::{RateLimitConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::ConfigSource;

/// Complete keeper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    pub pool: PoolSettings,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub validator: ValidatorSettings,
    pub retry: RetrySettings,
    pub kdf: KdfConfig,
    /// E-mail addresses granted an unlimited plan after validation
    pub trusted_principals: Vec<String>,
    /// Highest-precedence layer that contributed values
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            rate_limit: RateLimitSettings::default(),
            cache: CacheSettings::default(),
            validator: ValidatorSettings::default(),
            retry: RetrySettings::default(),
            kdf: KdfConfig::default(),
            trusted_principals: Vec::new(),
            source: ConfigSource::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub size: usize,
    pub queue_depth: usize,
    pub job_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            queue_depth: 100,
            job_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub general: LimiterSettings,
    pub auth: LimiterSettings,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            general: LimiterSettings {
                max_requests: 500,
                window_ms: 15 * 60 * 1000,
                compaction_interval_secs: 5 * 60,
                exempt: vec![HEALTH_CHECK_PATH.to_string()],
            },
            auth: LimiterSettings {
                max_requests: 1,
                window_ms: 2000,
                compaction_interval_secs: 60,
                exempt: Vec::new(),
            },
        }
    }
}

/// One sliding-window limiter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub max_requests: usize,
    pub window_ms: u64,
    #[serde(default)]
    pub compaction_interval_secs: u64,
    #[serde(default)]
    pub exempt: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub sweep_interval_secs: u64,
    pub default_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            default_ttl_secs: defaults.default_ttl.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// TTL for cached `Valid` results
    pub valid_ttl_secs: u64,
    /// TTL for cached `ValidOffline` results
    pub offline_ttl_secs: u64,
    /// Overall budget for remote validation including retries
    pub request_deadline_ms: u64,
    /// Directory holding the encrypted session file
    pub session_dir: Option<PathBuf>,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            valid_ttl_secs: VALID_SESSION_TTL.as_secs(),
            offline_ttl_secs: OFFLINE_SESSION_TTL.as_secs(),
            request_deadline_ms: 3000,
            session_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            jitter_factor: defaults.jitter_factor,
        }
    }
}

impl KeeperConfig {
    /// Reject values that would disable a component or make it unusable
    pub fn validate(&self) -> Result<()> {
        self.pool_config().validate()?;

        for (name, limiter) in [("general", &self.rate_limit.general), ("auth", &self.rate_limit.auth)] {
            if limiter.max_requests == 0 {
                return Err(Error::configuration(format!(
                    "{name} rate limit must allow at least one request"
                )));
            }
            if limiter.window_ms == 0 {
                return Err(Error::configuration(format!(
                    "{name} rate limit window must be non-zero"
                )));
            }
        }

        self.cache_config().validate()?;

        if self.validator.valid_ttl_secs == 0 || self.validator.offline_ttl_secs == 0 {
            return Err(Error::configuration("validation result TTLs must be non-zero"));
        }
        if self.validator.request_deadline_ms == 0 {
            return Err(Error::configuration("request deadline must be non-zero"));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(Error::configuration("retry jitter factor must be within 0.0..=1.0"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::configuration(
                "retry base delay must not exceed the maximum delay",
            ));
        }

        self.kdf.validate()
    }

    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            size: self.pool.size,
            queue_depth: self.pool.queue_depth,
            job_timeout: Duration::from_secs(self.pool.job_timeout_secs),
        }
    }

    /// Limiter for general traffic, keyed by network address
    #[must_use]
    pub fn general_limiter(&self) -> RateLimitConfig {
        self.rate_limit.general.to_config()
    }

    /// Limiter for authentication attempts, keyed by device
    #[must_use]
    pub fn auth_limiter(&self) -> RateLimitConfig {
        self.rate_limit.auth.to_config()
    }

    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            sweep_interval: Duration::from_secs(self.cache.sweep_interval_secs),
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
        }
    }

    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            jitter_factor: self.retry.jitter_factor,
        }
    }
}

impl LimiterSettings {
    #[must_use]
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window: Duration::from_millis(self.window_ms),
            compaction_interval: Duration::from_secs(self.compaction_interval_secs),
            exempt_keys: self.exempt.iter().cloned().collect::<HashSet<_>>(),
        }
    }
}

impl ValidatorSettings {
    #[must_use]
    pub fn valid_ttl(&self) -> Duration {
        Duration::from_secs(self.valid_ttl_secs)
    }

    #[must_use]
    pub fn offline_ttl(&self) -> Duration {
        Duration::from_secs(self.offline_ttl_secs)
    }

    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_component_presets() {
        let config = KeeperConfig::default();
        config.validate().unwrap();

        let general = config.general_limiter();
        let preset = RateLimitConfig::general();
        assert_eq!(general.max_requests, preset.max_requests);
        assert_eq!(general.window, preset.window);
        assert_eq!(general.exempt_keys, preset.exempt_keys);

        let auth = config.auth_limiter();
        assert_eq!(auth.max_requests, 1);
        assert_eq!(auth.window, Duration::from_secs(2));

        assert_eq!(config.cache_config(), CacheConfig::default());
        assert_eq!(config.pool_config(), PoolConfig::default());
        assert_eq!(config.validator.valid_ttl(), Duration::from_secs(600));
        assert_eq!(config.validator.offline_ttl(), Duration::from_secs(120));
        assert_eq!(config.validator.request_deadline(), Duration::from_secs(3));
        assert_eq!(config.retry_config().max_retries, 2);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: KeeperConfig = serde_json::from_str(
            r#"{ "pool": { "size": 4 }, "rate_limit": { "auth": { "max_requests": 3, "window_ms": 1000 } } }"#,
        )
        .unwrap();

        assert_eq!(config.pool.size, 4);
        assert_eq!(config.pool.queue_depth, 100);
        assert_eq!(config.rate_limit.auth.max_requests, 3);
        assert_eq!(config.rate_limit.general.max_requests, 500);
        assert_eq!(config.kdf, KdfConfig::default());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = KeeperConfig::default();
        config.rate_limit.general.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.pool.size = 0;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.pool.queue_depth = 0;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.kdf.memory_kib = 4;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.retry.jitter_factor = 1.5;
        assert!(config.validate().is_err());
    }
}
