//! Validator runtime configuration

use keeper_cache::CacheConfig;
use keeper_config::KeeperConfig;
use keeper_core::{Error, Result, OFFLINE_SESSION_TTL, VALID_SESSION_TTL};
use keeper_security::SessionStore;
use keeper_utils::{RateLimitConfig, RetryConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for a [`SessionValidator`](crate::SessionValidator)
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// TTL for cached `Valid` results
    pub valid_ttl: Duration,
    /// TTL for cached `ValidOffline` results
    pub offline_ttl: Duration,
    /// Budget for one remote validation, retries included
    pub request_deadline: Duration,
    pub retry: RetryConfig,
    /// Per-device limiter checked before any validation work
    pub limiter: RateLimitConfig,
    /// Stricter per-device limiter for sign-in
    pub auth_limiter: RateLimitConfig,
    pub cache: CacheConfig,
    /// Location of the encrypted session record
    pub session_path: PathBuf,
}

impl ValidatorConfig {
    /// Defaults with the session record at `session_path`
    #[must_use]
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            valid_ttl: VALID_SESSION_TTL,
            offline_ttl: OFFLINE_SESSION_TTL,
            request_deadline: Duration::from_secs(3),
            retry: RetryConfig::default(),
            limiter: RateLimitConfig::general(),
            auth_limiter: RateLimitConfig::auth(),
            cache: CacheConfig::default(),
            session_path: session_path.into(),
        }
    }

    /// Build from the loaded configuration. Falls back to the platform data
    /// directory when no session directory is configured.
    pub fn from_settings(config: &KeeperConfig) -> Result<Self> {
        let dir = config
            .validator
            .session_dir
            .clone()
            .or_else(SessionStore::default_dir)
            .ok_or_else(|| {
                Error::configuration(
                    "could not determine a session directory; set KEEPER_SESSION_DIR",
                )
            })?;

        Ok(Self {
            valid_ttl: config.validator.valid_ttl(),
            offline_ttl: config.validator.offline_ttl(),
            request_deadline: config.validator.request_deadline(),
            retry: config.retry_config(),
            limiter: config.general_limiter(),
            auth_limiter: config.auth_limiter(),
            cache: config.cache_config(),
            session_path: SessionStore::session_path(&dir),
        })
    }
}
