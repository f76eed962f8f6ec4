//! Configuration for keeper
//!
//! [`KeeperConfig`] is the serializable surface. Each component crate owns
//! its runtime config type; this crate converts between the two and decides
//! precedence through [`ConfigLoader`].

pub mod loader;
pub mod settings;

pub use loader::{read_config, ConfigLoader, ConfigSource};
pub use settings::{
    CacheSettings, KeeperConfig, LimiterSettings, PoolSettings, RateLimitSettings, RetrySettings,
    ValidatorSettings,
};
