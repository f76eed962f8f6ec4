//! Layered configuration loading
//!
//! Precedence, lowest to highest: built-in defaults, the JSON config file,
//! `KEEPER_*` environment variables.

use crate::settings::KeeperConfig;
use keeper_core::{Error, Result, KEEPER_CONFIG_VAR};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the effective configuration came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    #[default]
    Default,
    ConfigFile(PathBuf),
    EnvironmentVariable(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("defaults"),
            Self::ConfigFile(path) => write!(f, "file {}", path.display()),
            Self::EnvironmentVariable(name) => write!(f, "environment {name}"),
        }
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Loads [`KeeperConfig`] from defaults, file and environment
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvLookup,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Read this file instead of the default location. The file must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the environment lookup
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Resolve, merge and validate the configuration
    pub fn load(&self) -> Result<KeeperConfig> {
        let mut config = KeeperConfig::default();

        if let Some((path, from_file)) = self.load_file()? {
            config = from_file;
            config.source = ConfigSource::ConfigFile(path);
        }

        if let Some(last_var) = self.apply_env(&mut config)? {
            config.source = ConfigSource::EnvironmentVariable(last_var);
        }

        config.validate()?;
        tracing::debug!(source = %config.source, "configuration loaded");
        Ok(config)
    }

    /// Config file path: explicit path, then `KEEPER_CONFIG`, then
    /// `$XDG_CONFIG_HOME/keeper/config.json`, then the platform config dir
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.file {
            return Some(path.clone());
        }
        if let Some(path) = self.var(KEEPER_CONFIG_VAR) {
            return Some(PathBuf::from(path));
        }
        let base = self
            .var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)?;
        Some(base.join("keeper").join("config.json"))
    }

    fn load_file(&self) -> Result<Option<(PathBuf, KeeperConfig)>> {
        let Some(path) = self.config_path() else {
            return Ok(None);
        };
        let explicit = self.file.is_some() || self.var(KEEPER_CONFIG_VAR).is_some();

        if !path.exists() {
            if explicit {
                return Err(Error::configuration(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(None);
        }

        let config = read_config(&path)?;
        Ok(Some((path, config)))
    }

    /// Apply `KEEPER_*` overrides; returns the name of the last one applied
    fn apply_env(&self, config: &mut KeeperConfig) -> Result<Option<String>> {
        let mut applied = None;

        macro_rules! numeric {
            ($name:literal => $($field:tt)+) => {
                if let Some(value) = self.parsed($name)? {
                    config.$($field)+ = value;
                    applied = Some($name.to_string());
                }
            };
        }

        numeric!("KEEPER_POOL_SIZE" => pool.size);
        numeric!("KEEPER_QUEUE_DEPTH" => pool.queue_depth);
        numeric!("KEEPER_JOB_TIMEOUT_SECS" => pool.job_timeout_secs);
        numeric!("KEEPER_RATE_LIMIT_MAX" => rate_limit.general.max_requests);
        numeric!("KEEPER_RATE_LIMIT_WINDOW_MS" => rate_limit.general.window_ms);
        numeric!("KEEPER_AUTH_RATE_LIMIT_MAX" => rate_limit.auth.max_requests);
        numeric!("KEEPER_AUTH_RATE_LIMIT_WINDOW_MS" => rate_limit.auth.window_ms);
        numeric!("KEEPER_CACHE_SWEEP_SECS" => cache.sweep_interval_secs);
        numeric!("KEEPER_VALID_TTL_SECS" => validator.valid_ttl_secs);
        numeric!("KEEPER_OFFLINE_TTL_SECS" => validator.offline_ttl_secs);
        numeric!("KEEPER_REQUEST_DEADLINE_MS" => validator.request_deadline_ms);
        numeric!("KEEPER_MAX_RETRIES" => retry.max_retries);
        numeric!("KEEPER_KDF_MEMORY_KIB" => kdf.memory_kib);
        numeric!("KEEPER_KDF_ITERATIONS" => kdf.iterations);
        numeric!("KEEPER_KDF_PARALLELISM" => kdf.parallelism);

        if let Some(principals) = self.var("KEEPER_TRUSTED_PRINCIPALS") {
            config.trusted_principals = principals
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            applied = Some("KEEPER_TRUSTED_PRINCIPALS".to_string());
        }

        if let Some(dir) = self.var("KEEPER_SESSION_DIR") {
            config.validator.session_dir = Some(PathBuf::from(dir));
            applied = Some("KEEPER_SESSION_DIR".to_string());
        }

        Ok(applied)
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.var(name)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    Error::configuration(format!("invalid value {raw:?} for {name}: {e}"))
                })
            })
            .transpose()
    }
}

/// Parse a JSON config file
pub fn read_config(path: &Path) -> Result<KeeperConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read config", e))?;
    serde_json::from_str(&contents).map_err(|e| {
        Error::configuration(format!("failed to parse {}: {e}", path.display()))
    })
}
