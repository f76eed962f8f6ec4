//! Session validation state machine
//!
//! ```text
//! throttled? ──yes──▶ Invalid("rate limit exceeded")
//!     │no
//! cached?  ───yes──▶ cached result
//!     │no
//! remote (retries, deadline) ──ok──▶ persist record, cache Valid
//!     │rejected ──▶ Invalid(reason)
//!     │unavailable
//! stored record? ──yes──▶ cache ValidOffline
//!     │no
//! Invalid("cannot validate session")
//! ```

use crate::config::ValidatorConfig;
use crate::provider::{AccountDirectory, IdentityProvider, RemoteIdentity};
use keeper_cache::{CacheKey, TtlCache};
use keeper_config::KeeperConfig;
use keeper_core::{
    AccountSnapshot, Credential, DeviceId, Error, OpaqueMap, Result, SessionRecord,
    ValidationResult, REASON_CANNOT_VALIDATE, REASON_THROTTLED, REASON_USER_NOT_FOUND,
};
use keeper_security::SessionStore;
use keeper_utils::tracing::{cache_event, throttle_event, validation_event, validation_span};
use keeper_utils::{deadline_after, retry_with_deadline, RateLimiter};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const SESSION_CACHE: &str = "session";

/// Validates credentials against the identity provider, degrading to the
/// encrypted on-disk record when the provider cannot be reached.
///
/// Callers only ever receive a [`ValidationResult`]; transport, storage and
/// decryption failures are folded into one of its three variants.
#[derive(Clone)]
pub struct SessionValidator {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn AccountDirectory>,
    limiter: RateLimiter,
    auth_limiter: RateLimiter,
    cache: TtlCache<String, ValidationResult>,
    store: SessionStore,
    config: ValidatorConfig,
}

impl SessionValidator {
    /// Create a validator with its own limiters and result cache.
    ///
    /// Must be called inside a tokio runtime for the limiter compaction and
    /// cache sweep to run.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn AccountDirectory>,
        store: SessionStore,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            provider,
            directory,
            limiter: RateLimiter::new(config.limiter.clone()),
            auth_limiter: RateLimiter::new(config.auth_limiter.clone()),
            cache: TtlCache::with_config(config.cache.clone()),
            store,
            config,
        }
    }

    /// Build the store and config from loaded settings for `device_id`
    pub fn from_settings(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn AccountDirectory>,
        settings: &KeeperConfig,
        device_id: &DeviceId,
    ) -> Result<Self> {
        let config = ValidatorConfig::from_settings(settings)?;
        let store = SessionStore::new(device_id, &settings.kdf)?;
        Ok(Self::new(provider, directory, store, config))
    }

    /// Share an existing validation limiter instead of the one built from
    /// config
    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Share an existing sign-in limiter
    #[must_use]
    pub fn with_auth_limiter(mut self, limiter: RateLimiter) -> Self {
        self.auth_limiter = limiter;
        self
    }

    /// Share an existing result cache
    #[must_use]
    pub fn with_cache(mut self, cache: TtlCache<String, ValidationResult>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn auth_limiter(&self) -> &RateLimiter {
        &self.auth_limiter
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache<String, ValidationResult> {
        &self.cache
    }

    /// Validate `credential` presented from `device_id`
    pub async fn validate(&self, credential: &Credential, device_id: &DeviceId) -> ValidationResult {
        self.validate_with_cancel(credential, device_id, &CancellationToken::new())
            .await
    }

    /// Validate, abandoning the remote call and any remaining retries as
    /// soon as `cancel` fires. A cancelled validation still falls back to
    /// the stored record but is not cached.
    ///
    /// The offline fallback is not bound to the credential that created the
    /// stored record: while the provider is unreachable, any well-formed
    /// credential presented on this device receives the stored user's
    /// `ValidOffline` snapshot, cached under that credential's key. Access
    /// tokens rotate on refresh, so the stored `access_token` cannot be
    /// used to tell a stale token from a foreign one.
    pub async fn validate_with_cancel(
        &self,
        credential: &Credential,
        device_id: &DeviceId,
        cancel: &CancellationToken,
    ) -> ValidationResult {
        let fingerprint = credential.fingerprint();
        let span = validation_span(&fingerprint, device_id.as_str());
        let started = Instant::now();

        let result = async {
            if !admit(&self.limiter, device_id) {
                return ValidationResult::invalid(REASON_THROTTLED);
            }

            let key = CacheKey::session(&fingerprint).into_string();
            if let Some(cached) = self.cache.get(key.as_str()) {
                cache_event(SESSION_CACHE, &key, true);
                return cached;
            }
            cache_event(SESSION_CACHE, &key, false);

            match self.fetch_account(credential, cancel).await {
                Ok((identity, Some(account))) => {
                    if let Err(error) = self.refresh_record(&identity, &account).await {
                        tracing::warn!(error = %error, "failed to update stored session");
                    }
                    let result = ValidationResult::Valid(account);
                    self.cache.set(key, result.clone(), self.config.valid_ttl);
                    result
                }
                Ok((identity, None)) => {
                    tracing::info!(user_id = %identity.id, "introspected user has no account");
                    ValidationResult::invalid(REASON_USER_NOT_FOUND)
                }
                Err(Error::RemoteRejected { reason }) => {
                    tracing::info!(reason = %reason, "credential rejected");
                    ValidationResult::invalid(reason)
                }
                Err(error) => self.offline_fallback(key, error).await,
            }
        }
        .instrument(span)
        .await;

        validation_event(&fingerprint, result.tag(), started.elapsed());
        result
    }

    /// Sign in: validate remotely with no offline fallback, then replace the
    /// stored record with one carrying the new remote session. Admission
    /// goes through the sign-in limiter rather than the validation one.
    pub async fn establish(
        &self,
        credential: &Credential,
        refresh_token: Option<&Credential>,
        device_id: &DeviceId,
    ) -> ValidationResult {
        let fingerprint = credential.fingerprint();
        let span = validation_span(&fingerprint, device_id.as_str());
        let started = Instant::now();

        let result = async {
            if !admit(&self.auth_limiter, device_id) {
                return ValidationResult::invalid(REASON_THROTTLED);
            }

            match self.fetch_account(credential, &CancellationToken::new()).await {
                Ok((identity, Some(account))) => {
                    let remote = remote_session(&identity, Some(credential), refresh_token);
                    let record = SessionRecord::from_snapshot(account.clone(), remote);
                    let stored = self
                        .with_store(move |store, path| store.store(&record, path))
                        .await;
                    if let Err(error) = stored {
                        tracing::warn!(error = %error, "failed to store new session");
                    }

                    let result = ValidationResult::Valid(account);
                    let key = CacheKey::session(&fingerprint).into_string();
                    self.cache.set(key, result.clone(), self.config.valid_ttl);
                    tracing::info!(user_id = %identity.id, "session established");
                    result
                }
                Ok((_, None)) => ValidationResult::invalid(REASON_USER_NOT_FOUND),
                Err(Error::RemoteRejected { reason }) => ValidationResult::invalid(reason),
                Err(error) => {
                    tracing::warn!(error = %error, "sign-in failed");
                    ValidationResult::invalid(REASON_CANNOT_VALIDATE)
                }
            }
        }
        .instrument(span)
        .await;

        validation_event(&fingerprint, result.tag(), started.elapsed());
        result
    }

    /// Forget the cached result for `credential` and delete the stored
    /// record. Safe to call repeatedly.
    pub async fn logout(&self, credential: &Credential) -> Result<()> {
        let key = CacheKey::session(&credential.fingerprint());
        self.cache.delete(key.as_str());
        self.with_store(|store, path| store.clear(path)).await
    }

    async fn fetch_account(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<(RemoteIdentity, Option<AccountSnapshot>)> {
        let deadline = deadline_after(self.config.request_deadline);
        retry_with_deadline(
            &self.config.retry,
            deadline,
            cancel,
            "validate_session",
            |_attempt| async move {
                let identity = self.provider.introspect(credential).await?;
                let account = self.directory.account(&identity).await?;
                Ok::<_, Error>((identity, account))
            },
        )
        .await
    }

    async fn offline_fallback(&self, key: String, error: Error) -> ValidationResult {
        tracing::warn!(error = %error, "remote validation failed; trying stored session");

        let record = match self.with_store(|store, path| Ok(store.load(path))).await {
            Ok(record) => record,
            Err(store_error) => {
                tracing::warn!(error = %store_error, "session store unavailable");
                None
            }
        };

        let Some(record) = record else {
            return ValidationResult::invalid(REASON_CANNOT_VALIDATE);
        };

        let result = ValidationResult::ValidOffline(record.snapshot());
        if !matches!(error, Error::Cancelled { .. }) {
            self.cache.set(key, result.clone(), self.config.offline_ttl);
        }
        result
    }

    /// Update the stored snapshot, keeping the remote session when the
    /// record belongs to the same user
    async fn refresh_record(
        &self,
        identity: &RemoteIdentity,
        account: &AccountSnapshot,
    ) -> Result<()> {
        let identity = identity.clone();
        let account = account.clone();
        self.with_store(move |store, path| {
            let record = match store.load(path) {
                Some(mut record) if owned_by(&record, &identity.id) => {
                    record.refresh(account);
                    record
                }
                _ => SessionRecord::from_snapshot(account, remote_session(&identity, None, None)),
            };
            store.store(&record, path)
        })
        .await
    }

    /// Run blocking store I/O off the async workers
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&SessionStore, &Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let path = self.config.session_path.clone();
        tokio::task::spawn_blocking(move || op(&store, &path))
            .await
            .map_err(|e| Error::job_failed("session_store", e.to_string()))?
    }
}

impl fmt::Debug for SessionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn admit(limiter: &RateLimiter, device_id: &DeviceId) -> bool {
    match limiter.acquire(device_id.as_str()) {
        Ok(_) => true,
        Err(Error::Throttled { key, retry_after }) => {
            throttle_event(&key, retry_after);
            false
        }
        Err(error) => {
            tracing::warn!(error = %error, "rate limiter failure");
            false
        }
    }
}

fn owned_by(record: &SessionRecord, user_id: &str) -> bool {
    record
        .remote_session
        .get("user_id")
        .and_then(|id| id.as_str())
        .map_or(record.user.id == user_id, |id| id == user_id)
}

fn remote_session(
    identity: &RemoteIdentity,
    access_token: Option<&Credential>,
    refresh_token: Option<&Credential>,
) -> OpaqueMap {
    let mut remote = OpaqueMap::new();
    remote.insert("user_id".into(), json!(identity.id));
    if let Some(token) = access_token {
        remote.insert("access_token".into(), json!(token.expose()));
    }
    if let Some(token) = refresh_token {
        remote.insert("refresh_token".into(), json!(token.expose()));
    }
    remote
}
