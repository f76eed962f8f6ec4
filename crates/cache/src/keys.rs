//! Namespaced cache keys
//!
//! Identity, session and API-response entries share one cache in most
//! deployments. Every key is prefixed with its kind so entries of different
//! kinds never collide, and each kind has a conventional TTL.

use keeper_core::{
    CredentialFingerprint, API_KEY_PREFIX, API_RESPONSE_TTL, SESSION_KEY_PREFIX,
    TRANSCRIPTION_KEY_PREFIX, TRANSCRIPTION_TTL, USER_KEY_PREFIX, USER_TTL, VALID_SESSION_TTL,
};
use std::fmt;
use std::time::Duration;

/// A cache key tagged with its namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    ttl: Duration,
}

impl CacheKey {
    /// Validation result for a credential; keyed by fingerprint, never the raw token
    #[must_use]
    pub fn session(fingerprint: &CredentialFingerprint) -> Self {
        Self::namespaced(SESSION_KEY_PREFIX, fingerprint.as_str(), VALID_SESSION_TTL)
    }

    /// User record by id
    #[must_use]
    pub fn user(user_id: &str) -> Self {
        Self::namespaced(USER_KEY_PREFIX, user_id, USER_TTL)
    }

    /// Response of an upstream API call, keyed by endpoint and parameters
    #[must_use]
    pub fn api_response(endpoint: &str, params: &str) -> Self {
        Self::namespaced(API_KEY_PREFIX, &format!("{endpoint}:{params}"), API_RESPONSE_TTL)
    }

    /// Result of an expensive transcription job, keyed by content hash
    #[must_use]
    pub fn transcription(content_hash: &str) -> Self {
        Self::namespaced(TRANSCRIPTION_KEY_PREFIX, content_hash, TRANSCRIPTION_TTL)
    }

    fn namespaced(prefix: &str, id: &str, ttl: Duration) -> Self {
        Self {
            key: format!("{prefix}{id}"),
            ttl,
        }
    }

    /// The full prefixed key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Conventional TTL for this kind of entry
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    /// Consume into the prefixed key string
    #[must_use]
    pub fn into_string(self) -> String {
        self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.key
    }
}
