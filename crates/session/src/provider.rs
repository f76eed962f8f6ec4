//! Seams to the external identity provider and account store

use async_trait::async_trait;
use keeper_core::{AccountSnapshot, Credential, OpaqueMap, Result};
use serde::{Deserialize, Serialize};

/// Identity confirmed by token introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub metadata: OpaqueMap,
}

/// Token introspection against the identity provider.
///
/// Implementations report a definitive "credential rejected" answer as
/// `Error::RemoteRejected` and anything transient (network failure, 5xx,
/// provider timeout) as `Error::RemoteUnavailable`. Only the latter is
/// retried. The future may be dropped at any await point when the request
/// deadline passes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn introspect(&self, credential: &Credential) -> Result<RemoteIdentity>;
}

/// Source of fresh user, subscription and usage data
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Snapshot for `identity`, or `None` when the user does not exist
    async fn account(&self, identity: &RemoteIdentity) -> Result<Option<AccountSnapshot>>;
}
