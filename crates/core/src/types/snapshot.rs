//! Point-in-time account snapshots and the persisted session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque JSON object used for provider-owned data
pub type OpaqueMap = Map<String, Value>;

/// User as last seen by the identity provider and account directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: OpaqueMap,
}

impl UserSnapshot {
    /// Create a snapshot with empty metadata
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            metadata: OpaqueMap::new(),
        }
    }
}

/// Monthly usage counters; `None` limits mean unlimited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub current_month: u64,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
}

impl UsageSnapshot {
    /// Usage snapshot with no limit
    #[must_use]
    pub fn unlimited(current_month: u64) -> Self {
        Self {
            current_month,
            limit: None,
            remaining: None,
        }
    }

    /// Usage snapshot with a monthly limit
    #[must_use]
    pub fn limited(current_month: u64, limit: u64) -> Self {
        Self {
            current_month,
            limit: Some(limit),
            remaining: Some(limit.saturating_sub(current_month)),
        }
    }
}

/// Everything a UI needs to render a signed-in state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub user: UserSnapshot,
    #[serde(default)]
    pub subscription: OpaqueMap,
    #[serde(default)]
    pub usage: UsageSnapshot,
}

/// Encrypted-at-rest copy of the last successful validation.
///
/// The identity provider is the source of truth; this record is only read
/// when the provider cannot be reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub remote_session: OpaqueMap,
    pub user: UserSnapshot,
    #[serde(default)]
    pub subscription: OpaqueMap,
    #[serde(default)]
    pub usage: UsageSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Build a record from an account snapshot and the provider's session map
    #[must_use]
    pub fn from_snapshot(snapshot: AccountSnapshot, remote_session: OpaqueMap) -> Self {
        Self {
            remote_session,
            user: snapshot.user,
            subscription: snapshot.subscription,
            usage: snapshot.usage,
            stored_at: Some(Utc::now()),
        }
    }

    /// Replace the account data while keeping the remote session map
    pub fn refresh(&mut self, snapshot: AccountSnapshot) {
        self.user = snapshot.user;
        self.subscription = snapshot.subscription;
        self.usage = snapshot.usage;
        self.stored_at = Some(Utc::now());
    }

    /// Account view of the record
    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            user: self.user.clone(),
            subscription: self.subscription.clone(),
            usage: self.usage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> AccountSnapshot {
        let mut subscription = OpaqueMap::new();
        subscription.insert("plan".into(), json!("pro"));
        AccountSnapshot {
            user: UserSnapshot::new("u-1", "ada@example.com"),
            subscription,
            usage: UsageSnapshot::limited(40, 100),
        }
    }

    #[test]
    fn test_limited_usage_saturates() {
        assert_eq!(UsageSnapshot::limited(40, 100).remaining, Some(60));
        assert_eq!(UsageSnapshot::limited(140, 100).remaining, Some(0));
        assert_eq!(UsageSnapshot::unlimited(5).limit, None);
    }

    #[test]
    fn test_refresh_keeps_remote_session() {
        let mut remote = OpaqueMap::new();
        remote.insert("user_id".into(), json!("u-1"));
        let mut record = SessionRecord::from_snapshot(snapshot(), remote.clone());

        let mut fresh = snapshot();
        fresh.usage = UsageSnapshot::limited(41, 100);
        record.refresh(fresh.clone());

        assert_eq!(record.remote_session, remote);
        assert_eq!(record.snapshot(), fresh);
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = SessionRecord::from_snapshot(snapshot(), OpaqueMap::new());
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: SessionRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
