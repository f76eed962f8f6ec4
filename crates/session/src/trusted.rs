//! Allowlist of principals granted an unlimited plan
//!
//! Applied by callers after validation, so the resilience state machine
//! never special-cases accounts.

use keeper_config::KeeperConfig;
use keeper_core::{AccountSnapshot, OpaqueMap, UsageSnapshot, ValidationResult};
use serde_json::json;
use std::collections::HashSet;

/// Case-insensitive set of trusted e-mail addresses
#[derive(Debug, Clone, Default)]
pub struct TrustedPrincipals {
    emails: HashSet<String>,
}

impl TrustedPrincipals {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_settings(config: &KeeperConfig) -> Self {
        Self::new(&config.trusted_principals)
    }

    #[must_use]
    pub fn is_trusted(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    /// Grant the enterprise plan to trusted users. `Invalid` results and
    /// untrusted users pass through unchanged.
    #[must_use]
    pub fn elevate(&self, result: ValidationResult) -> ValidationResult {
        match result {
            ValidationResult::Valid(snapshot) if self.is_trusted(&snapshot.user.email) => {
                ValidationResult::Valid(self.elevated(snapshot))
            }
            ValidationResult::ValidOffline(snapshot) if self.is_trusted(&snapshot.user.email) => {
                ValidationResult::ValidOffline(self.elevated(snapshot))
            }
            other => other,
        }
    }

    fn elevated(&self, snapshot: AccountSnapshot) -> AccountSnapshot {
        tracing::debug!(user_id = %snapshot.user.id, "elevating trusted principal");
        AccountSnapshot {
            subscription: enterprise_subscription(),
            usage: UsageSnapshot::unlimited(snapshot.usage.current_month),
            user: snapshot.user,
        }
    }
}

fn enterprise_subscription() -> OpaqueMap {
    let mut subscription = OpaqueMap::new();
    subscription.insert("plan".into(), json!("enterprise"));
    subscription.insert("status".into(), json!("active"));
    subscription.insert("limits".into(), json!({ "minutes": -1, "features": ["all"] }));
    subscription
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::UserSnapshot;

    fn snapshot(email: &str) -> AccountSnapshot {
        let mut subscription = OpaqueMap::new();
        subscription.insert("plan".into(), json!("free"));
        AccountSnapshot {
            user: UserSnapshot::new("u-1", email),
            subscription,
            usage: UsageSnapshot::limited(40, 60),
        }
    }

    #[test]
    fn test_trusted_user_is_elevated() {
        let trusted = TrustedPrincipals::new(["Ops@Example.com"]);
        let result = trusted.elevate(ValidationResult::ValidOffline(snapshot("ops@example.COM")));

        assert!(result.is_offline());
        let account = result.snapshot().unwrap();
        assert_eq!(account.subscription["plan"], "enterprise");
        assert_eq!(account.usage, UsageSnapshot::unlimited(40));
    }

    #[test]
    fn test_others_pass_through() {
        let trusted = TrustedPrincipals::new(["ops@example.com"]);

        let plain = ValidationResult::Valid(snapshot("ada@example.com"));
        assert_eq!(trusted.elevate(plain.clone()), plain);

        let invalid = ValidationResult::invalid("cannot validate session");
        assert_eq!(trusted.elevate(invalid.clone()), invalid);

        assert!(TrustedPrincipals::default().is_empty());
        assert!(!TrustedPrincipals::new(["  "]).is_trusted(""));
    }
}
