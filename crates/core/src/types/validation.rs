//! Tri-state session validation outcome

use super::snapshot::AccountSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of validating a session.
///
/// Callers only ever see one of these three variants, never a transport or
/// decryption error, so UI layers can render "signed in", "signed in
/// (offline)" or "signed out" directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Confirmed by the identity provider
    Valid(AccountSnapshot),
    /// Provider unreachable; served from the encrypted on-disk record
    ValidOffline(AccountSnapshot),
    /// Not signed in
    Invalid { reason: String },
}

/// Variant discriminant, used for TTL selection and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTag {
    Valid,
    ValidOffline,
    Invalid,
}

impl ValidationResult {
    /// Create an invalid result with a reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        ValidationResult::Invalid {
            reason: reason.into(),
        }
    }

    /// Discriminant of this result
    #[must_use]
    pub fn tag(&self) -> ValidationTag {
        match self {
            ValidationResult::Valid(_) => ValidationTag::Valid,
            ValidationResult::ValidOffline(_) => ValidationTag::ValidOffline,
            ValidationResult::Invalid { .. } => ValidationTag::Invalid,
        }
    }

    /// Whether the client may proceed (online or offline)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, ValidationResult::Invalid { .. })
    }

    /// Whether the result came from the offline fallback
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, ValidationResult::ValidOffline(_))
    }

    /// Account snapshot for valid results
    #[must_use]
    pub fn snapshot(&self) -> Option<&AccountSnapshot> {
        match self {
            ValidationResult::Valid(snapshot) | ValidationResult::ValidOffline(snapshot) => {
                Some(snapshot)
            }
            ValidationResult::Invalid { .. } => None,
        }
    }

    /// Reason for invalid results
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationResult::Invalid { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationTag::Valid => write!(f, "valid"),
            ValidationTag::ValidOffline => write!(f, "valid_offline"),
            ValidationTag::Invalid => write!(f, "invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{UsageSnapshot, UserSnapshot};

    fn account() -> AccountSnapshot {
        AccountSnapshot {
            user: UserSnapshot::new("u-1", "ada@example.com"),
            subscription: Default::default(),
            usage: UsageSnapshot::unlimited(0),
        }
    }

    #[test]
    fn test_accessors() {
        let valid = ValidationResult::Valid(account());
        let offline = ValidationResult::ValidOffline(account());
        let invalid = ValidationResult::invalid("cannot validate session");

        assert!(valid.is_valid() && !valid.is_offline());
        assert!(offline.is_valid() && offline.is_offline());
        assert!(!invalid.is_valid());
        assert_eq!(invalid.reason(), Some("cannot validate session"));
        assert!(invalid.snapshot().is_none());
        assert_eq!(offline.tag(), ValidationTag::ValidOffline);
    }

    #[test]
    fn test_serialized_status_tag() {
        let json = serde_json::to_value(ValidationResult::invalid("nope")).unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["reason"], "nope");

        let json = serde_json::to_value(ValidationResult::ValidOffline(account())).unwrap();
        assert_eq!(json["status"], "valid_offline");
        assert_eq!(json["user"]["email"], "ada@example.com");
    }
}
