//! Credential and device identifier newtypes

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bearer credential presented by a client.
///
/// The raw value zeroizes on drop and never appears in `Debug` output; logs
/// and cache keys use [`Credential::fingerprint`] instead.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    /// Create a new credential, rejecting empty values
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::configuration("credential must not be empty"));
        }
        Ok(Self(value))
    }

    /// Get the raw credential for forwarding to the identity provider
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Stable SHA-256 fingerprint used for cache keys and log fields
    #[must_use]
    pub fn fingerprint(&self) -> CredentialFingerprint {
        let digest = Sha256::digest(self.0.as_bytes());
        CredentialFingerprint(hex::encode(digest))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Hex-encoded SHA-256 of a credential
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialFingerprint(String);

impl CredentialFingerprint {
    /// Get the inner hex string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl Display for CredentialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Stable per-device identifier.
///
/// Keys the auth rate limiter and seeds the session-store key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id, rejecting empty values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::configuration("device id must not be empty"));
        }
        Ok(Self(id))
    }

    /// Derive a device id from hostname, OS and architecture.
    ///
    /// The first 32 hex characters of SHA-256 over `host-os-arch`.
    #[must_use]
    pub fn from_host() -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_machine_info(&host, std::env::consts::OS, std::env::consts::ARCH)
    }

    fn from_machine_info(host: &str, os: &str, arch: &str) -> Self {
        let digest = Sha256::digest(format!("{host}-{os}-{arch}").as_bytes());
        let mut id = hex::encode(digest);
        id.truncate(32);
        Self(id)
    }

    /// Get the inner string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for DeviceId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = Credential::new("token-a").unwrap();
        let b = Credential::new("token-b").unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(Credential::new("  ").is_err());
        assert!(DeviceId::new("").is_err());
        assert!("device-1".parse::<DeviceId>().is_ok());
    }

    #[test]
    fn test_device_id_from_machine_info() {
        let id = DeviceId::from_machine_info("host", "linux", "x86_64");
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(id, DeviceId::from_machine_info("host", "linux", "x86_64"));
        assert_ne!(id, DeviceId::from_machine_info("other", "linux", "x86_64"));
    }

    proptest::proptest! {
        #[test]
        fn prop_fingerprint_is_hex_sha256(token in "[!-~]{1,64}") {
            let fingerprint = Credential::new(token).unwrap().fingerprint();
            proptest::prop_assert_eq!(fingerprint.as_str().len(), 64);
            proptest::prop_assert!(fingerprint.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
