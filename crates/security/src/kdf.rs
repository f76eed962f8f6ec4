//! Memory-hard key derivation
//!
//! The session key is derived from the device identifier, which is not a
//! secret in the cryptographic sense. Argon2id makes brute-forcing a stolen
//! blob expensive; it does not make the identifier itself secret.

use argon2::{Algorithm, Argon2, Params, Version};
use keeper_core::{Error, Result};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Length of the derived AES-256 key
pub const KEY_LEN: usize = 32;

/// Lowest memory cost accepted by [`KdfConfig::validate`]
pub const MIN_MEMORY_KIB: u32 = 8;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfConfig {
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(Error::configuration(format!(
                "KDF memory cost must be at least {MIN_MEMORY_KIB} KiB"
            )));
        }
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(Error::configuration(
                "KDF iterations and parallelism must be non-zero",
            ));
        }
        self.params().map(|_| ())
    }

    fn params(&self) -> Result<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| Error::configuration(format!("invalid KDF parameters: {e}")))
    }
}

/// Derived 256-bit key, wiped from memory on drop
#[derive(Clone)]
pub struct SessionKey(Zeroizing<[u8; KEY_LEN]>);

impl SessionKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Derive a 32-byte key from `secret` and `salt` with Argon2id.
///
/// Deliberately slow; callers derive once and reuse the key.
pub fn derive_key(secret: &[u8], salt: &[u8], config: &KdfConfig) -> Result<SessionKey> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.params()?);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(secret, salt, &mut key[..])
        .map_err(|e| Error::crypto(format!("key derivation failed: {e}")))?;
    Ok(SessionKey(key))
}
