//! AES-256-GCM blob with a `hex(nonce):hex(ciphertext)` text encoding

use crate::kdf::SessionKey;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use keeper_core::{Error, Result};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Nonce size for AES-256-GCM (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag appended to every ciphertext (128 bits)
pub const TAG_SIZE: usize = 16;

const SEPARATOR: char = ':';

/// Sealed payload: a fresh random nonce and the tagged ciphertext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encrypt `plaintext` under `key` with a freshly generated nonce
    pub fn seal(key: &SessionKey, plaintext: &[u8]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| Error::crypto(format!("failed to create cipher: {e}")))?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| Error::crypto(format!("encryption failed: {e}")))?;

        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt and authenticate. Any tampering or a wrong key fails closed.
    pub fn open(&self, key: &SessionKey) -> Result<Zeroizing<Vec<u8>>> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| Error::crypto(format!("failed to create cipher: {e}")))?;

        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| Error::crypto("authentication failed"))
    }

    /// Serialize as `hex(nonce):hex(ciphertext)`
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{SEPARATOR}{}",
            hex::encode(self.nonce),
            hex::encode(&self.ciphertext)
        )
    }

    /// Parse the text encoding, rejecting anything malformed
    pub fn parse(encoded: &str) -> Result<Self> {
        let (nonce_hex, ciphertext_hex) = encoded
            .trim()
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::crypto("missing nonce separator"))?;

        let nonce_bytes =
            hex::decode(nonce_hex).map_err(|e| Error::crypto(format!("invalid nonce hex: {e}")))?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| Error::crypto("invalid nonce size"))?;

        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| Error::crypto(format!("invalid ciphertext hex: {e}")))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::crypto("ciphertext shorter than authentication tag"));
        }

        Ok(Self { nonce, ciphertext })
    }

    #[must_use]
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for EncryptedBlob {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
