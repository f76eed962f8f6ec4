//! Encrypted on-disk session store
//!
//! One record per device, written as a single `nonce:ciphertext` text blob
//! with owner-only permissions. Reads are total: a missing, truncated,
//! tampered or otherwise undecryptable file loads as "no session".

use crate::blob::EncryptedBlob;
use crate::kdf::{derive_key, KdfConfig, SessionKey};
use keeper_core::{DeviceId, Error, Result, SessionRecord, SESSION_FILE_NAME, SESSION_KDF_SALT};
use keeper_utils::{remove_if_exists, write_atomic_private};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Encrypts session records with a key derived from the device id.
///
/// Key derivation is expensive and happens once in [`SessionStore::new`];
/// clones share the derived key. All I/O is blocking, so async callers
/// should go through `spawn_blocking`.
#[derive(Clone)]
pub struct SessionStore {
    key: Arc<SessionKey>,
}

impl SessionStore {
    /// Derive the store key for `device_id`
    pub fn new(device_id: &DeviceId, kdf: &KdfConfig) -> Result<Self> {
        kdf.validate()?;
        let key = derive_key(device_id.as_bytes(), SESSION_KDF_SALT, kdf)?;
        tracing::debug!(
            memory_kib = kdf.memory_kib,
            iterations = kdf.iterations,
            "derived session store key"
        );
        Ok(Self { key: Arc::new(key) })
    }

    /// Platform data directory for keeper, e.g. `~/.local/share/keeper`
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("keeper"))
    }

    /// Session file inside `dir`
    #[must_use]
    pub fn session_path(dir: &Path) -> PathBuf {
        dir.join(SESSION_FILE_NAME)
    }

    /// Serialize, encrypt with a fresh nonce and atomically replace `path`
    pub fn store(&self, record: &SessionRecord, path: &Path) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let blob = EncryptedBlob::seal(&self.key, &plaintext)?;
        write_atomic_private(path, blob.encode().as_bytes())?;
        tracing::debug!(path = %path.display(), "session record stored");
        Ok(())
    }

    /// Load the record at `path`; any failure is reported as absent
    #[must_use]
    pub fn load(&self, path: &Path) -> Option<SessionRecord> {
        match self.try_load(path) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "ignoring unreadable session record"
                );
                None
            }
        }
    }

    /// Load the record at `path`, distinguishing "absent" from "corrupt".
    ///
    /// Returns `Ok(None)` when no file exists and
    /// [`Error::CorruptSession`] when the file cannot be authenticated or
    /// parsed.
    pub fn try_load(&self, path: &Path) -> Result<Option<SessionRecord>> {
        let encoded = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(path, "read session", e)),
        };

        let encoded = std::str::from_utf8(&encoded)
            .map_err(|_| Error::corrupt_session(path, "not valid UTF-8"))?;
        let blob = EncryptedBlob::parse(encoded)
            .map_err(|e| Error::corrupt_session(path, e.to_string()))?;
        let plaintext = blob
            .open(&self.key)
            .map_err(|e| Error::corrupt_session(path, e.to_string()))?;
        let record = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::corrupt_session(path, format!("invalid record: {e}")))?;

        Ok(Some(record))
    }

    /// Delete the record at `path`. Clearing a missing file is a no-op.
    pub fn clear(&self, path: &Path) -> Result<()> {
        if remove_if_exists(path)? {
            tracing::debug!(path = %path.display(), "session record cleared");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
