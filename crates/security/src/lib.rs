//! Session persistence security for keeper
//!
//! This crate provides:
//! - Memory-hard key derivation from a device identifier (Argon2id)
//! - The `nonce:ciphertext` AES-256-GCM blob format
//! - The encrypted on-disk session store used for offline validation

pub mod blob;
pub mod kdf;
pub mod session_store;

pub use blob::EncryptedBlob;
pub use kdf::{derive_key, KdfConfig, SessionKey};
pub use session_store::SessionStore;
