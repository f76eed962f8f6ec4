//! Encrypted session store round trips and failure handling

use keeper_core::{
    AccountSnapshot, DeviceId, Error, OpaqueMap, SessionRecord, UsageSnapshot, UserSnapshot,
};
use keeper_security::{KdfConfig, SessionStore};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn cheap_kdf() -> KdfConfig {
    KdfConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

fn store_for(device: &str) -> SessionStore {
    SessionStore::new(&DeviceId::new(device).unwrap(), &cheap_kdf()).unwrap()
}

fn record() -> SessionRecord {
    let mut remote = OpaqueMap::new();
    remote.insert("access_token".into(), json!("at-123"));
    remote.insert("refresh_token".into(), json!("rt-456"));
    remote.insert("user_id".into(), json!("u-1"));

    let mut subscription = OpaqueMap::new();
    subscription.insert("plan".into(), json!("pro"));
    subscription.insert("status".into(), json!("active"));

    SessionRecord::from_snapshot(
        AccountSnapshot {
            user: UserSnapshot::new("u-1", "ada@example.com"),
            subscription,
            usage: UsageSnapshot::limited(12, 300),
        },
        remote,
    )
}

#[test]
fn test_store_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");
    let original = record();

    store.store(&original, &path).unwrap();
    assert_eq!(store.load(&path), Some(original));
}

#[test]
fn test_file_is_hex_blob_not_plaintext() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    store_for("device-1").store(&record(), &path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let (nonce, ciphertext) = contents.split_once(':').unwrap();
    assert_eq!(nonce.len(), 24);
    assert!(ciphertext.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!contents.contains("ada@example.com"));
    assert!(!contents.contains("at-123"));
}

#[cfg(unix)]
#[test]
fn test_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    store_for("device-1").store(&record(), &path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_never_written_path_is_absent() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");

    assert_eq!(store.load(&path), None);
    assert!(store.try_load(&path).unwrap().is_none());
}

#[test]
fn test_corrupted_last_byte_is_absent() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");
    store.store(&record(), &path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == b'0' { b'1' } else { b'0' };
    fs::write(&path, bytes).unwrap();

    assert_eq!(store.load(&path), None);
    assert!(matches!(
        store.try_load(&path),
        Err(Error::CorruptSession { .. })
    ));
}

#[test]
fn test_truncated_and_garbage_files_are_absent() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");
    store.store(&record(), &path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    fs::write(&path, &contents[..contents.len() / 2]).unwrap();
    assert_eq!(store.load(&path), None);

    fs::write(&path, "no separator here").unwrap();
    assert_eq!(store.load(&path), None);

    fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    assert_eq!(store.load(&path), None);
}

#[test]
fn test_other_device_cannot_read() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    store_for("device-1").store(&record(), &path).unwrap();

    assert_eq!(store_for("device-2").load(&path), None);
}

#[test]
fn test_clear_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");
    store.store(&record(), &path).unwrap();

    store.clear(&path).unwrap();
    assert!(!path.exists());
    store.clear(&path).unwrap();
    assert_eq!(store.load(&path), None);
}

#[test]
fn test_store_overwrites_previous_record() {
    let dir = TempDir::new().unwrap();
    let path = SessionStore::session_path(dir.path());
    let store = store_for("device-1");
    store.store(&record(), &path).unwrap();

    let mut updated = record();
    updated.refresh(AccountSnapshot {
        user: UserSnapshot::new("u-1", "ada@example.com"),
        subscription: OpaqueMap::new(),
        usage: UsageSnapshot::limited(13, 300),
    });
    store.store(&updated, &path).unwrap();

    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.usage.current_month, 13);
    assert_eq!(loaded.remote_session["access_token"], "at-123");
}
