// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdj_core::fake::{make_md_for_test, FakeCrypto, FakeSigner};
use mdj_core::{Clock, Revision, TlfId, UserId};
use tempfile::TempDir;

fn store(dir: &TempDir) -> MdStore<FakeCrypto> {
    MdStore::new(dir.path().join("mds"), FakeCrypto, false, MetadataVer::V3)
}

fn md(revision: u64) -> RootMetadata {
    make_md_for_test(
        MetadataVer::V3,
        &TlfId::from("tlf"),
        Revision(revision),
        &UserId::from("alice"),
        &FakeSigner::new("alice"),
        None,
    )
}

#[test]
fn put_then_get_returns_blob_and_sidecar() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let timestamp = mdj_core::FakeClock::new().now();

    let id = store.put(&md(1), timestamp).unwrap();
    let stored = store.get(id).unwrap();
    assert_eq!(stored.md, md(1));
    assert_eq!(stored.timestamp, timestamp);
    assert_eq!(stored.version, MetadataVer::V3);
}

#[test]
fn blob_path_is_splayed_by_id_prefix() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = store.put(&md(1), Utc::now()).unwrap();

    let s = id.to_string();
    let blob_dir = dir.path().join("mds").join(&s[..4]).join(&s[4..]);
    assert!(blob_dir.join("data").is_file());
    assert!(blob_dir.join("info.json").is_file());
}

#[test]
fn put_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let clock = mdj_core::FakeClock::new();
    let first = clock.now();

    let id = store.put(&md(1), first).unwrap();
    clock.advance(std::time::Duration::from_secs(60));
    let again = store.put(&md(1), clock.now()).unwrap();

    assert_eq!(id, again);
    // The original sidecar is kept
    assert_eq!(store.get(id).unwrap().timestamp, first);
}

#[test]
fn missing_blob_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let err = store.get(BlobId::fake(1)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn tampered_blob_fails_integrity_check() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = store.put(&md(1), Utc::now()).unwrap();
    let other = store.put(&md(2), Utc::now()).unwrap();

    // Swap in the other blob's bytes
    let data = fs::read(store.blob_dir(other).join("data")).unwrap();
    fs::write(store.blob_dir(id).join("data"), data).unwrap();

    let err = store.get(id).unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)));
}

#[test]
fn newer_version_than_supported_is_rejected() {
    let dir = TempDir::new().unwrap();
    let writer = store(&dir);
    let id = writer.put(&md(1), Utc::now()).unwrap();

    let reader = MdStore::new(dir.path().join("mds"), FakeCrypto, false, MetadataVer::V2);
    let err = reader.get(id).unwrap_err();
    assert!(matches!(
        err,
        StorageError::UnsupportedVersion {
            found: MetadataVer::V3,
            supported: MetadataVer::V2
        }
    ));
}

#[test]
fn sidecar_version_must_match_blob() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = store.put(&md(1), Utc::now()).unwrap();

    let info_path = store.blob_dir(id).join("info.json");
    let mut info: serde_json::Value =
        serde_json::from_slice(&fs::read(&info_path).unwrap()).unwrap();
    info["version"] = serde_json::json!(2);
    fs::write(&info_path, serde_json::to_vec(&info).unwrap()).unwrap();

    let err = store.get(id).unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)));
}

#[test]
fn remove_prunes_empty_splay_directory() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = store.put(&md(1), Utc::now()).unwrap();
    let splay = store.blob_dir(id).parent().unwrap().to_path_buf();

    store.remove(id).unwrap();
    assert!(!splay.exists());
    assert!(store.get(id).unwrap_err().is_not_found());

    // Removing again is harmless
    store.remove(id).unwrap();
}

#[test]
fn clear_removes_everything() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.put(&md(1), Utc::now()).unwrap();
    store.clear().unwrap();
    assert!(!store.dir().exists());
}
