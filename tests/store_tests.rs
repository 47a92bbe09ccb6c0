//! Log store tests

use std::fs::OpenOptions;
use std::io::Write;

use shardstore::{LogStore, NodeStore, ShardError};

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LogStore::open(dir.path()).unwrap();

    store.put(b"alpha", b"one").unwrap();
    store.put(b"beta", b"two").unwrap();

    assert_eq!(store.get(b"alpha").unwrap().as_ref(), b"one");
    assert_eq!(store.get(b"beta").unwrap().as_ref(), b"two");
    assert_eq!(store.entry_count(), 2);
}

#[test]
fn test_get_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LogStore::open(dir.path()).unwrap();

    let err = store.get(b"nope").unwrap_err();
    assert!(matches!(err, ShardError::KeyNotFound { .. }));
}

#[test]
fn test_upsert_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LogStore::open(dir.path()).unwrap();

    store.put(b"key", b"old").unwrap();
    store.put(b"key", b"new").unwrap();

    assert_eq!(store.get(b"key").unwrap().as_ref(), b"new");
    assert_eq!(store.entry_count(), 1);
}

#[test]
fn test_empty_value_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LogStore::open(dir.path()).unwrap();

    store.put(b"empty", b"").unwrap();
    assert!(store.get(b"empty").unwrap().is_empty());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_operations_fail_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LogStore::open(dir.path()).unwrap();

    store.put(b"key", b"value").unwrap();
    store.close().unwrap();
    // A second close is a no-op, not a fault
    store.close().unwrap();

    assert!(matches!(
        store.put(b"key", b"value").unwrap_err(),
        ShardError::Closed
    ));
    assert!(matches!(store.get(b"key").unwrap_err(), ShardError::Closed));
    assert!(matches!(store.commit().unwrap_err(), ShardError::Closed));
}

// =============================================================================
// Recovery
// =============================================================================

#[test]
fn test_reopen_recovers_index() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut store = LogStore::open(dir.path()).unwrap();
        for i in 0..20 {
            store
                .put(format!("key{i}").as_bytes(), format!("value{i}").as_bytes())
                .unwrap();
        }
        store.commit().unwrap();
        store.close().unwrap();
    }

    let mut store = LogStore::open(dir.path()).unwrap();
    assert_eq!(store.entry_count(), 20);
    for i in 0..20 {
        assert_eq!(
            store.get(format!("key{i}").as_bytes()).unwrap().as_ref(),
            format!("value{i}").as_bytes()
        );
    }
}

#[test]
fn test_torn_tail_is_truncated_on_open() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut store = LogStore::open(dir.path()).unwrap();
        store.put(b"survivor", b"intact").unwrap();
        store.commit().unwrap();
        store.close().unwrap();
    }

    // Simulate a crash mid-append: a record header claiming more bytes than
    // the file holds.
    {
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join("data.log"))
            .unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(b"partial").unwrap();
    }

    let mut store = LogStore::open(dir.path()).unwrap();
    assert_eq!(store.entry_count(), 1);
    assert_eq!(store.get(b"survivor").unwrap().as_ref(), b"intact");

    // The log must be writable again after truncation
    store.put(b"fresh", b"write").unwrap();
    assert_eq!(store.get(b"fresh").unwrap().as_ref(), b"write");
}
