//! Checkpoint tests
//!
//! The boundary matrix here pins the loss-free chunking contract: every byte
//! of the checkpointed blob must come back, in particular when the length is
//! an exact multiple of the chunk size and when it is smaller than one chunk.

use std::path::Path;

use bytes::Bytes;
use parking_lot::Mutex;
use shardstore::{Config, NodeStore, ShardError, StorageClient};

fn chunked_config(base: &Path, chunk_size: usize) -> Config {
    Config::builder()
        .base_dir(base)
        .node_count(4)
        .chunk_size(chunk_size)
        .build()
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// Boundary Matrix
// =============================================================================

#[test]
fn test_exact_multiple_of_chunk_size() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(chunked_config(dir.path(), 8)).unwrap();

    let data = patterned(32);
    let chunks = client.checkpoint("ckpt", &data).unwrap();

    // 32 / 8 = exactly 4 chunks; the reference's `len/bs + 1` counting with
    // a `count - 1` loop would have written 4 and dropped the last.
    assert_eq!(chunks, 4);
    assert_eq!(client.restore("ckpt").unwrap().as_ref(), data.as_slice());
    client.close().unwrap();
}

#[test]
fn test_data_smaller_than_one_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(chunked_config(dir.path(), 8192)).unwrap();

    let data = patterned(5);
    let chunks = client.checkpoint("tiny", &data).unwrap();

    assert_eq!(chunks, 1);
    assert_eq!(client.restore("tiny").unwrap().as_ref(), data.as_slice());
    client.close().unwrap();
}

#[test]
fn test_trailing_partial_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(chunked_config(dir.path(), 8)).unwrap();

    let data = patterned(20);
    let chunks = client.checkpoint("ckpt", &data).unwrap();

    // 20 = 2 full chunks + 4 trailing bytes
    assert_eq!(chunks, 3);
    assert_eq!(client.restore("ckpt").unwrap().as_ref(), data.as_slice());
    client.close().unwrap();
}

#[test]
fn test_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(chunked_config(dir.path(), 8)).unwrap();

    let chunks = client.checkpoint("empty", b"").unwrap();

    assert_eq!(chunks, 0);
    assert!(client.restore("empty").unwrap().is_empty());
    client.close().unwrap();
}

#[test]
fn test_default_chunk_size_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(
        Config::builder().base_dir(dir.path()).node_count(4).build(),
    )
    .unwrap();

    // Straddles several 8192-byte chunks with a partial tail
    let data = patterned(3 * 8192 + 100);
    let chunks = client.checkpoint("model-state", &data).unwrap();

    assert_eq!(chunks, 4);
    assert_eq!(
        client.restore("model-state").unwrap().as_ref(),
        data.as_slice()
    );
    client.close().unwrap();
}

// =============================================================================
// Chunk Layout
// =============================================================================

#[test]
fn test_chunks_concatenate_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let client = StorageClient::open(chunked_config(dir.path(), 8)).unwrap();

    let data = patterned(30);
    let chunks = client.checkpoint("ckpt", &data).unwrap();

    // Reassemble by hand from the individually addressable chunk documents
    let mut reassembled = Vec::new();
    for i in 0..chunks {
        reassembled.extend_from_slice(&client.read(&format!("ckpt-c{i}")).unwrap());
    }
    assert_eq!(reassembled, data);

    // No phantom chunk past the recorded count
    let err = client.read(&format!("ckpt-c{chunks}")).unwrap_err();
    assert!(matches!(err, ShardError::KeyNotFound { .. }));
    client.close().unwrap();
}

#[test]
fn test_checkpoint_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let data = patterned(1000);

    {
        let client = StorageClient::open(chunked_config(dir.path(), 64)).unwrap();
        client.checkpoint("state", &data).unwrap();
        client.close().unwrap();
    }

    let client = StorageClient::open(chunked_config(dir.path(), 64)).unwrap();
    assert_eq!(client.restore("state").unwrap().as_ref(), data.as_slice());
    client.close().unwrap();
}

// =============================================================================
// Partial Checkpoint Reporting
// =============================================================================

/// In-memory engine that starts failing puts after a budget runs out, for
/// driving the first-failing-chunk error path.
struct FlakyStore {
    entries: std::collections::HashMap<Vec<u8>, Vec<u8>>,
    puts_left: std::sync::Arc<Mutex<u32>>,
}

impl NodeStore for FlakyStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> shardstore::Result<()> {
        let mut left = self.puts_left.lock();
        if *left == 0 {
            return Err(ShardError::Io(std::io::Error::other("budget exhausted")));
        }
        *left -= 1;
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> shardstore::Result<Bytes> {
        match self.entries.get(key) {
            Some(value) => Ok(Bytes::from(value.clone())),
            None => Err(ShardError::KeyNotFound {
                key: String::from_utf8_lossy(key).into_owned(),
            }),
        }
    }

    fn commit(&mut self) -> shardstore::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> shardstore::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failing_chunk_index_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    // Shared budget across all nodes: manifest + 2 chunks succeed, the
    // third chunk fails.
    let budget = std::sync::Arc::new(Mutex::new(3u32));
    let client = StorageClient::open_with(chunked_config(dir.path(), 8), |_, _| {
        Ok(Box::new(FlakyStore {
            entries: std::collections::HashMap::new(),
            puts_left: budget.clone(),
        }) as Box<dyn NodeStore>)
    })
    .unwrap();

    let err = client.checkpoint("ckpt", &patterned(64)).unwrap_err();
    match err {
        ShardError::Checkpoint { uri, chunk, .. } => {
            assert_eq!(uri, "ckpt");
            assert_eq!(chunk, 2);
        }
        other => panic!("expected Checkpoint error, got {other:?}"),
    }

    // Chunks before the failure are persisted and visible, not rolled back
    assert!(client.read("ckpt-c0").is_ok());
    assert!(client.read("ckpt-c1").is_ok());
    client.close().unwrap();
}
