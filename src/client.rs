//! Storage Client Module
//!
//! The routing/client layer that coordinates the hash ring and the node set.
//!
//! ## Responsibilities
//! - Route every key through the ring to its owning node
//! - Encode/decode documents at the node boundary
//! - Track the set of written keys for the reader collaborator
//! - Checkpoint large blobs as fixed-size chunk documents
//!
//! ## Data Flow
//! ```text
//! caller ──write(key, bytes)──► StorageClient ──route(key)──► HashRing
//!                                    │
//!                                    ▼
//!                              Node[idx].put(doc) ──commit──► disk
//!
//! caller ◄──payload bytes──── StorageClient ◄──get(doc)──── Node[idx]
//! ```
//!
//! ## Concurrency Model
//!
//! One client per worker process; keys are partitioned externally by worker
//! rank. Calls are blocking and synchronous. Internal mutation is serialized
//! per node (one mutex per engine) plus one mutex on the key ledger, so a
//! process that does issue concurrent calls stays consistent — but the
//! client is not designed as a concurrency primitive. No operation is
//! cancellable or carries a timeout; a hung engine blocks its caller.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::document::{decode_document, encode_document, Document};
use crate::error::{Result, ShardError};
use crate::ring::HashRing;
use crate::store::{LogStore, NodeStore};

/// One shard: a node index paired with its engine.
///
/// Created during client construction, closed exactly once by
/// [`StorageClient::close`], never re-created mid-run.
struct Node {
    index: u32,
    store: Mutex<Box<dyn NodeStore>>,
}

/// Manifest document written under the checkpoint URI itself, recording how
/// to reassemble the chunks.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointManifest {
    total_len: u64,
    chunk_size: u64,
    chunk_count: u64,
}

/// Client-side storage layer sharding documents across local nodes
pub struct StorageClient {
    /// Client configuration
    config: Config,

    /// Consistent-hashing ring, fixed for the client's lifetime
    ring: HashRing,

    /// One engine per node index, each behind its own mutex
    nodes: Vec<Node>,

    /// Keys successfully written this run, in write order. Grows
    /// monotonically; consumed by the reader collaborator to know what to
    /// fetch.
    written_keys: Mutex<Vec<String>>,

    /// Set once by `close`; all operations fail afterwards
    closed: AtomicBool,
}

impl StorageClient {
    /// Open a client over the default per-node engine ([`LogStore`]).
    ///
    /// Builds the ring, then opens every node's engine under
    /// `{base_dir}/{topology}/node<i>`. A failure to open any single node is
    /// fatal for the whole client: construction aborts with
    /// [`PartialTopology`](ShardError::PartialTopology) and nothing usable
    /// is left behind.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, |_, root| {
            Ok(Box::new(LogStore::open(root)?) as Box<dyn NodeStore>)
        })
    }

    /// Open a client with a custom engine factory.
    ///
    /// The factory is called once per node index with that node's root
    /// directory. This is the seam for plugging in a different storage
    /// engine without touching the routing layer.
    pub fn open_with<F>(config: Config, mut factory: F) -> Result<Self>
    where
        F: FnMut(u32, &Path) -> Result<Box<dyn NodeStore>>,
    {
        if config.chunk_size == 0 {
            return Err(ShardError::Config(
                "chunk_size must be non-zero".to_string(),
            ));
        }

        // Step 1: Build the ring (rejects a zero-node topology)
        let ring = HashRing::build(config.node_count, config.virtual_replicas)?;

        // Step 2: Create the topology root
        let topology_dir = config.base_dir.join(&config.topology);
        fs::create_dir_all(&topology_dir)?;

        // Step 3: Open every node engine; abort on the first failure
        let mut nodes = Vec::with_capacity(config.node_count as usize);
        for index in 0..config.node_count {
            let root = topology_dir.join(format!("node{index}"));
            let store = factory(index, &root).map_err(|e| ShardError::PartialTopology {
                node: index,
                source: Box::new(e),
            })?;
            nodes.push(Node {
                index,
                store: Mutex::new(store),
            });
        }

        info!(
            nodes = config.node_count,
            replicas = config.virtual_replicas,
            root = %topology_dir.display(),
            "storage client initialized"
        );

        Ok(Self {
            config,
            ring,
            nodes,
            written_keys: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Write a keyed payload to its owning node.
    ///
    /// Routes the key, encodes the document, upserts it on the target node,
    /// and — with `autocommit` on (the default) — synchronously commits that
    /// single node. The key enters the written-key ledger only after the
    /// whole write succeeds.
    pub fn write(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let node = self.node_for(key.as_bytes())?;

        let doc = Document::new(
            Bytes::copy_from_slice(key.as_bytes()),
            Bytes::copy_from_slice(payload),
        );
        let encoded = encode_document(&doc);

        let result = {
            let mut store = node.store.lock();
            store
                .put(key.as_bytes(), &encoded)
                .and_then(|_| {
                    if self.config.autocommit {
                        store.commit()
                    } else {
                        Ok(())
                    }
                })
                .map_err(|e| node_err(node.index, e))
        };

        match result {
            Ok(()) => {
                self.written_keys.lock().push(key.to_string());
                debug!(key, node = node.index, len = payload.len(), "write");
                Ok(())
            }
            Err(e) => {
                error!(key, node = node.index, error = %e, "write failed");
                Err(e)
            }
        }
    }

    /// Read a payload back by key.
    ///
    /// Fails with [`KeyNotFound`](ShardError::KeyNotFound) for keys never
    /// written. A stored zero-length payload comes back as an empty `Bytes`,
    /// which is a different outcome from not-found.
    pub fn read(&self, key: &str) -> Result<Bytes> {
        self.ensure_open()?;
        let node = self.node_for(key.as_bytes())?;

        let raw = {
            let mut store = node.store.lock();
            store.get(key.as_bytes()).map_err(|e| node_err(node.index, e))
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                if !matches!(e, ShardError::KeyNotFound { .. }) {
                    error!(key, node = node.index, error = %e, "read failed");
                }
                return Err(e);
            }
        };

        let doc = decode_document(raw)?;
        if doc.id.as_ref() != key.as_bytes() {
            return Err(ShardError::CorruptDocument(format!(
                "document id does not match requested key {key}"
            )));
        }

        debug!(key, node = node.index, len = doc.payload.len(), "read");
        Ok(doc.payload)
    }

    /// Persist `data` as a manifest plus fixed-size chunk documents.
    ///
    /// Writes `ceil(len / chunk_size)` chunks keyed `"<uri>-c<i>"`, covering
    /// every byte including the final short chunk, then commits all nodes.
    /// Returns the chunk count.
    ///
    /// On failure the error names the first failing chunk; chunks before it
    /// are already persisted (partial checkpoints are possible and visible,
    /// never silently hidden). Checkpoint documents do not enter the
    /// written-key ledger.
    pub fn checkpoint(&self, uri: &str, data: &[u8]) -> Result<u64> {
        self.ensure_open()?;

        let chunk_size = self.config.chunk_size;
        // Ceil division: the trailing partial chunk is real data. A
        // `len / chunk_size + 1` count with a `count - 1` loop would drop it
        // (and drop a full chunk on exact multiples).
        let chunk_count = (data.len() as u64).div_ceil(chunk_size as u64);

        let manifest = CheckpointManifest {
            total_len: data.len() as u64,
            chunk_size: chunk_size as u64,
            chunk_count,
        };
        let manifest_bytes =
            bincode::serialize(&manifest).map_err(|e| ShardError::Serialization(e.to_string()))?;
        self.put_document(uri, &manifest_bytes)?;

        for chunk in 0..chunk_count {
            let start = chunk as usize * chunk_size;
            let end = usize::min(start + chunk_size, data.len());
            self.put_document(&chunk_key(uri, chunk), &data[start..end])
                .map_err(|e| ShardError::Checkpoint {
                    uri: uri.to_string(),
                    chunk,
                    source: Box::new(e),
                })?;
        }

        self.commit()?;
        debug!(uri, chunks = chunk_count, total = data.len(), "checkpoint");
        Ok(chunk_count)
    }

    /// Reassemble a checkpoint written by [`checkpoint`](Self::checkpoint).
    ///
    /// Reads the manifest under `uri`, concatenates the chunks in index
    /// order, and verifies the recorded total length.
    pub fn restore(&self, uri: &str) -> Result<Bytes> {
        self.ensure_open()?;

        let manifest_bytes = self.read(uri)?;
        let manifest: CheckpointManifest = bincode::deserialize(&manifest_bytes)
            .map_err(|e| ShardError::Serialization(e.to_string()))?;

        let mut data = BytesMut::with_capacity(manifest.total_len as usize);
        for chunk in 0..manifest.chunk_count {
            let part = self.read(&chunk_key(uri, chunk))?;
            data.extend_from_slice(&part);
        }

        if data.len() as u64 != manifest.total_len {
            return Err(ShardError::CorruptDocument(format!(
                "checkpoint {uri}: reassembled {} bytes, manifest records {}",
                data.len(),
                manifest.total_len
            )));
        }

        Ok(data.freeze())
    }

    /// Flush every node's pending writes to durable storage.
    ///
    /// Called implicitly per-write under `autocommit`; exposed standalone
    /// for checkpoint batches and bulk loads.
    pub fn commit(&self) -> Result<()> {
        self.ensure_open()?;

        for node in &self.nodes {
            node.store
                .lock()
                .commit()
                .map_err(|e| node_err(node.index, e))?;
        }

        Ok(())
    }

    /// Close every node engine.
    ///
    /// Single-shot: the first call commits and closes everything, every
    /// later operation (including a second `close`) fails with
    /// [`Closed`](ShardError::Closed).
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ShardError::Closed);
        }

        for node in &self.nodes {
            node.store
                .lock()
                .close()
                .map_err(|e| node_err(node.index, e))?;
        }

        info!("storage client closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Snapshot of the keys written so far, in write order
    pub fn written_keys(&self) -> Vec<String> {
        self.written_keys.lock().clone()
    }

    /// Number of keys written so far
    pub fn written_key_count(&self) -> usize {
        self.written_keys.lock().len()
    }

    /// Route a key to its owning node index without touching storage
    pub fn route(&self, key: &str) -> Result<u32> {
        self.ring.route(key.as_bytes())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the ring
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ShardError::Closed);
        }
        Ok(())
    }

    fn node_for(&self, key: &[u8]) -> Result<&Node> {
        let index = self.ring.route(key)?;
        // The ring only produces indices it was seeded with, which match
        // `nodes` one-to-one by construction.
        Ok(&self.nodes[index as usize])
    }

    /// Route, encode, and upsert without touching the ledger or committing
    fn put_document(&self, key: &str, payload: &[u8]) -> Result<()> {
        let node = self.node_for(key.as_bytes())?;
        let doc = Document::new(
            Bytes::copy_from_slice(key.as_bytes()),
            Bytes::copy_from_slice(payload),
        );
        node.store
            .lock()
            .put(key.as_bytes(), &encode_document(&doc))
            .map_err(|e| node_err(node.index, e))
    }
}

/// Key under which chunk `index` of checkpoint `uri` is stored
fn chunk_key(uri: &str, index: u64) -> String {
    format!("{uri}-c{index}")
}

/// Attach the node index to engine-level I/O failures
fn node_err(node: u32, err: ShardError) -> ShardError {
    match err {
        ShardError::Io(source) => ShardError::NodeIo { node, source },
        other => other,
    }
}
