//! Node Store Module
//!
//! Per-node embedded storage engines and the capability trait the routing
//! layer sees.
//!
//! ## Responsibilities
//! - Persist one node's shard of documents, independently of every other node
//! - Point lookups and upserts by key
//! - A durability barrier (`commit`) and a single-shot `close`
//!
//! Each node's storage is rooted in its own directory; there is no shared
//! on-disk structure and no cross-node transaction. The client layer only
//! ever talks to [`NodeStore`], so any engine satisfying the trait can back
//! a node.
//!
//! ## Log File Format (V1)
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Header (6 bytes)                                │
//! │   Magic: "SHRD" (4) | Version: u16 (2)          │
//! ├─────────────────────────────────────────────────┤
//! │ Record (variable)                               │
//! │   [KeyLen: u32][ValLen: u32][CRC: u32][Key][Val]│
//! │   ... appended per upsert, last write wins ...  │
//! └─────────────────────────────────────────────────┘
//! ```

mod log;

use bytes::Bytes;

use crate::error::Result;

pub use log::LogStore;

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes identifying a shardstore node log file
pub(crate) const MAGIC: &[u8; 4] = b"SHRD";

/// Current log format version
pub(crate) const VERSION: u16 = 1;

/// Log header size: Magic (4) + Version (2) = 6 bytes
pub(crate) const LOG_HEADER_SIZE: u64 = 6;

/// Record header size: KeyLen (4) + ValLen (4) + CRC (4) = 12 bytes
pub(crate) const RECORD_HEADER_SIZE: usize = 12;

/// Upper bound on a single record's key or value length. Anything larger in
/// a record header means the log is corrupt, not that someone stored it.
pub(crate) const MAX_RECORD_FIELD: u32 = 128 * 1024 * 1024;

// =============================================================================
// Node Capability Trait
// =============================================================================

/// The narrow per-node storage capability.
///
/// The routing/client layer depends only on this trait, keeping it isolated
/// from any concrete engine. Opening happens once during client
/// construction via the engine's own constructor (see [`LogStore::open`]).
pub trait NodeStore: Send {
    /// Upsert a key-value pair
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetch the value for a key.
    ///
    /// Fails with [`KeyNotFound`](crate::ShardError::KeyNotFound) when the
    /// key was never stored — distinct from any I/O error, and distinct from
    /// a successfully stored empty value.
    fn get(&mut self, key: &[u8]) -> Result<Bytes>;

    /// Durability barrier: flush pending writes to stable storage
    fn commit(&mut self) -> Result<()>;

    /// Release resources. Safe to call once; operations after close fail
    /// with [`Closed`](crate::ShardError::Closed).
    fn close(&mut self) -> Result<()>;
}
