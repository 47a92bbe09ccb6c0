//! Error types for shardstore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ShardError
pub type Result<T> = std::result::Result<T, ShardError>;

/// Unified error type for shardstore operations
#[derive(Debug, Error)]
pub enum ShardError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-level failure on a specific node, carrying the node index so a
    /// hot or unreachable shard can be diagnosed.
    #[error("node {node} IO error: {source}")]
    NodeIo {
        node: u32,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Topology Errors
    // -------------------------------------------------------------------------
    #[error("invalid topology: {0} nodes")]
    InvalidTopology(u32),

    #[error("hash ring has no positions")]
    EmptyRing,

    /// A node engine failed to open during client construction. Fatal for the
    /// whole client; no partial topology is left usable.
    #[error("node {node} failed to open: {source}")]
    PartialTopology {
        node: u32,
        #[source]
        source: Box<ShardError>,
    },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("storage client already initialized")]
    AlreadyInitialized,

    #[error("storage client is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Document Errors
    // -------------------------------------------------------------------------
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("corrupt document: {0}")]
    CorruptDocument(String),

    // -------------------------------------------------------------------------
    // Checkpoint Errors
    // -------------------------------------------------------------------------
    /// Reports the first chunk that failed to persist. Chunks before it are
    /// already durable; callers deciding to retry resume from `chunk`.
    #[error("checkpoint {uri} failed at chunk {chunk}: {source}")]
    Checkpoint {
        uri: String,
        chunk: u64,
        #[source]
        source: Box<ShardError>,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}
