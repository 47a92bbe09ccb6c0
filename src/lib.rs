//! # shardstore
//!
//! A client-side storage layer that shards documents across a fixed set of
//! embedded storage nodes using consistent hashing:
//! - Deterministic key→node routing via a virtual-node hash ring
//! - One independent append-only engine per node, commit as the durability
//!   barrier
//! - Checkpointing of large blobs as fixed-size chunk documents
//! - Process-wide one-instance lifecycle with explicit handles
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ClientRegistry                            │
//! │              (one client per process)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    StorageClient                             │
//! │        write / read / checkpoint / commit / close            │
//! └──────┬──────────────────────────────────────┬───────────────┘
//!        │                                      │
//!        ▼                                      ▼
//! ┌─────────────┐                     ┌──────────────────┐
//! │  HashRing   │                     │  DocumentCodec   │
//! │ (route key) │                     │ (length-prefixed)│
//! └──────┬──────┘                     └──────────────────┘
//!        │
//!        ▼
//! ┌─────────────┬─────────────┬─────────────┬─────────────┐
//! │  NodeStore  │  NodeStore  │  NodeStore  │  NodeStore  │
//! │   node0/    │   node1/    │   node2/    │   node3/    │
//! └─────────────┴─────────────┴─────────────┴─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod ring;
pub mod document;
pub mod store;
pub mod client;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, ShardError};
pub use config::Config;
pub use ring::HashRing;
pub use document::Document;
pub use store::{LogStore, NodeStore};
pub use client::StorageClient;
pub use registry::ClientRegistry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of shardstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
