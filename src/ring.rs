//! Hash Ring Module
//!
//! Consistent-hashing ring mapping arbitrary keys to node indices.
//!
//! ## Responsibilities
//! - Seed `node_count * virtual_replicas` positions deterministically
//! - Route a key to the node owning its clockwise successor position
//! - Stay stable across process restarts (pure function of ring contents)
//!
//! ## Position Space
//! Positions live in the 32-bit CRC space. Both virtual-node tokens and keys
//! are hashed with CRC32, which is deterministic across processes, platforms,
//! and compiler versions — routing never depends on addresses, time, or a
//! randomly seeded hasher.
//!
//! ```text
//!        0 ──────────► u32::MAX (wraps)
//!   ┌────┴────┬─────────┬──────────┬───────┐
//!   │ vn(1,0) │ vn(0,2) │ vn(3,1)  │  ...  │
//!   └─────────┴─────────┴──────────┴───────┘
//!        route(key) = first position ≥ crc32(key)
//! ```

use std::collections::BTreeMap;

use crate::error::{Result, ShardError};

/// Consistent-hashing ring over a set of node indices
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring position → owning node index, kept sorted by position
    positions: BTreeMap<u32, u32>,

    /// Number of physical nodes on the ring
    node_count: u32,

    /// Ring positions seeded per node
    virtual_replicas: u32,
}

impl HashRing {
    /// Build a ring over `node_count` nodes with `virtual_replicas` positions
    /// each.
    ///
    /// Seeding is fully deterministic: node indices are added in ascending
    /// order and each virtual node hashes a fixed `node<i>-vn<r>` token, so
    /// an identical configuration always yields an identical ring.
    pub fn build(node_count: u32, virtual_replicas: u32) -> Result<Self> {
        if node_count == 0 {
            return Err(ShardError::InvalidTopology(0));
        }

        let mut ring = Self {
            positions: BTreeMap::new(),
            node_count: 0,
            virtual_replicas,
        };

        for index in 0..node_count {
            ring.add_node(index);
        }

        Ok(ring)
    }

    /// Add a node's virtual replicas to the ring.
    ///
    /// Remaps, in expectation, O(1/N) of the key space — the keys whose
    /// clockwise successor becomes one of the new positions. This is an
    /// expectation, not a guarantee of an exact fraction; actual movement
    /// depends on where the new positions land.
    pub fn add_node(&mut self, index: u32) {
        for replica in 0..self.virtual_replicas {
            let token = vnode_token(index, replica);
            // Position collisions are possible in a 32-bit space; last writer
            // wins, and the fixed insertion order keeps the outcome stable.
            self.positions.insert(position(&token), index);
        }
        self.node_count += 1;
    }

    /// Route a key to its owning node index.
    ///
    /// Hashes the key into the position space and walks clockwise to the
    /// first position ≥ the hash, wrapping around at the space boundary.
    /// Pure: identical key and ring contents always produce the same index.
    pub fn route(&self, key: &[u8]) -> Result<u32> {
        if self.positions.is_empty() {
            return Err(ShardError::EmptyRing);
        }

        let hash = position(key);

        let owner = self
            .positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, &index)| index);

        match owner {
            Some(index) => Ok(index),
            None => Err(ShardError::EmptyRing),
        }
    }

    /// Number of physical nodes on the ring
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Number of seeded ring positions
    ///
    /// Usually `node_count * virtual_replicas`; fewer only if virtual-node
    /// positions collided.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// The virtual-node replication factor this ring was built with
    pub fn virtual_replicas(&self) -> u32 {
        self.virtual_replicas
    }
}

/// Hash arbitrary bytes into the ring position space
fn position(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Token hashed to place virtual node `replica` of node `index`
fn vnode_token(index: u32, replica: u32) -> Vec<u8> {
    format!("node{index}-vn{replica}").into_bytes()
}
