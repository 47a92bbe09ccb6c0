//! Configuration for shardstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a [`StorageClient`](crate::StorageClient)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all node storage.
    /// Internal structure:
    ///   {base_dir}/
    ///     └── {topology}/
    ///         ├── node0/data.log
    ///         ├── node1/data.log
    ///         └── ...
    pub base_dir: PathBuf,

    /// Topology name, used as the subdirectory grouping all node roots.
    /// Reusing the same base_dir + topology across process restarts reopens
    /// the same shards.
    pub topology: String,

    // -------------------------------------------------------------------------
    // Ring Configuration
    // -------------------------------------------------------------------------
    /// Number of storage nodes to shard across
    pub node_count: u32,

    /// Virtual-node replication factor: ring positions seeded per node.
    /// Higher values smooth the key distribution across nodes.
    pub virtual_replicas: u32,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Commit the target node synchronously after every write.
    /// Trades throughput for not having to batch; turn off and call
    /// `commit()` manually for bulk loads.
    pub autocommit: bool,

    /// Checkpoint chunk size in bytes
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./shardstore_data"),
            topology: "primary".to_string(),
            node_count: 4,
            virtual_replicas: 32,
            autocommit: true,
            chunk_size: 8192,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory (root for all node storage)
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Set the topology name
    pub fn topology(mut self, name: impl Into<String>) -> Self {
        self.config.topology = name.into();
        self
    }

    /// Set the number of storage nodes
    pub fn node_count(mut self, count: u32) -> Self {
        self.config.node_count = count;
        self
    }

    /// Set the virtual-node replication factor
    pub fn virtual_replicas(mut self, count: u32) -> Self {
        self.config.virtual_replicas = count;
        self
    }

    /// Enable or disable commit-per-write
    pub fn autocommit(mut self, enabled: bool) -> Self {
        self.config.autocommit = enabled;
        self
    }

    /// Set the checkpoint chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
