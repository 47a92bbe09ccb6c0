//! Client Registry Module
//!
//! Process-wide one-instance lifecycle for the storage client.
//!
//! Exactly one [`StorageClient`] exists per process: node engines hold open
//! file handles that are not safely duplicated, so a second instance over
//! the same topology is rejected outright rather than tolerated. The first
//! access constructs the client (lazily, with the default 4-node topology
//! unless an explicit config is supplied) and every later access returns the
//! same `Arc` handle.
//!
//! Collaborators receive the handle explicitly and pass it by reference —
//! the registry is the construction-time check, not a hidden global to reach
//! through from arbitrary call sites.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::client::StorageClient;
use crate::config::Config;
use crate::error::{Result, ShardError};

static CLIENT: OnceLock<Arc<StorageClient>> = OnceLock::new();

/// Serializes first construction so concurrent `get_or_init` callers cannot
/// race each other into an `AlreadyInitialized` failure.
static CONSTRUCTION: Mutex<()> = Mutex::new(());

/// Process-wide registry holding the single [`StorageClient`]
pub struct ClientRegistry;

impl ClientRegistry {
    /// Construct the process-wide client from an explicit config.
    ///
    /// Fails with [`AlreadyInitialized`](ShardError::AlreadyInitialized) if
    /// any client — explicit or lazily defaulted — already exists in this
    /// process. This is a hard invariant, not a convenience default.
    pub fn init(config: Config) -> Result<Arc<StorageClient>> {
        let _guard = CONSTRUCTION.lock();

        if CLIENT.get().is_some() {
            return Err(ShardError::AlreadyInitialized);
        }

        let client = Arc::new(StorageClient::open(config)?);
        // Cannot be occupied: we hold the construction lock
        let _ = CLIENT.set(client.clone());
        Ok(client)
    }

    /// Get the process-wide client, constructing it with [`Config::default`]
    /// on first use.
    pub fn get_or_init() -> Result<Arc<StorageClient>> {
        if let Some(client) = CLIENT.get() {
            return Ok(client.clone());
        }

        let _guard = CONSTRUCTION.lock();

        // Re-check under the lock: another thread may have won the race
        if let Some(client) = CLIENT.get() {
            return Ok(client.clone());
        }

        let client = Arc::new(StorageClient::open(Config::default())?);
        let _ = CLIENT.set(client.clone());
        Ok(client)
    }

    /// Get the process-wide client if one has been constructed
    pub fn get() -> Option<Arc<StorageClient>> {
        CLIENT.get().cloned()
    }
}
