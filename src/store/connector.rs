//! Store connections
//!
//! A `StoreConnector` turns a `Config` into the pair of handles a client
//! needs. The client asks for them once at `init` and closes them once at
//! `cleanup`.

use std::sync::Arc;

use crate::config::{Backend, Config};
use crate::error::Result;

use super::{
    BlockContentStore, ContentStore, KeyVersionStore, MemoryBlobStore, MemoryBlockStore,
    MemoryKeyValueStore,
};

/// The two handles a client operates on
#[derive(Clone)]
pub struct StoreHandles {
    pub key_versions: Arc<dyn KeyVersionStore>,
    pub content: Arc<dyn ContentStore>,
}

/// Opens store handles for a configuration
pub trait StoreConnector: Send + Sync {
    fn connect(&self, config: &Config) -> Result<StoreHandles>;
}

/// Connector over in-process stores
///
/// Every `connect` returns new handles onto the same underlying data, so
/// all clients sharing one connector see each other's writes. The backend
/// chosen in the config decides whether payloads go to the blob store or
/// through the block store.
pub struct InProcessConnector {
    key_values: MemoryKeyValueStore,
    blobs: MemoryBlobStore,
    blocks: MemoryBlockStore,
}

impl InProcessConnector {
    pub fn new() -> Self {
        Self {
            key_values: MemoryKeyValueStore::new(),
            blobs: MemoryBlobStore::new(),
            blocks: MemoryBlockStore::new(crate::config::DEFAULT_REPLICAS, true),
        }
    }

    /// Shared key-version data (for inspection)
    pub fn key_values(&self) -> &MemoryKeyValueStore {
        &self.key_values
    }

    /// Shared blob data (for inspection)
    pub fn blobs(&self) -> &MemoryBlobStore {
        &self.blobs
    }

    /// Shared block data (for inspection and fault injection)
    pub fn blocks(&self) -> &MemoryBlockStore {
        &self.blocks
    }
}

impl Default for InProcessConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConnector for InProcessConnector {
    fn connect(&self, config: &Config) -> Result<StoreHandles> {
        config.validate()?;

        let key_versions: Arc<dyn KeyVersionStore> = Arc::new(self.key_values.reopen());

        let content: Arc<dyn ContentStore> = match config.backend {
            Backend::Plain => Arc::new(self.blobs.reopen()),
            Backend::Block => {
                let blocks = self
                    .blocks
                    .reopen()
                    .with_replicas(config.replicas)
                    .with_checksum(config.use_checksum);
                Arc::new(BlockContentStore::new(blocks, config.block_size))
            }
        };

        tracing::debug!(
            backend = %config.backend,
            registries = config.registries.len(),
            replicas = config.replicas,
            lookup_limit = config.lookup_limit,
            "Opened in-process store handles"
        );

        Ok(StoreHandles { key_versions, content })
    }
}
