//! Block-backed content store
//!
//! Payloads are split into `block_size` chunks, each stored as its own
//! block, followed by a manifest block listing them. The manifest's block id
//! is the content reference handed back to the client.
//!
//! ## Manifest Block (bincode)
//! ```text
//! ┌───────────┬────────────┬──────────────────────────────┐
//! │ Magic (4) │ Length (8) │ Block ids (len-prefixed u64s)│
//! └───────────┴────────────┴──────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XanaduError};

use super::{ContentReference, ContentStore};

/// Identifier of a single stored block
pub type BlockId = u64;

/// Magic number marking a manifest block ("XAN1")
const MANIFEST_MAGIC: u32 = 0x5841_4E31;

/// Storage for fixed-size opaque blocks
pub trait BlockStore: Send + Sync {
    fn store_block(&self, data: &[u8]) -> Result<BlockId>;

    fn read_block(&self, id: BlockId) -> Result<Bytes>;

    fn close(&self) -> Result<()>;
}

// =============================================================================
// Memory Block Store
// =============================================================================

/// One replica of a block, with the checksum taken at write time
struct StoredBlock {
    data: Bytes,
    crc: u32,
}

struct BlockShared {
    blocks: RwLock<HashMap<BlockId, Vec<StoredBlock>>>,
    next_id: AtomicU64,
}

/// In-memory `BlockStore` keeping `replicas` checksummed copies per block
///
/// Reads return the first replica whose CRC32 still matches; with checksums
/// disabled the first replica is returned as-is.
pub struct MemoryBlockStore {
    shared: Arc<BlockShared>,
    replicas: usize,
    verify_checksum: bool,
    closed: AtomicBool,
}

impl MemoryBlockStore {
    pub fn new(replicas: usize, verify_checksum: bool) -> Self {
        Self {
            shared: Arc::new(BlockShared {
                blocks: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            replicas: replicas.max(1),
            verify_checksum,
            closed: AtomicBool::new(false),
        }
    }

    /// A fresh, open handle onto the same blocks
    pub fn reopen(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            replicas: self.replicas,
            verify_checksum: self.verify_checksum,
            closed: AtomicBool::new(false),
        }
    }

    /// Set how many copies new blocks get
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas.max(1);
        self
    }

    /// Enable or disable checksum verification on read
    pub fn with_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Number of stored blocks (manifests included)
    pub fn block_count(&self) -> usize {
        self.shared.blocks.read().len()
    }

    /// Flip the bits of one replica's first byte without fixing its checksum
    ///
    /// Fault injection for tests. Returns false if the block, the replica,
    /// or any data to flip is missing.
    pub fn corrupt_replica(&self, id: BlockId, replica: usize) -> bool {
        let mut blocks = self.shared.blocks.write();
        let Some(stored) = blocks.get_mut(&id).and_then(|copies| copies.get_mut(replica)) else {
            return false;
        };
        if stored.data.is_empty() {
            return false;
        }

        let mut data = stored.data.to_vec();
        data[0] ^= 0xFF;
        stored.data = Bytes::from(data);
        true
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(XanaduError::Store("block store handle is closed".to_string()));
        }
        Ok(())
    }
}

impl BlockStore for MemoryBlockStore {
    fn store_block(&self, data: &[u8]) -> Result<BlockId> {
        self.ensure_open()?;

        let crc = crc32fast::hash(data);
        let data = Bytes::copy_from_slice(data);
        let copies = (0..self.replicas)
            .map(|_| StoredBlock {
                data: data.clone(),
                crc,
            })
            .collect();

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.blocks.write().insert(id, copies);

        Ok(id)
    }

    fn read_block(&self, id: BlockId) -> Result<Bytes> {
        self.ensure_open()?;

        let blocks = self.shared.blocks.read();
        let copies = blocks.get(&id).ok_or(XanaduError::NotFound)?;

        if !self.verify_checksum {
            return copies
                .first()
                .map(|stored| stored.data.clone())
                .ok_or(XanaduError::NotFound);
        }

        for (replica, stored) in copies.iter().enumerate() {
            if crc32fast::hash(&stored.data) == stored.crc {
                return Ok(stored.data.clone());
            }
            tracing::warn!(block = id, replica, "Block checksum mismatch, trying next replica");
        }

        Err(XanaduError::Store(format!(
            "block {}: checksum mismatch on all {} replicas",
            id,
            copies.len()
        )))
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// =============================================================================
// Block Content Store
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct BlockManifest {
    magic: u32,
    length: u64,
    blocks: Vec<BlockId>,
}

/// `ContentStore` that chunks payloads over a `BlockStore`
pub struct BlockContentStore<B: BlockStore> {
    blocks: B,
    block_size: usize,
}

impl<B: BlockStore> BlockContentStore<B> {
    pub fn new(blocks: B, block_size: usize) -> Self {
        Self {
            blocks,
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The underlying block store
    pub fn block_store(&self) -> &B {
        &self.blocks
    }

    /// Block ids holding the payload behind `reference`, in order
    pub fn payload_blocks(&self, reference: ContentReference) -> Result<Vec<BlockId>> {
        Ok(self.load_manifest(reference)?.blocks)
    }

    /// Write the manifest for already-stored chunks
    fn finish(&self, length: usize, blocks: Vec<BlockId>) -> Result<ContentReference> {
        let chunk_count = blocks.len();
        let manifest = BlockManifest {
            magic: MANIFEST_MAGIC,
            length: length as u64,
            blocks,
        };
        let encoded = bincode::serialize(&manifest)?;
        let id = self.blocks.store_block(&encoded)?;

        tracing::trace!(reference = id, length, chunk_count, "Stored chunked payload");
        Ok(ContentReference(id))
    }

    fn load_manifest(&self, reference: ContentReference) -> Result<BlockManifest> {
        let raw = self.blocks.read_block(reference.0)?;

        let manifest: BlockManifest = bincode::deserialize(&raw).map_err(|e| {
            XanaduError::Store(format!("{} is not a payload manifest: {}", reference, e))
        })?;
        if manifest.magic != MANIFEST_MAGIC {
            return Err(XanaduError::Store(format!(
                "{} is not a payload manifest: bad magic 0x{:08x}",
                reference, manifest.magic
            )));
        }

        Ok(manifest)
    }
}

impl<B: BlockStore> ContentStore for BlockContentStore<B> {
    fn store(&self, payload: &[u8]) -> Result<ContentReference> {
        let blocks = payload
            .chunks(self.block_size)
            .map(|chunk| self.blocks.store_block(chunk))
            .collect::<Result<Vec<_>>>()?;

        self.finish(payload.len(), blocks)
    }

    fn store_sized(&self, len: usize, reader: &mut dyn Read) -> Result<ContentReference> {
        let mut blocks = Vec::with_capacity(len.div_ceil(self.block_size));
        let mut chunk = vec![0u8; self.block_size.min(len)];
        let mut remaining = len;

        while remaining > 0 {
            let n = remaining.min(self.block_size);
            reader.read_exact(&mut chunk[..n])?;
            blocks.push(self.blocks.store_block(&chunk[..n])?);
            remaining -= n;
        }

        self.finish(len, blocks)
    }

    fn read(&self, reference: ContentReference) -> Result<Bytes> {
        let manifest = self.load_manifest(reference)?;

        let mut payload = BytesMut::with_capacity(manifest.length as usize);
        for id in &manifest.blocks {
            payload.put(self.blocks.read_block(*id)?);
        }

        if payload.len() as u64 != manifest.length {
            return Err(XanaduError::Store(format!(
                "{}: reassembled {} bytes, manifest declares {}",
                reference,
                payload.len(),
                manifest.length
            )));
        }

        Ok(payload.freeze())
    }

    fn close(&self) -> Result<()> {
        self.blocks.close()
    }
}
