//! In-process key-version and blob stores
//!
//! Each store splits into shared data (behind an `Arc`) and a per-handle
//! open/closed flag, so several clients in one process can hold their own
//! handles onto the same data.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, XanaduError};

use super::{ContentReference, ContentStore, KeyVersionEntry, KeyVersionStore, StoreUri, Timestamp};

/// Versions of one key, ordered by timestamp
type VersionMap = BTreeMap<Timestamp, KeyVersionEntry>;

// =============================================================================
// Key-Version Store
// =============================================================================

/// In-memory `KeyVersionStore`
///
/// ## Concurrency:
/// - `versions`: RwLock over key → versions (many readers, one writer)
/// - Same timestamp for the same key: the later `set_value` replaces the entry
pub struct MemoryKeyValueStore {
    versions: Arc<RwLock<HashMap<String, VersionMap>>>,
    closed: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            versions: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    /// A fresh, open handle onto the same data
    pub fn reopen(&self) -> Self {
        Self {
            versions: Arc::clone(&self.versions),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of keys with at least one version
    pub fn key_count(&self) -> usize {
        self.versions.read().len()
    }

    /// Number of versions recorded for `key`
    pub fn version_count(&self, key: &str) -> usize {
        self.versions.read().get(key).map_or(0, BTreeMap::len)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(XanaduError::Store("key-value store handle is closed".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyVersionStore for MemoryKeyValueStore {
    fn lookup_before(&self, key: &str, ts_low: Timestamp, ts_high: Timestamp) -> Result<KeyVersionEntry> {
        self.ensure_open()?;

        if ts_low > ts_high {
            return Err(XanaduError::NotFound);
        }

        let versions = self.versions.read();
        versions
            .get(key)
            .and_then(|entries| entries.range(ts_low..=ts_high).next_back())
            .map(|(_, entry)| entry.clone())
            .ok_or(XanaduError::NotFound)
    }

    fn set_value(
        &self,
        key: &str,
        timestamp: Timestamp,
        store_uri: &StoreUri,
        reference: ContentReference,
    ) -> Result<()> {
        self.ensure_open()?;

        let entry = KeyVersionEntry {
            key: key.to_string(),
            timestamp,
            store_uri: store_uri.clone(),
            reference,
        };

        self.versions
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(timestamp, entry);

        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// =============================================================================
// Blob Store
// =============================================================================

struct BlobShared {
    blobs: RwLock<HashMap<u64, Bytes>>,
    next_reference: AtomicU64,
}

/// In-memory `ContentStore` keeping each payload as one blob
pub struct MemoryBlobStore {
    shared: Arc<BlobShared>,
    closed: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BlobShared {
                blobs: RwLock::new(HashMap::new()),
                next_reference: AtomicU64::new(1),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// A fresh, open handle onto the same blobs
    pub fn reopen(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored blobs (orphans included)
    pub fn blob_count(&self) -> usize {
        self.shared.blobs.read().len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(XanaduError::Store("blob store handle is closed".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryBlobStore {
    fn store(&self, payload: &[u8]) -> Result<ContentReference> {
        self.ensure_open()?;

        let id = self.shared.next_reference.fetch_add(1, Ordering::Relaxed);
        self.shared
            .blobs
            .write()
            .insert(id, Bytes::copy_from_slice(payload));

        Ok(ContentReference(id))
    }

    fn read(&self, reference: ContentReference) -> Result<Bytes> {
        self.ensure_open()?;

        self.shared
            .blobs
            .read()
            .get(&reference.0)
            .cloned()
            .ok_or(XanaduError::NotFound)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
