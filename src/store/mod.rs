//! Store Module
//!
//! The collaborator interfaces the client talks to, plus in-process
//! implementations of them.
//!
//! ## Responsibilities
//! - `KeyVersionStore`: key → versioned pointer (timestamp, store URI, reference)
//! - `ContentStore`: reference → immutable payload bytes
//! - `StoreConnector`: produce both handles from a `Config` at init time
//!
//! ## Backends
//! ```text
//!                 ┌──────────────────────┐
//!                 │     ContentStore     │
//!                 └──────────┬───────────┘
//!            ┌───────────────┴───────────────┐
//!            ▼                               ▼
//!   ┌─────────────────┐            ┌───────────────────┐
//!   │ MemoryBlobStore │            │ BlockContentStore │
//!   │  (one blob per  │            │ (chunks + manifest│
//!   │   reference)    │            │  over BlockStore) │
//!   └─────────────────┘            └─────────┬─────────┘
//!                                            ▼
//!                                  ┌───────────────────┐
//!                                  │ MemoryBlockStore  │
//!                                  │ (CRC32 per block) │
//!                                  └───────────────────┘
//! ```
//!
//! The client never branches on which backend is behind the trait.

mod block;
mod connector;
mod memory;

use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::error::Result;

pub use block::{BlockContentStore, BlockId, BlockStore, MemoryBlockStore};
pub use connector::{InProcessConnector, StoreConnector, StoreHandles};
pub use memory::{MemoryBlobStore, MemoryKeyValueStore};

/// Nanosecond timestamp used to version writes
pub type Timestamp = i64;

/// Opaque handle to a payload held by a `ContentStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentReference(pub u64);

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref:{}", self.0)
    }
}

/// Namespace identifier partitioning tenants of the same store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreUri(String);

impl StoreUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One version of a key: which payload it pointed at, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVersionEntry {
    pub key: String,
    pub timestamp: Timestamp,
    pub store_uri: StoreUri,
    pub reference: ContentReference,
}

/// Versioned key → reference mapping
pub trait KeyVersionStore: Send + Sync {
    /// Entry with the greatest timestamp in `[ts_low, ts_high]`
    ///
    /// Returns `XanaduError::NotFound` when the key has no version in range.
    fn lookup_before(&self, key: &str, ts_low: Timestamp, ts_high: Timestamp) -> Result<KeyVersionEntry>;

    /// Register a new version of `key`
    fn set_value(
        &self,
        key: &str,
        timestamp: Timestamp,
        store_uri: &StoreUri,
        reference: ContentReference,
    ) -> Result<()>;

    /// Release the handle
    fn close(&self) -> Result<()>;
}

/// Immutable payload storage
pub trait ContentStore: Send + Sync {
    /// Persist a payload and return a fresh reference to it
    fn store(&self, payload: &[u8]) -> Result<ContentReference>;

    /// Persist a payload of declared length streamed from `reader`
    ///
    /// Stores that chunk their payloads override this to avoid buffering the
    /// whole payload first.
    fn store_sized(&self, len: usize, reader: &mut dyn Read) -> Result<ContentReference> {
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        self.store(&payload)
    }

    /// Read a payload back verbatim
    ///
    /// Returns `XanaduError::NotFound` for unknown references.
    fn read(&self, reference: ContentReference) -> Result<Bytes>;

    /// Release the handle
    fn close(&self) -> Result<()>;
}
