//! In-process Store Tests
//!
//! These tests verify:
//! - Key-version lookups pick the newest entry in range
//! - Blob store round-trips and reference uniqueness
//! - Closed handles reject calls; reopened handles share data
//! - Connector hands out handles for the configured backend
//! - Concurrent writers on different keys

use std::sync::Arc;
use std::thread;

use xanadu_ycsb::config::{Backend, Config};
use xanadu_ycsb::store::{
    ContentReference, ContentStore, InProcessConnector, KeyVersionStore, MemoryBlobStore,
    MemoryKeyValueStore, StoreConnector, StoreUri, Timestamp,
};
use xanadu_ycsb::XanaduError;

// =============================================================================
// Helper Functions
// =============================================================================

fn uri() -> StoreUri {
    StoreUri::new("YCSB")
}

fn test_config(backend: Backend) -> Config {
    Config::builder()
        .registry("localhost", 4242)
        .backend(backend)
        .block_size(8)
        .build()
}

// =============================================================================
// Key-Version Store Tests
// =============================================================================

#[test]
fn test_lookup_missing_key_not_found() {
    let store = MemoryKeyValueStore::new();

    assert!(matches!(
        store.lookup_before("nope", 0, Timestamp::MAX),
        Err(XanaduError::NotFound)
    ));
}

#[test]
fn test_lookup_returns_newest_version() {
    let store = MemoryKeyValueStore::new();

    store.set_value("k", 100, &uri(), ContentReference(1)).unwrap();
    store.set_value("k", 300, &uri(), ContentReference(3)).unwrap();
    store.set_value("k", 200, &uri(), ContentReference(2)).unwrap();

    let entry = store.lookup_before("k", 0, Timestamp::MAX).unwrap();
    assert_eq!(entry.timestamp, 300);
    assert_eq!(entry.reference, ContentReference(3));
    assert_eq!(entry.key, "k");
    assert_eq!(entry.store_uri, uri());
}

#[test]
fn test_lookup_respects_bounds() {
    let store = MemoryKeyValueStore::new();

    store.set_value("k", 100, &uri(), ContentReference(1)).unwrap();
    store.set_value("k", 200, &uri(), ContentReference(2)).unwrap();
    store.set_value("k", 300, &uri(), ContentReference(3)).unwrap();

    assert_eq!(store.lookup_before("k", 0, 250).unwrap().timestamp, 200);
    assert_eq!(store.lookup_before("k", 0, 200).unwrap().timestamp, 200);
    assert_eq!(store.lookup_before("k", 150, 199).ok(), None);
    assert_eq!(store.lookup_before("k", 301, Timestamp::MAX).ok(), None);
    assert_eq!(store.lookup_before("k", 300, 100).ok(), None);
}

#[test]
fn test_same_timestamp_last_writer_wins() {
    let store = MemoryKeyValueStore::new();

    store.set_value("k", 5, &uri(), ContentReference(1)).unwrap();
    store.set_value("k", 5, &uri(), ContentReference(2)).unwrap();

    assert_eq!(store.version_count("k"), 1);
    assert_eq!(
        store.lookup_before("k", 0, Timestamp::MAX).unwrap().reference,
        ContentReference(2)
    );
}

#[test]
fn test_keys_are_independent() {
    let store = MemoryKeyValueStore::new();

    store.set_value("a", 1, &uri(), ContentReference(10)).unwrap();
    store.set_value("b", 2, &uri(), ContentReference(20)).unwrap();

    assert_eq!(store.key_count(), 2);
    assert_eq!(
        store.lookup_before("a", 0, Timestamp::MAX).unwrap().reference,
        ContentReference(10)
    );
}

#[test]
fn test_closed_key_value_handle_rejects_calls() {
    let store = MemoryKeyValueStore::new();
    store.set_value("k", 1, &uri(), ContentReference(1)).unwrap();
    store.close().unwrap();

    assert!(matches!(
        store.lookup_before("k", 0, Timestamp::MAX),
        Err(XanaduError::Store(_))
    ));
    assert!(matches!(
        store.set_value("k", 2, &uri(), ContentReference(2)),
        Err(XanaduError::Store(_))
    ));

    // A reopened handle still sees the data
    let reopened = store.reopen();
    assert_eq!(reopened.lookup_before("k", 0, Timestamp::MAX).unwrap().timestamp, 1);
}

#[test]
fn test_concurrent_writers_different_keys() {
    let store = Arc::new(MemoryKeyValueStore::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("t{}-k{}", t, i);
                    store.set_value(&key, i, &uri(), ContentReference(i as u64)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.key_count(), 800);
}

// =============================================================================
// Blob Store Tests
// =============================================================================

#[test]
fn test_blob_store_round_trip() {
    let store = MemoryBlobStore::new();

    let reference = store.store(b"payload").unwrap();
    assert_eq!(&store.read(reference).unwrap()[..], b"payload");
}

#[test]
fn test_blob_store_references_unique() {
    let store = MemoryBlobStore::new();

    let first = store.store(b"same").unwrap();
    let second = store.store(b"same").unwrap();

    assert_ne!(first, second);
    assert_eq!(store.blob_count(), 2);
}

#[test]
fn test_blob_store_unknown_reference() {
    let store = MemoryBlobStore::new();
    assert!(matches!(store.read(ContentReference(999)), Err(XanaduError::NotFound)));
}

#[test]
fn test_blob_store_does_not_mutate_other_payloads() {
    let store = MemoryBlobStore::new();

    let first = store.store(b"one").unwrap();
    store.store(b"two").unwrap();

    assert_eq!(&store.read(first).unwrap()[..], b"one");
}

#[test]
fn test_blob_store_sized_default_impl() {
    let store = MemoryBlobStore::new();
    let data = b"streamed payload";

    let reference = store.store_sized(data.len(), &mut &data[..]).unwrap();
    assert_eq!(&store.read(reference).unwrap()[..], data);
}

#[test]
fn test_blob_store_sized_short_reader_is_io_error() {
    let store = MemoryBlobStore::new();
    let data = b"short";

    assert!(matches!(
        store.store_sized(100, &mut &data[..]),
        Err(XanaduError::Io(_))
    ));
    assert_eq!(store.blob_count(), 0);
}

#[test]
fn test_closed_blob_handle_rejects_calls() {
    let store = MemoryBlobStore::new();
    let reference = store.store(b"x").unwrap();
    let other = store.reopen();
    store.close().unwrap();

    assert!(matches!(store.store(b"y"), Err(XanaduError::Store(_))));
    assert!(matches!(store.read(reference), Err(XanaduError::Store(_))));
    assert_eq!(&other.read(reference).unwrap()[..], b"x");
}

// =============================================================================
// Connector Tests
// =============================================================================

#[test]
fn test_connector_plain_backend_uses_blob_store() {
    let connector = InProcessConnector::new();
    let handles = connector.connect(&test_config(Backend::Plain)).unwrap();

    handles.content.store(b"hello").unwrap();

    assert_eq!(connector.blobs().blob_count(), 1);
    assert_eq!(connector.blocks().block_count(), 0);
}

#[test]
fn test_connector_block_backend_uses_block_store() {
    let connector = InProcessConnector::new();
    let handles = connector.connect(&test_config(Backend::Block)).unwrap();

    // 20 bytes / 8-byte blocks = 3 chunks + 1 manifest
    let reference = handles.content.store(&[7u8; 20]).unwrap();

    assert_eq!(connector.blobs().blob_count(), 0);
    assert_eq!(connector.blocks().block_count(), 4);
    assert_eq!(&handles.content.read(reference).unwrap()[..], &[7u8; 20][..]);
}

#[test]
fn test_connector_handles_share_data() {
    let connector = InProcessConnector::new();
    let first = connector.connect(&test_config(Backend::Plain)).unwrap();
    let second = connector.connect(&test_config(Backend::Plain)).unwrap();

    let reference = first.content.store(b"shared").unwrap();
    first.key_versions.set_value("k", 1, &uri(), reference).unwrap();

    let entry = second.key_versions.lookup_before("k", 0, Timestamp::MAX).unwrap();
    assert_eq!(&second.content.read(entry.reference).unwrap()[..], b"shared");

    // Closing one handle pair leaves the other usable
    first.key_versions.close().unwrap();
    first.content.close().unwrap();
    assert!(second.key_versions.lookup_before("k", 0, Timestamp::MAX).is_ok());
}

#[test]
fn test_connector_rejects_invalid_config() {
    let connector = InProcessConnector::new();
    let result = connector.connect(&Config::default());

    assert!(matches!(result, Err(XanaduError::Config(_))));
}
