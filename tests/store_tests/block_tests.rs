//! Block Store Tests
//!
//! These tests verify:
//! - Chunked payloads round-trip at, below, and across block boundaries
//! - Streamed (declared-length) stores match buffered stores
//! - Checksums detect corruption and fall back to healthy replicas
//! - Bad references are rejected

use xanadu_ycsb::store::{
    BlockContentStore, BlockStore, ContentReference, ContentStore, MemoryBlockStore,
};
use xanadu_ycsb::XanaduError;

// =============================================================================
// Helper Functions
// =============================================================================

const BLOCK_SIZE: usize = 16;

fn setup_store(replicas: usize, verify: bool) -> BlockContentStore<MemoryBlockStore> {
    BlockContentStore::new(MemoryBlockStore::new(replicas, verify), BLOCK_SIZE)
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_round_trip_various_sizes() {
    let store = setup_store(1, true);

    for len in [0, 1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, BLOCK_SIZE * 5 + 3] {
        let data = payload(len);
        let reference = store.store(&data).unwrap();
        let read = store.read(reference).unwrap();

        assert_eq!(read.len(), len, "length mismatch for {} bytes", len);
        assert_eq!(&read[..], data.as_slice());
    }
}

#[test]
fn test_chunk_count_matches_block_size() {
    let store = setup_store(1, true);

    let reference = store.store(&payload(BLOCK_SIZE * 3 + 1)).unwrap();
    assert_eq!(store.payload_blocks(reference).unwrap().len(), 4);

    let empty = store.store(&[]).unwrap();
    assert!(store.payload_blocks(empty).unwrap().is_empty());
}

#[test]
fn test_store_sized_matches_store() {
    let store = setup_store(1, true);
    let data = payload(BLOCK_SIZE * 2 + 7);

    let streamed = store.store_sized(data.len(), &mut data.as_slice()).unwrap();
    let buffered = store.store(&data).unwrap();

    assert_eq!(store.read(streamed).unwrap(), store.read(buffered).unwrap());
    assert_eq!(
        store.payload_blocks(streamed).unwrap().len(),
        store.payload_blocks(buffered).unwrap().len()
    );
}

#[test]
fn test_store_sized_short_reader_is_io_error() {
    let store = setup_store(1, true);
    let data = payload(4);

    assert!(matches!(
        store.store_sized(BLOCK_SIZE * 2, &mut data.as_slice()),
        Err(XanaduError::Io(_))
    ));
}

#[test]
fn test_distinct_references_for_identical_payloads() {
    let store = setup_store(1, true);

    let first = store.store(b"same").unwrap();
    let second = store.store(b"same").unwrap();

    assert_ne!(first, second);
}

// =============================================================================
// Checksum & Replica Tests
// =============================================================================

#[test]
fn test_corrupt_replica_falls_back_to_healthy_copy() {
    let store = setup_store(2, true);
    let data = payload(BLOCK_SIZE * 2);

    let reference = store.store(&data).unwrap();
    let first_chunk = store.payload_blocks(reference).unwrap()[0];
    assert!(store.block_store().corrupt_replica(first_chunk, 0));

    assert_eq!(&store.read(reference).unwrap()[..], data.as_slice());
}

#[test]
fn test_all_replicas_corrupt_is_store_error() {
    let store = setup_store(2, true);
    let reference = store.store(&payload(BLOCK_SIZE)).unwrap();
    let chunk = store.payload_blocks(reference).unwrap()[0];

    assert!(store.block_store().corrupt_replica(chunk, 0));
    assert!(store.block_store().corrupt_replica(chunk, 1));

    assert!(matches!(store.read(reference), Err(XanaduError::Store(_))));
}

#[test]
fn test_checksum_disabled_returns_corrupt_data() {
    let store = setup_store(1, false);
    let data = payload(BLOCK_SIZE);
    let reference = store.store(&data).unwrap();
    let chunk = store.payload_blocks(reference).unwrap()[0];

    assert!(store.block_store().corrupt_replica(chunk, 0));

    let read = store.read(reference).unwrap();
    assert_ne!(&read[..], data.as_slice());
    assert_eq!(read[0], data[0] ^ 0xFF);
}

#[test]
fn test_corrupt_replica_out_of_range() {
    let blocks = MemoryBlockStore::new(1, true);
    let id = blocks.store_block(b"abc").unwrap();

    assert!(!blocks.corrupt_replica(id, 5));
    assert!(!blocks.corrupt_replica(id + 100, 0));
}

#[test]
fn test_replica_count_floor_is_one() {
    let blocks = MemoryBlockStore::new(0, true);
    assert_eq!(blocks.replicas(), 1);
}

// =============================================================================
// Bad Reference Tests
// =============================================================================

#[test]
fn test_unknown_reference_not_found() {
    let store = setup_store(1, true);
    assert!(matches!(
        store.read(ContentReference(12345)),
        Err(XanaduError::NotFound)
    ));
}

#[test]
fn test_chunk_reference_is_not_a_manifest() {
    let store = setup_store(1, true);
    let reference = store.store(&[0xAB; BLOCK_SIZE]).unwrap();
    let chunk = store.payload_blocks(reference).unwrap()[0];

    assert!(matches!(
        store.read(ContentReference(chunk)),
        Err(XanaduError::Store(_))
    ));
}

#[test]
fn test_closed_store_rejects_calls() {
    let store = setup_store(1, true);
    let reference = store.store(b"data").unwrap();
    store.close().unwrap();

    assert!(matches!(store.store(b"more"), Err(XanaduError::Store(_))));
    assert!(matches!(store.read(reference), Err(XanaduError::Store(_))));
}
