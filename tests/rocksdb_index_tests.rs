use anyhow::Result;
use mintsmith::config::IndexBackend;
use mintsmith::index::AuthenticatedIndex;
use mintsmith::storage::{RocksStorage, StorageVariant};
use mintsmith::traits::{IndexStore, StoreOp};
use mintsmith::types::EMPTY_DIGEST;

#[test]
fn test_rocksdb_write_scan_delete() -> Result<()> {
    println!("\n=== Test: RocksDB Write/Scan/Delete ===\n");

    let temp_dir = tempfile::tempdir()?;
    let storage = RocksStorage::open(temp_dir.path().to_str().unwrap())?;

    storage.write(&[
        StoreOp::Put {
            key: b"b".to_vec(),
            value: b"2".to_vec(),
        },
        StoreOp::Put {
            key: b"a".to_vec(),
            value: b"1".to_vec(),
        },
    ])?;
    assert_eq!(storage.get(b"a")?, Some(b"1".to_vec()));
    assert_eq!(storage.get(b"zz")?, None);

    let entries = storage.scan()?;
    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec())
        ],
        "scan is key ordered"
    );

    storage.write(&[StoreOp::Delete { key: b"a".to_vec() }])?;
    assert_eq!(storage.scan()?.len(), 1);

    println!("✓ RocksDB store behaves\n");
    Ok(())
}

#[test]
fn test_index_digest_survives_reopen() -> Result<()> {
    println!("\n=== Test: Index Digest Survives Reopen ===\n");

    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("index_db");
    let path = path.to_str().unwrap();

    let digest = {
        let store = StorageVariant::open(IndexBackend::RocksDb, path)?;
        let mut index = AuthenticatedIndex::open(store)?;
        assert_eq!(index.digest(), EMPTY_DIGEST);

        // One name written through, two in a committed batch, one rolled back.
        index.insert(b"hal-1", b"v1")?;
        index.begin_batch()?;
        index.insert(b"hal-2", b"v2")?;
        index.insert(b"hal-3", b"v3")?;
        index.commit_batch()?;
        index.begin_batch()?;
        index.insert(b"hal-4", b"v4")?;
        index.rollback_batch();

        println!("Digest before close: {}", hex::encode(index.digest()));
        index.digest()
    };

    let store = StorageVariant::open(IndexBackend::RocksDb, path)?;
    let index = AuthenticatedIndex::open(store)?;
    assert_eq!(index.digest(), digest);
    assert_eq!(index.len(), 3);
    assert!(!index.contains(b"hal-4"), "rolled back entry never persisted");

    let proof = index.prove(b"hal-2")?;
    assert!(proof.verify_inclusion(&digest, b"v2"));

    println!("✓ Reopened index at {}\n", hex::encode(index.digest()));
    Ok(())
}

#[test]
fn test_memory_backend_starts_empty() -> Result<()> {
    let store = StorageVariant::open(IndexBackend::Memory, "unused")?;
    assert_eq!(store.name(), "memory");
    let index = AuthenticatedIndex::open(store)?;
    assert!(index.is_empty());
    Ok(())
}
