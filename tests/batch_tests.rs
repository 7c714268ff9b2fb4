use std::sync::Arc;
use std::thread;

use anyhow::Result;
use mintsmith::batch::{BatchRequest, ProofBatchCoordinator};
use mintsmith::error::{BatchError, IndexError};
use mintsmith::index::AuthenticatedIndex;
use mintsmith::storage::{MemoryStorage, MockStorage};
use mintsmith::types::{Digest, EMPTY_DIGEST};

// ===== Test Helper Functions =====

fn coordinator() -> Result<ProofBatchCoordinator<MemoryStorage>> {
    Ok(ProofBatchCoordinator::new(AuthenticatedIndex::open(
        MemoryStorage::new(),
    )?))
}

fn request(name: &str) -> BatchRequest {
    BatchRequest::new(name, format!("value-of-{}", name))
}

fn requests(names: &[&str]) -> Vec<BatchRequest> {
    names.iter().map(|n| request(n)).collect()
}

// ===== Scenarios =====

#[test]
fn test_scenario_a_first_insert() -> Result<()> {
    println!("\n=== Test: Scenario A - First Insert ===");

    let c = coordinator()?;
    let d0 = c.digest()?;
    let out = c.apply_batch(&d0, &requests(&["hal-1"]))?;

    assert_ne!(out.new_digest, d0);
    assert_eq!(out.proofs.len(), 1);
    let entry = &out.proofs.entries()[0];
    assert_eq!(entry.key, b"hal-1");
    assert!(entry.proof.verify_absence(&d0));

    println!("✓ D0 {} -> D1 {}\n", hex::encode(d0), hex::encode(out.new_digest));
    Ok(())
}

#[test]
fn test_scenario_b_reinsert_fails() -> Result<()> {
    println!("\n=== Test: Scenario B - Reinsert Fails ===");

    let c = coordinator()?;
    let d1 = c.apply_batch(&EMPTY_DIGEST, &requests(&["hal-1"]))?.new_digest;

    let err = c.apply_batch(&d1, &requests(&["hal-1"])).unwrap_err();
    assert!(matches!(err, BatchError::KeyExists { ref key } if key == b"hal-1"));
    assert_eq!(c.digest()?, d1);

    println!("✓ {}\n", err);
    Ok(())
}

#[test]
fn test_scenario_c_partial_batch_rolls_back() -> Result<()> {
    println!("\n=== Test: Scenario C - Partial Batch Rolls Back ===");

    let c = coordinator()?;
    let d1 = c.apply_batch(&EMPTY_DIGEST, &requests(&["hal-1"]))?.new_digest;

    let err = c
        .apply_batch(&d1, &requests(&["hal-2", "hal-1"]))
        .unwrap_err();
    assert!(matches!(err, BatchError::KeyExists { .. }));
    assert_eq!(c.digest()?, d1);
    assert!(!c.contains(b"hal-2")?, "hal-2 must be rolled back");
    assert!(c.prove(b"hal-2")?.verify_absence(&d1));

    println!("✓ hal-2 absent after rollback\n");
    Ok(())
}

#[test]
fn test_scenario_d_root_mismatch_skips_proving() -> Result<()> {
    println!("\n=== Test: Scenario D - Root Mismatch ===");

    let store = MockStorage::new();
    let c = ProofBatchCoordinator::new(AuthenticatedIndex::open(store.clone())?);

    // Proving any of these keys would fail with a lookup error.
    store.fail_get_on(b"hal-1");
    store.fail_get_on(b"hal-2");

    let stale: Digest = [0xab; 32];
    let err = c
        .apply_batch(&stale, &requests(&["hal-1", "hal-2"]))
        .unwrap_err();
    match err {
        BatchError::RootMismatch { expected, actual } => {
            assert_eq!(expected, stale);
            assert_eq!(actual, EMPTY_DIGEST);
        }
        other => panic!("expected RootMismatch, got {other}"),
    }
    assert_eq!(store.write_count(), 0);

    println!("✓ Rejected before any prove/insert\n");
    Ok(())
}

#[test]
fn test_scenario_e_sixteen_names() -> Result<()> {
    println!("\n=== Test: Scenario E - Sixteen Names ===");

    let store = MockStorage::new();
    let c = ProofBatchCoordinator::new(AuthenticatedIndex::open(store.clone())?);
    let names: Vec<String> = (0..16).map(|i| format!("hal-{}", i)).collect();
    let batch: Vec<BatchRequest> = names.iter().map(|n| request(n)).collect();

    let out = c.apply_batch(&EMPTY_DIGEST, &batch)?;

    assert_eq!(store.write_count(), 1, "one persisted write per batch");
    assert_eq!(out.proofs.len(), 16);
    for (entry, name) in out.proofs.iter().zip(&names) {
        assert_eq!(entry.key, name.as_bytes(), "proofs follow input order");
    }

    let index = c.shared();
    let index = index.lock().unwrap();
    assert_eq!(index.digest(), out.new_digest);
    for req in &batch {
        assert_eq!(index.get(&req.key)?, Some(req.value.clone()));
    }

    println!("✓ 16 names inserted, root {}\n", hex::encode(out.new_digest));
    Ok(())
}

// ===== Properties =====

#[test]
fn test_proof_soundness_across_batch() -> Result<()> {
    println!("\n=== Test: Proof Soundness ===");

    let c = coordinator()?;
    let d0 = c.apply_batch(&EMPTY_DIGEST, &requests(&["seed-1", "seed-2"]))?.new_digest;
    let out = c.apply_batch(&d0, &requests(&["n-1", "n-2", "n-3"]))?;

    // Each proof is against the running root of the batch; the first one
    // is against the pre-batch root.
    let first = &out.proofs.entries()[0];
    assert!(first.proof.verify_absence(&d0));
    assert_eq!(out.proofs.replay(&d0), Some(out.new_digest));
    assert_eq!(out.proofs.replay(&EMPTY_DIGEST), None);

    // After the batch every key is present with its inserted value.
    for entry in &out.proofs {
        let now = c.prove(&entry.key)?;
        assert!(now.verify_inclusion(&out.new_digest, &entry.value));
    }

    println!("✓ Replay reaches {}\n", hex::encode(out.new_digest));
    Ok(())
}

#[test]
fn test_write_once() -> Result<()> {
    println!("\n=== Test: Write Once ===");

    let c = coordinator()?;
    let mut digest = c.apply_batch(&EMPTY_DIGEST, &requests(&["a", "b"]))?.new_digest;
    digest = c.apply_batch(&digest, &requests(&["c"]))?.new_digest;

    for conflicting in [vec!["a"], vec!["x", "b"], vec!["y", "z", "c"]] {
        let err = c.apply_batch(&digest, &requests(&conflicting)).unwrap_err();
        assert!(matches!(err, BatchError::KeyExists { .. }));
        assert_eq!(c.digest()?, digest);
    }
    for absent in ["x", "y", "z"] {
        assert!(!c.contains(absent.as_bytes())?);
    }

    println!("✓ Minted keys can never be inserted again\n");
    Ok(())
}

#[test]
fn test_determinism_with_failed_batches_in_between() -> Result<()> {
    println!("\n=== Test: Determinism ===");

    let accepted = [vec!["a", "b"], vec!["c"], vec!["d", "e", "f"]];

    let clean = coordinator()?;
    let mut d = EMPTY_DIGEST;
    for batch in &accepted {
        d = clean.apply_batch(&d, &requests(batch))?.new_digest;
    }

    let noisy = coordinator()?;
    let mut n = EMPTY_DIGEST;
    for batch in &accepted {
        // A conflicting batch and a stale one before every accepted batch.
        if n != EMPTY_DIGEST {
            assert!(noisy.apply_batch(&n, &requests(&["zz", "a"])).is_err());
        }
        assert!(noisy.apply_batch(&[1u8; 32], &requests(batch)).is_err());
        n = noisy.apply_batch(&n, &requests(batch))?.new_digest;
    }

    assert_eq!(n, d);
    println!("✓ Both indexes at {}\n", hex::encode(d));
    Ok(())
}

#[test]
fn test_lookup_failure_mid_batch_rolls_back() -> Result<()> {
    println!("\n=== Test: Lookup Failure Mid Batch ===");

    let store = MockStorage::new();
    let c = ProofBatchCoordinator::new(AuthenticatedIndex::open(store.clone())?);
    let d0 = c.apply_batch(&EMPTY_DIGEST, &requests(&["seed"]))?.new_digest;

    store.fail_get_on(b"broken");
    let err = c
        .apply_batch(&d0, &requests(&["ok-1", "ok-2", "broken", "never"]))
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::Index(IndexError::KeyLookup { ref key, .. }) if key == b"broken"
    ));
    assert_eq!(c.digest()?, d0);
    assert!(!c.contains(b"ok-1")?);
    assert!(!c.contains(b"ok-2")?);

    store.clear_failures();
    let out = c.apply_batch(&d0, &requests(&["ok-1", "ok-2", "broken", "never"]))?;
    assert_eq!(out.proofs.len(), 4);

    println!("✓ Lookup error surfaced with index restored\n");
    Ok(())
}

#[test]
fn test_revert_restores_pre_batch_root() -> Result<()> {
    println!("\n=== Test: Revert Receipt ===");

    let c = coordinator()?;
    let d0 = c.apply_batch(&EMPTY_DIGEST, &requests(&["keep"]))?.new_digest;
    let out = c.apply_batch(&d0, &requests(&["drop-1", "drop-2"]))?;
    assert_eq!(out.receipt.pre_digest, d0);
    assert_eq!(out.receipt.post_digest, out.new_digest);

    let restored = c.revert(&out.receipt)?;
    assert_eq!(restored, d0);
    assert!(c.contains(b"keep")?);
    assert!(!c.contains(b"drop-1")?);

    // A second revert no longer matches the index.
    assert!(matches!(
        c.revert(&out.receipt),
        Err(BatchError::RevertConflict { .. })
    ));

    // The old expected digest is usable again.
    let again = c.apply_batch(&d0, &requests(&["drop-1", "drop-2"]))?;
    assert_eq!(again.new_digest, out.new_digest);

    println!("✓ Reverted to {}\n", hex::encode(d0));
    Ok(())
}

#[test]
fn test_concurrent_batches_serialize() -> Result<()> {
    println!("\n=== Test: Concurrent Batches Serialize ===");

    let c = Arc::new(coordinator()?);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                // Every thread races against the empty root; one wins.
                c.apply_batch(&EMPTY_DIGEST, &[request(&format!("racer-{}", i))])
                    .is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(c.shared().lock().unwrap().len(), 1);

    println!("✓ Exactly one batch applied\n");
    Ok(())
}
