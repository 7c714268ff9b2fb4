use std::fs;
use std::path::Path;

use anyhow::Result;
use mintsmith::app::App;
use mintsmith::config::{BaseConfig, IndexBackend};
use mintsmith::error::MintError;
use mintsmith::instructions::InstructionSet;
use mintsmith::ledger::FileLedger;
use mintsmith::orders::ClientIdentity;
use mintsmith::traits::LedgerSnapshotReader;
use mintsmith::types::EMPTY_DIGEST;

const SAMPLE: &str = "tests/data/sample-snapshot.json";

/// Copy the sample snapshot somewhere writable.
fn stage_snapshot(dir: &Path) -> Result<String> {
    let path = dir.join("snapshot.json");
    fs::copy(SAMPLE, &path)?;
    Ok(path.to_str().unwrap().to_string())
}

fn test_config(dir: &Path, backend: IndexBackend) -> Result<BaseConfig> {
    Ok(BaseConfig {
        storage_path: dir.join("index").to_str().unwrap().to_string(),
        index_backend: backend,
        snapshot_path: stage_snapshot(dir)?,
        instructions_out: Some(dir.join("out/instructions.json").to_str().unwrap().to_string()),
        max_batch_orders: 16,
    })
}

#[tokio::test]
async fn test_sample_snapshot_parses() -> Result<()> {
    println!("\n=== Test: Sample Snapshot Parses ===\n");

    let ledger = FileLedger::new(SAMPLE, None);
    let snapshot = ledger.fetch_snapshot().await?;

    assert_eq!(snapshot.commitment.root, EMPTY_DIGEST);
    assert_eq!(snapshot.commitment.aux.len(), 2);
    assert_eq!(snapshot.settings.unit_price, 180_000_000);
    assert_eq!(snapshot.orders.len(), 3);
    assert_eq!(snapshot.orders[0].name().as_str(), "hal-1");
    assert_eq!(snapshot.settings_position.index, 1);

    println!("✓ {} orders, root {}\n", snapshot.orders.len(), snapshot.commitment.root_hex());
    Ok(())
}

#[tokio::test]
async fn test_missing_snapshot_is_an_error() -> Result<()> {
    let ledger = FileLedger::new("tests/data/does-not-exist.json", None);
    let err = ledger.fetch_snapshot().await.unwrap_err();
    assert!(err.to_string().contains("Failed to read snapshot"));
    Ok(())
}

#[tokio::test]
async fn test_mint_accept_and_conflict_flow() -> Result<()> {
    println!("\n=== Test: Mint, Accept, Conflict ===\n");

    let temp_dir = tempfile::tempdir()?;
    let config = test_config(temp_dir.path(), IndexBackend::RocksDb)?;
    let out_path = temp_dir.path().join("out/instructions.json");
    let app = App::initialize(config)?;

    // Bob's later order for hal-1 waits for the next batch.
    let mut queue = app.pending_orders().await?;
    let batch = queue.take_batch(app.config.max_batch_orders);
    assert_eq!(batch.len(), 2);

    let plan = app.orchestrator.prepare_mint(&batch).await?;
    assert_eq!(plan.total_price, 2 * 180_000_000);

    // The builder wrote the instruction set.
    let written: InstructionSet = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
    assert_eq!(written, plan.instructions);

    app.ledger
        .record_acceptance(&plan.new_commitment, &plan.consumed)
        .await?;
    queue.settle(&plan.consumed);
    assert_eq!(queue.len(), 1);

    let snapshot = app.ledger.fetch_snapshot().await?;
    assert_eq!(snapshot.commitment.root, app.orchestrator.local_digest()?);
    assert_eq!(snapshot.commitment.aux, plan.new_commitment.aux);
    assert_eq!(snapshot.orders.len(), 1);

    let err = app
        .orchestrator
        .prepare_mint(&queue.take_batch(16))
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::NamePreviouslyMinted { ref name } if name == "hal-1"));

    // The mint path skips the stale order instead of retrying it forever.
    let stale = app.orchestrator.stale_orders(&queue)?;
    assert_eq!(stale.len(), 1);
    assert!(app.orchestrator.next_batch(&queue, 16)?.is_empty());

    println!("✓ Second hal-1 rejected: {}\n", err);
    Ok(())
}

#[tokio::test]
async fn test_index_reopen_matches_accepted_snapshot() -> Result<()> {
    println!("\n=== Test: Index Reopen Matches Snapshot ===\n");

    let temp_dir = tempfile::tempdir()?;
    let config = test_config(temp_dir.path(), IndexBackend::RocksDb)?;

    {
        let app = App::initialize(config.clone())?;
        let queue = app.pending_orders().await?;
        let plan = app.orchestrator.prepare_mint(&queue.take_batch(1)).await?;
        app.ledger
            .record_acceptance(&plan.new_commitment, &plan.consumed)
            .await?;
    }

    // A fresh process: the persisted index agrees with the ledger.
    let app = App::initialize(config)?;
    let snapshot = app.ledger.fetch_snapshot().await?;
    assert_eq!(app.orchestrator.local_digest()?, snapshot.commitment.root);
    assert_eq!(app.orchestrator.inspect()?.entries.len(), 1);

    println!("✓ Reopened at {}\n", snapshot.commitment.root_hex());
    Ok(())
}

#[tokio::test]
async fn test_memory_backend_desyncs_after_acceptance() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = test_config(temp_dir.path(), IndexBackend::Memory)?;

    {
        let app = App::initialize(config.clone())?;
        let queue = app.pending_orders().await?;
        let plan = app.orchestrator.prepare_mint(&queue.take_batch(1)).await?;
        app.ledger
            .record_acceptance(&plan.new_commitment, &plan.consumed)
            .await?;
    }

    // The volatile index starts empty and no longer matches the ledger.
    let app = App::initialize(config)?;
    let queue = app.pending_orders().await?;
    let err = app
        .orchestrator
        .prepare_mint(&queue.take_batch(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::Desync { .. }));
    Ok(())
}

#[tokio::test]
async fn test_request_written_to_output() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = test_config(temp_dir.path(), IndexBackend::Memory)?;
    let out_path = temp_dir.path().join("out/instructions.json");
    let app = App::initialize(config)?;

    let client = ClientIdentity {
        key_hash: "5e4d3c2b".into(),
        address: "addr_test1qz_alice".into(),
    };
    let set = app
        .orchestrator
        .prepare_request(&client, "hal-42", "addr_test1qz_alice")
        .await?;

    let written: InstructionSet = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
    assert_eq!(written, set);
    assert_eq!(written.paid_to("addr_test1wq_orders"), 180_000_000);
    Ok(())
}
