//! Wiring for the command-line minter: configuration in, orchestrator out.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::batch::ProofBatchCoordinator;
use crate::config::BaseConfig;
use crate::index::AuthenticatedIndex;
use crate::ledger::FileLedger;
use crate::orchestrator::MintOrchestrator;
use crate::orders::OrderQueue;
use crate::storage::StorageVariant;
use crate::traits::LedgerSnapshotReader;

pub type FileOrchestrator = MintOrchestrator<FileLedger, FileLedger, StorageVariant>;

pub struct App {
    /// Global/base configuration.
    pub config: BaseConfig,

    /// Snapshot source and instruction sink.
    pub ledger: FileLedger,

    pub orchestrator: FileOrchestrator,
}

impl App {
    /// Open the configured index store, rebuild the index from it and wire
    /// the file ledger on both sides of the orchestrator.
    pub fn initialize(config: BaseConfig) -> Result<Self> {
        let store = StorageVariant::open(config.index_backend, &config.storage_path)?;
        info!(
            "Index store opened: backend={:?}, path={}",
            config.index_backend, config.storage_path
        );
        let index = AuthenticatedIndex::open(store)?;

        let ledger = FileLedger::new(
            &config.snapshot_path,
            config.instructions_out.as_ref().map(PathBuf::from),
        );
        let orchestrator = MintOrchestrator::new(
            ledger.clone(),
            ledger.clone(),
            ProofBatchCoordinator::new(index),
        );

        Ok(Self {
            config,
            ledger,
            orchestrator,
        })
    }

    /// Pending orders as currently listed by the snapshot.
    pub async fn pending_orders(&self) -> Result<OrderQueue> {
        let snapshot = self.ledger.fetch_snapshot().await?;
        let mut queue = OrderQueue::new();
        queue.sync(&snapshot.orders);
        Ok(queue)
    }
}
