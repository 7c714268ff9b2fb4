//! Core MintOrchestrator struct and shared helpers.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::batch::ProofBatchCoordinator;
use crate::error::{BatchError, MintError};
use crate::instructions::InstructionSet;
use crate::orders::{AssetName, NameState, OrderQueue, OrderRecord};
use crate::traits::{IndexStore, LedgerSnapshotReader, TransactionBuilder};
use crate::types::{display_key, Digest, LedgerSnapshot};

/// Drives the order lifecycle: request, cancel, mint.
///
/// Ledger access happens before the coordinator's locked section and the
/// builder hand-off after it, never inside.
pub struct MintOrchestrator<L, B, S>
where
    L: LedgerSnapshotReader,
    B: TransactionBuilder,
    S: IndexStore,
{
    /// Source of ledger snapshots.
    pub ledger: L,

    /// Receives every prepared instruction set.
    pub builder: B,

    /// Sole writer of the authenticated index.
    pub coordinator: ProofBatchCoordinator<S>,
}

/// One index entry as shown by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub key: String,
    pub value: String,
}

/// Index contents and digest, for tooling.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub digest: String,
    pub entries: Vec<IndexEntry>,
}

impl<L, B, S> MintOrchestrator<L, B, S>
where
    L: LedgerSnapshotReader,
    B: TransactionBuilder,
    S: IndexStore,
{
    pub fn new(ledger: L, builder: B, coordinator: ProofBatchCoordinator<S>) -> Self {
        Self {
            ledger,
            builder,
            coordinator,
        }
    }

    /// Current digest of the local index.
    pub fn local_digest(&self) -> Result<Digest, MintError> {
        Ok(self.coordinator.digest()?)
    }

    /// Where `name` stands: minted names are read from the index, requested
    /// ones from the caller's queue.
    pub fn name_state(&self, name: &AssetName, queue: &OrderQueue) -> Result<NameState, MintError> {
        if self.coordinator.contains(name.as_bytes())? {
            return Ok(NameState::Minted);
        }
        if queue.is_requested(name) {
            return Ok(NameState::Requested);
        }
        Ok(NameState::Unclaimed)
    }

    /// Pending orders for names the index already holds. They can never be
    /// executed; their owners can only cancel them.
    pub fn stale_orders(&self, queue: &OrderQueue) -> Result<Vec<OrderRecord>, MintError> {
        let mut stale = Vec::new();
        for order in queue.pending() {
            if self.coordinator.contains(order.name().as_bytes())? {
                stale.push(order.clone());
            }
        }
        Ok(stale)
    }

    /// Next batch of at most `max` orders that can all be minted together.
    pub fn next_batch(
        &self,
        queue: &OrderQueue,
        max: usize,
    ) -> Result<Vec<OrderRecord>, MintError> {
        let stale = self.stale_orders(queue)?;
        for order in &stale {
            debug!("Skipping order {} for minted name {}", order.position, order.name());
        }
        let stale: HashSet<_> = stale.into_iter().map(|o| o.position).collect();
        Ok(queue.take_batch_where(max, |o| !stale.contains(&o.position)))
    }

    /// Enumerate every index entry with the current digest.
    pub fn inspect(&self) -> Result<IndexReport, MintError> {
        let index = self.coordinator.shared();
        let index = index
            .lock()
            .map_err(|_| MintError::Batch(BatchError::Poisoned))?;
        let entries = index
            .entries()
            .map_err(|e| MintError::Batch(e.into()))?
            .into_iter()
            .map(|(key, value)| IndexEntry {
                key: display_key(&key).into_owned(),
                value: hex::encode(value),
            })
            .collect();
        Ok(IndexReport {
            digest: hex::encode(index.digest()),
            entries,
        })
    }

    pub(crate) async fn fetch_snapshot(&self) -> Result<LedgerSnapshot, MintError> {
        let snapshot = self.ledger.fetch_snapshot().await.map_err(|e| {
            warn!("Ledger {} fetch failed: {}", self.ledger.name(), e);
            MintError::Fetch(e)
        })?;
        debug!(
            "Snapshot from {}: root {}, {} orders",
            self.ledger.name(),
            snapshot.commitment.root_hex(),
            snapshot.orders.len()
        );
        Ok(snapshot)
    }

    pub(crate) async fn hand_off(&self, instructions: &InstructionSet) -> Result<(), MintError> {
        self.builder.build(instructions).await.map_err(|e| {
            warn!("Builder {} rejected instruction set: {}", self.builder.name(), e);
            MintError::Builder(e)
        })
    }
}
