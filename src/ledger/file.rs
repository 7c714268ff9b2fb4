use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::commitment::CommitmentRecord;
use crate::instructions::InstructionSet;
use crate::traits::{LedgerSnapshotReader, TransactionBuilder};
use crate::types::{LedgerSnapshot, PositionRef};

/// File-based ledger for the CLI.
///
/// Reads the snapshot from a JSON file and writes each instruction set as
/// pretty JSON, either to `output_path` or to the log.
#[derive(Debug, Clone)]
pub struct FileLedger {
    snapshot_path: PathBuf,
    output_path: Option<PathBuf>,
}

impl FileLedger {
    pub fn new(snapshot_path: impl Into<PathBuf>, output_path: Option<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            output_path,
        }
    }

    /// Record that the transaction built from the last mint was accepted:
    /// the snapshot now carries `commitment` and no longer lists the
    /// consumed orders.
    pub async fn record_acceptance(
        &self,
        commitment: &CommitmentRecord,
        consumed: &[PositionRef],
    ) -> Result<()> {
        let mut snapshot = self.fetch_snapshot().await?;
        snapshot.commitment = commitment.clone();
        snapshot.orders.retain(|o| !consumed.contains(&o.position));

        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&self.snapshot_path, json)
            .await
            .with_context(|| format!("Failed to write snapshot {:?}", self.snapshot_path))?;

        info!(
            "Snapshot {:?} updated: root {}, {} orders left",
            self.snapshot_path,
            commitment.root_hex(),
            snapshot.orders.len()
        );
        Ok(())
    }
}

#[async_trait]
impl LedgerSnapshotReader for FileLedger {
    fn name(&self) -> &'static str {
        "file-ledger"
    }

    async fn fetch_snapshot(&self) -> Result<LedgerSnapshot> {
        let raw = tokio::fs::read_to_string(&self.snapshot_path)
            .await
            .with_context(|| format!("Failed to read snapshot {:?}", self.snapshot_path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {:?}", self.snapshot_path))
    }
}

#[async_trait]
impl TransactionBuilder for FileLedger {
    fn name(&self) -> &'static str {
        "file-builder"
    }

    async fn build(&self, instructions: &InstructionSet) -> Result<()> {
        let json = serde_json::to_string_pretty(instructions)?;
        match &self.output_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write instructions {:?}", path))?;
                info!(
                    "Wrote {} instructions to {:?}",
                    instructions.len(),
                    path
                );
            }
            None => info!("Instruction set:\n{}", json),
        }
        Ok(())
    }
}
