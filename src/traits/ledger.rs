use anyhow::Result;
use async_trait::async_trait;

use crate::types::LedgerSnapshot;

/// Read-only view of the ledger state the minter depends on.
#[async_trait]
pub trait LedgerSnapshotReader: Send + Sync {
    /// Reader name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the current commitment record, settings and pending orders.
    ///
    /// Errors are treated as transient by callers.
    async fn fetch_snapshot(&self) -> Result<LedgerSnapshot>;
}
