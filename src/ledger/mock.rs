use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::commitment::CommitmentRecord;
use crate::instructions::InstructionSet;
use crate::orders::OrderRecord;
use crate::traits::{LedgerSnapshotReader, TransactionBuilder};
use crate::types::{Digest, LedgerSnapshot, PositionRef};

/// Mock ledger for testing: serves an in-memory snapshot and records every
/// instruction set handed to it.
#[derive(Clone)]
pub struct MockLedger {
    pub snapshot: Arc<Mutex<LedgerSnapshot>>,
    pub built: Arc<Mutex<Vec<InstructionSet>>>,
    fail_fetch: Arc<AtomicBool>,
    fail_build: Arc<AtomicBool>,
}

impl MockLedger {
    pub fn new(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
            built: Arc::new(Mutex::new(Vec::new())),
            fail_fetch: Arc::new(AtomicBool::new(false)),
            fail_build: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_commitment_root(&self, root: Digest) {
        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.commitment = snapshot.commitment.with_root(root);
    }

    pub fn set_orders(&self, orders: Vec<OrderRecord>) {
        self.snapshot.lock().unwrap().orders = orders;
    }

    /// Simulate acceptance of a transaction: publish `commitment` and drop
    /// the consumed orders.
    pub fn accept(&self, commitment: CommitmentRecord, consumed: &[PositionRef]) {
        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.commitment = commitment;
        snapshot.orders.retain(|o| !consumed.contains(&o.position));
    }

    pub fn commitment_root(&self) -> Digest {
        self.snapshot.lock().unwrap().commitment.root
    }

    pub fn built_sets(&self) -> Vec<InstructionSet> {
        self.built.lock().unwrap().clone()
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_build(&self, fail: bool) {
        self.fail_build.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerSnapshotReader for MockLedger {
    fn name(&self) -> &'static str {
        "mock-ledger"
    }

    async fn fetch_snapshot(&self) -> Result<LedgerSnapshot> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            anyhow::bail!("injected fetch failure");
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

#[async_trait]
impl TransactionBuilder for MockLedger {
    fn name(&self) -> &'static str {
        "mock-builder"
    }

    async fn build(&self, instructions: &InstructionSet) -> Result<()> {
        if self.fail_build.load(Ordering::SeqCst) {
            anyhow::bail!("injected build failure");
        }
        self.built.lock().unwrap().push(instructions.clone());
        Ok(())
    }
}
