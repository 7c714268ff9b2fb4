//! Proof-batch coordinator: the only writer of the authenticated index.
//!
//! A batch is all-or-nothing. Either every request is inserted and each one
//! comes with an absence proof against the digest right before its
//! insertion, or the index is left exactly as it was found.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, span, warn, Level};

use crate::crypto::MembershipProof;
use crate::error::BatchError;
use crate::index::AuthenticatedIndex;
use crate::traits::IndexStore;
use crate::types::{display_key, Digest, ProofBatch, ProofBatchEntry};

/// One key to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl BatchRequest {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// What a committed batch changed; enough to undo it with
/// [`ProofBatchCoordinator::revert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt {
    pub pre_digest: Digest,
    pub post_digest: Digest,
    /// Inserted keys, in insertion order.
    pub keys: Vec<Vec<u8>>,
}

impl BatchReceipt {
    pub fn is_noop(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub proofs: ProofBatch,
    pub new_digest: Digest,
    pub receipt: BatchReceipt,
}

/// Serializes every mutation of an [`AuthenticatedIndex`] behind one lock.
pub struct ProofBatchCoordinator<S: IndexStore> {
    index: Arc<Mutex<AuthenticatedIndex<S>>>,
}

impl<S: IndexStore> Clone for ProofBatchCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
        }
    }
}

impl<S: IndexStore> ProofBatchCoordinator<S> {
    pub fn new(index: AuthenticatedIndex<S>) -> Self {
        Self {
            index: Arc::new(Mutex::new(index)),
        }
    }

    /// Shared handle to the index, for read-only tooling.
    pub fn shared(&self) -> Arc<Mutex<AuthenticatedIndex<S>>> {
        Arc::clone(&self.index)
    }

    pub fn digest(&self) -> Result<Digest, BatchError> {
        Ok(self.lock()?.digest())
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool, BatchError> {
        Ok(self.lock()?.contains(key))
    }

    pub fn prove(&self, key: &[u8]) -> Result<MembershipProof, BatchError> {
        Ok(self.lock()?.prove(key)?)
    }

    /// Insert every request, in order, against an index expected to be at
    /// `expected`.
    ///
    /// Fails with `RootMismatch` before touching anything when the digest
    /// differs, and with `KeyExists` when a requested key is already
    /// present. On any error the index is back at its pre-batch digest.
    pub fn apply_batch(
        &self,
        expected: &Digest,
        requests: &[BatchRequest],
    ) -> Result<BatchOutcome, BatchError> {
        let span = span!(Level::INFO, "apply_batch", requests = requests.len());
        let _enter = span.enter();

        let mut index = self.lock()?;
        let pre_digest = index.digest();
        if pre_digest != *expected {
            warn!(
                "Index root {} does not match expected {}",
                hex::encode(pre_digest),
                hex::encode(expected)
            );
            return Err(BatchError::RootMismatch {
                expected: *expected,
                actual: pre_digest,
            });
        }

        if requests.is_empty() {
            debug!("Empty batch, nothing to apply");
            return Ok(BatchOutcome {
                proofs: ProofBatch::new(),
                new_digest: pre_digest,
                receipt: BatchReceipt {
                    pre_digest,
                    post_digest: pre_digest,
                    keys: Vec::new(),
                },
            });
        }

        index.begin_batch()?;
        let proofs = match insert_all(&mut index, requests) {
            Ok(proofs) => proofs,
            Err(e) => {
                index.rollback_batch();
                warn!("Batch rejected, index restored: {}", e);
                return Err(e);
            }
        };
        index.commit_batch()?;

        let new_digest = index.digest();
        info!(
            "Batch applied: {} keys, root {} -> {}",
            requests.len(),
            hex::encode(pre_digest),
            hex::encode(new_digest)
        );

        Ok(BatchOutcome {
            proofs,
            new_digest,
            receipt: BatchReceipt {
                pre_digest,
                post_digest: new_digest,
                keys: requests.iter().map(|r| r.key.clone()).collect(),
            },
        })
    }

    /// Undo a committed batch, e.g. after the ledger rejected the
    /// transaction that embedded it.
    ///
    /// The index must still be at the receipt's post-batch digest.
    pub fn revert(&self, receipt: &BatchReceipt) -> Result<Digest, BatchError> {
        let span = span!(Level::INFO, "revert_batch", keys = receipt.keys.len());
        let _enter = span.enter();

        let mut index = self.lock()?;
        let current = index.digest();
        if current != receipt.post_digest {
            return Err(BatchError::RevertConflict {
                expected: receipt.post_digest,
                actual: current,
            });
        }
        if receipt.is_noop() {
            return Ok(current);
        }

        index.begin_batch()?;
        for key in receipt.keys.iter().rev() {
            if let Err(e) = index.delete(key) {
                index.rollback_batch();
                return Err(e.into());
            }
        }

        let reverted = index.digest();
        if reverted != receipt.pre_digest {
            index.rollback_batch();
            return Err(BatchError::RevertMismatch {
                expected: receipt.pre_digest,
                actual: reverted,
            });
        }
        index.commit_batch()?;

        info!(
            "Batch reverted: root {} -> {}",
            hex::encode(receipt.post_digest),
            hex::encode(reverted)
        );
        Ok(reverted)
    }

    fn lock(&self) -> Result<MutexGuard<'_, AuthenticatedIndex<S>>, BatchError> {
        self.index.lock().map_err(|_| BatchError::Poisoned)
    }
}

fn insert_all<S: IndexStore>(
    index: &mut AuthenticatedIndex<S>,
    requests: &[BatchRequest],
) -> Result<ProofBatch, BatchError> {
    let mut proofs = ProofBatch::new();
    for request in requests {
        let proof = index.prove(&request.key)?;
        if !proof.is_absence() {
            return Err(BatchError::KeyExists {
                key: request.key.clone(),
            });
        }
        index.insert(&request.key, &request.value)?;
        debug!("Inserted {}", display_key(&request.key));
        proofs.push(ProofBatchEntry {
            key: request.key.clone(),
            value: request.value.clone(),
            proof,
        });
    }
    Ok(proofs)
}
