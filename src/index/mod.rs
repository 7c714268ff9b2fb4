//! Authenticated key/value index: a sparse Merkle tree mirrored onto an
//! [`IndexStore`].
//!
//! The tree holds leaf hashes only; values live in the store. Outside a
//! batch every mutation writes through. Inside a batch, writes are staged
//! and the tree journals its changes, so `rollback_batch` restores the exact
//! pre-batch state and `commit_batch` persists everything in one store write.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::crypto::hasher::{key_path, leaf_hash};
use crate::crypto::{MembershipProof, SparseMerkleTree};
use crate::error::IndexError;
use crate::traits::{IndexStore, StoreOp};
use crate::types::Digest;

pub struct AuthenticatedIndex<S: IndexStore> {
    store: S,
    tree: SparseMerkleTree,
    /// Writes of the open batch, newest value per key (`None` = delete).
    staged: Option<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl<S: IndexStore> AuthenticatedIndex<S> {
    /// Rebuild the index from every pair persisted in `store`.
    pub fn open(store: S) -> Result<Self, IndexError> {
        let entries = store.scan().map_err(IndexError::Storage)?;
        let mut tree = SparseMerkleTree::new();
        for (key, value) in &entries {
            let path = key_path(key);
            tree.upsert(&path, leaf_hash(&path, value));
        }

        info!(
            store = store.name(),
            entries = entries.len(),
            digest = %hex::encode(tree.root()),
            "authenticated index opened"
        );

        Ok(Self {
            store,
            tree,
            staged: None,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Root digest of the current contents.
    pub fn digest(&self) -> Digest {
        self.tree.root()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.tree.contains(&key_path(key))
    }

    /// Current value of `key`, staged writes included.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, IndexError> {
        if let Some(staged) = self.staged.as_ref().and_then(|s| s.get(key)) {
            return Ok(staged.clone());
        }
        self.store.get(key).map_err(|source| IndexError::KeyLookup {
            key: key.to_vec(),
            source,
        })
    }

    /// Prove the current status of `key` (present with its value, or absent)
    /// against [`digest`](Self::digest).
    ///
    /// Absence is a valid outcome; only a failing storage read is an error.
    pub fn prove(&self, key: &[u8]) -> Result<MembershipProof, IndexError> {
        let value = self.get(key)?;
        let path = key_path(key);

        let consistent = match (&value, self.tree.leaf(&path)) {
            (Some(v), Some(leaf)) => leaf_hash(&path, v) == leaf,
            (None, None) => true,
            _ => false,
        };
        if !consistent {
            return Err(IndexError::Inconsistent { key: key.to_vec() });
        }

        Ok(MembershipProof {
            key: key.to_vec(),
            value,
            nodes: self.tree.siblings(&path),
        })
    }

    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), IndexError> {
        if self.contains(key) {
            return Err(IndexError::DuplicateKey { key: key.to_vec() });
        }
        self.put(key, value)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), IndexError> {
        let path = key_path(key);
        if !self.tree.contains(&path) {
            return Err(IndexError::MissingKey { key: key.to_vec() });
        }
        self.apply(StoreOp::Delete { key: key.to_vec() })?;
        self.tree.remove(&path);
        Ok(())
    }

    /// Replace the value of an existing key.
    ///
    /// Ends in the same state as `delete` followed by `insert`, but touches
    /// storage once so a failure cannot leave the key deleted.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<(), IndexError> {
        if !self.contains(key) {
            return Err(IndexError::MissingKey { key: key.to_vec() });
        }
        self.put(key, value)
    }

    /// Every entry, in key order, staged writes included.
    pub fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, IndexError> {
        let mut entries: BTreeMap<Vec<u8>, Vec<u8>> = self
            .store
            .scan()
            .map_err(IndexError::Storage)?
            .into_iter()
            .collect();
        if let Some(staged) = &self.staged {
            for (key, value) in staged {
                match value {
                    Some(v) => entries.insert(key.clone(), v.clone()),
                    None => entries.remove(key),
                };
            }
        }
        Ok(entries.into_iter().collect())
    }

    pub fn in_batch(&self) -> bool {
        self.staged.is_some()
    }

    pub fn begin_batch(&mut self) -> Result<(), IndexError> {
        if self.staged.is_some() {
            return Err(IndexError::BatchAlreadyOpen);
        }
        self.tree.begin();
        self.staged = Some(BTreeMap::new());
        Ok(())
    }

    /// Persist the open batch in one store write.
    ///
    /// If the store rejects it, the batch is rolled back before returning.
    pub fn commit_batch(&mut self) -> Result<(), IndexError> {
        let staged = self.staged.take().ok_or(IndexError::NoOpenBatch)?;
        let ops: Vec<StoreOp> = staged
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => StoreOp::Put { key, value },
                None => StoreOp::Delete { key },
            })
            .collect();

        if !ops.is_empty() {
            if let Err(e) = self.store.write(&ops) {
                self.tree.rollback();
                return Err(IndexError::Storage(e));
            }
        }

        self.tree.commit();
        debug!(ops = ops.len(), digest = %hex::encode(self.digest()), "batch committed");
        Ok(())
    }

    /// Drop the open batch; the index returns to its state at `begin_batch`.
    pub fn rollback_batch(&mut self) {
        if self.staged.take().is_some() {
            self.tree.rollback();
            debug!(digest = %hex::encode(self.digest()), "batch rolled back");
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), IndexError> {
        self.apply(StoreOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        let path = key_path(key);
        self.tree.upsert(&path, leaf_hash(&path, value));
        Ok(())
    }

    /// Stage `op` inside a batch, write it through otherwise.
    /// Storage is touched before the tree so a failed write changes nothing.
    fn apply(&mut self, op: StoreOp) -> Result<(), IndexError> {
        match self.staged.as_mut() {
            Some(staged) => {
                match op {
                    StoreOp::Put { key, value } => staged.insert(key, Some(value)),
                    StoreOp::Delete { key } => staged.insert(key, None),
                };
                Ok(())
            }
            None => self.store.write(&[op]).map_err(IndexError::Storage),
        }
    }
}
