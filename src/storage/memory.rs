use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::traits::{IndexStore, StoreOp};

/// Volatile store, for tooling and tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))
    }
}

impl IndexStore for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, ops: &[StoreOp]) -> Result<()> {
        let mut entries = self.lock()?;
        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                StoreOp::Delete { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
