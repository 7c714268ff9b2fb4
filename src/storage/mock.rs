use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::memory::MemoryStorage;
use crate::traits::{IndexStore, StoreOp};

/// Mock store for testing: an in-memory store with injectable failures.
///
/// Clones share state, so a test can keep a handle after moving one into
/// an index.
#[derive(Clone, Default)]
pub struct MockStorage {
    inner: Arc<MemoryStorage>,
    failing_keys: Arc<Mutex<HashSet<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    write_budget: Arc<Mutex<Option<usize>>>,
    writes: Arc<AtomicUsize>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` of `key` fail.
    pub fn fail_get_on(&self, key: &[u8]) {
        self.failing_keys.lock().unwrap().insert(key.to_vec());
    }

    pub fn clear_failures(&self) {
        self.failing_keys.lock().unwrap().clear();
        self.fail_writes.store(false, Ordering::SeqCst);
        *self.write_budget.lock().unwrap() = None;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let `n` more writes through, then fail every write after them.
    pub fn fail_writes_after(&self, n: usize) {
        *self.write_budget.lock().unwrap() = Some(n);
    }

    /// Number of successful `write` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl IndexStore for MockStorage {
    fn name(&self) -> &'static str {
        "mock-storage"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.failing_keys.lock().unwrap().contains(key) {
            anyhow::bail!("injected read failure");
        }
        self.inner.get(key)
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan()
    }

    fn write(&self, ops: &[StoreOp]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("injected write failure");
        }
        if let Some(budget) = self.write_budget.lock().unwrap().as_mut() {
            if *budget == 0 {
                anyhow::bail!("injected write failure");
            }
            *budget -= 1;
        }
        self.inner.write(ops)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
