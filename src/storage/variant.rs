use anyhow::Result;

use super::{MemoryStorage, MockStorage, RocksStorage};
use crate::config::IndexBackend;
use crate::traits::{IndexStore, StoreOp};

/// Enum representing all possible index store implementations.
pub enum StorageVariant {
    RocksDb(RocksStorage),
    Memory(MemoryStorage),
    Mock(MockStorage),
}

impl StorageVariant {
    /// Open the store selected by configuration.
    pub fn open(backend: IndexBackend, path: &str) -> Result<Self> {
        Ok(match backend {
            IndexBackend::RocksDb => StorageVariant::RocksDb(RocksStorage::open(path)?),
            IndexBackend::Memory => StorageVariant::Memory(MemoryStorage::new()),
        })
    }
}

impl IndexStore for StorageVariant {
    fn name(&self) -> &'static str {
        match self {
            StorageVariant::RocksDb(inner) => inner.name(),
            StorageVariant::Memory(inner) => inner.name(),
            StorageVariant::Mock(inner) => inner.name(),
        }
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self {
            StorageVariant::RocksDb(inner) => inner.get(key),
            StorageVariant::Memory(inner) => inner.get(key),
            StorageVariant::Mock(inner) => inner.get(key),
        }
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            StorageVariant::RocksDb(inner) => inner.scan(),
            StorageVariant::Memory(inner) => inner.scan(),
            StorageVariant::Mock(inner) => inner.scan(),
        }
    }

    fn write(&self, ops: &[StoreOp]) -> Result<()> {
        match self {
            StorageVariant::RocksDb(inner) => inner.write(ops),
            StorageVariant::Memory(inner) => inner.write(ops),
            StorageVariant::Mock(inner) => inner.write(ops),
        }
    }
}
