use anyhow::Result;

/// A single write against an index store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl StoreOp {
    pub fn key(&self) -> &[u8] {
        match self {
            StoreOp::Put { key, .. } | StoreOp::Delete { key } => key,
        }
    }
}

/// Where the authenticated index persists its key/value pairs
/// (e.g. RocksDB, memory).
pub trait IndexStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Every stored pair, in key order.
    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply all operations atomically: either every op lands or none does.
    fn write(&self, ops: &[StoreOp]) -> Result<()>;
}
