use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

/// Where the authenticated index keeps its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Persistent RocksDB store at `storage_path`.
    #[value(name = "rocksdb")]
    RocksDb,
    /// Volatile store; the index starts empty on every run.
    Memory,
}

/// Base configuration for the minter.
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct BaseConfig {
    /// Path for persistent index storage (RocksDB).
    #[arg(long, default_value = "./data/index")]
    pub storage_path: String,

    /// Index storage backend.
    #[arg(long, value_enum, default_value_t = IndexBackend::RocksDb)]
    pub index_backend: IndexBackend,

    /// Ledger snapshot (JSON) read before every operation.
    #[arg(long, default_value = "./data/snapshot.json")]
    pub snapshot_path: String,

    /// Where instruction sets are written; logged only when unset.
    #[arg(long)]
    pub instructions_out: Option<String>,

    /// Maximum number of orders minted in one batch.
    #[arg(long, default_value_t = 16)]
    pub max_batch_orders: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            storage_path: "./data/index".to_string(),
            index_backend: IndexBackend::RocksDb,
            snapshot_path: "./data/snapshot.json".to_string(),
            instructions_out: None,
            max_batch_orders: 16,
        }
    }
}
