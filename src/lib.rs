// Library exports for testing and external use

pub mod app;
pub mod batch;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod error;
pub mod index;
pub mod instructions;
pub mod ledger;
pub mod orchestrator;
pub mod orders;
pub mod storage;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use batch::{BatchOutcome, BatchReceipt, BatchRequest, ProofBatchCoordinator};
pub use commitment::{CommitmentRecord, Settings};
pub use config::{BaseConfig, IndexBackend};
pub use error::{BatchError, ErrorClass, IndexError, MintError};
pub use index::AuthenticatedIndex;
pub use instructions::{Instruction, InstructionSet};
pub use orchestrator::{MintOrchestrator, MintPlan};
pub use orders::{AssetName, ClientIdentity, NameState, OrderQueue, OrderRecord};
pub use traits::{IndexStore, LedgerSnapshotReader, TransactionBuilder};
pub use types::{Digest, LedgerSnapshot, PositionRef, ProofBatch, EMPTY_DIGEST};

// Re-export variant enums for convenience
pub use ledger::{FileLedger, MockLedger};
pub use storage::{MemoryStorage, MockStorage, RocksStorage, StorageVariant};
