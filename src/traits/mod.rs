pub mod index_store;
pub mod ledger;
pub mod transaction_builder;

pub use index_store::IndexStore;
pub use index_store::StoreOp;
pub use ledger::LedgerSnapshotReader;
pub use transaction_builder::TransactionBuilder;
