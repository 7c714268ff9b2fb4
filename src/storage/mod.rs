pub mod memory;
pub mod mock;
pub mod rocks;
pub mod variant;

pub use memory::MemoryStorage;
pub use mock::MockStorage;
pub use rocks::RocksStorage;
pub use variant::StorageVariant;
