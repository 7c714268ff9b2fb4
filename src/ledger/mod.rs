pub mod file;
pub mod mock;

pub use file::FileLedger;
pub use mock::MockLedger;
