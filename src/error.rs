use thiserror::Error;

use crate::batch::BatchReceipt;
use crate::types::{display_key, Digest, PositionRef};

/// Failures of the authenticated index itself.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("key `{}` is already present", display_key(.key))]
    DuplicateKey { key: Vec<u8> },

    #[error("key `{}` is not present", display_key(.key))]
    MissingKey { key: Vec<u8> },

    #[error("storage lookup for key `{}` failed", display_key(.key))]
    KeyLookup {
        key: Vec<u8>,
        #[source]
        source: anyhow::Error,
    },

    #[error("stored value for key `{}` does not match its tree leaf", display_key(.key))]
    Inconsistent { key: Vec<u8> },

    #[error("storage backend failure")]
    Storage(#[source] anyhow::Error),

    #[error("a batch is already open on this index")]
    BatchAlreadyOpen,

    #[error("no batch is open on this index")]
    NoOpenBatch,
}

/// Failures of a proof batch. The index is back at its pre-batch digest
/// whenever one of these is returned from `apply_batch`.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("index root {} does not match expected root {}", hex::encode(.actual), hex::encode(.expected))]
    RootMismatch { expected: Digest, actual: Digest },

    #[error("key `{}` already exists", display_key(.key))]
    KeyExists { key: Vec<u8> },

    #[error("cannot revert batch: index is at {}, batch left it at {}", hex::encode(.actual), hex::encode(.expected))]
    RevertConflict { expected: Digest, actual: Digest },

    #[error("revert reached root {}, expected pre-batch root {}", hex::encode(.actual), hex::encode(.expected))]
    RevertMismatch { expected: Digest, actual: Digest },

    #[error("index lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Rejected asset names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,

    #[error("name is {len} bytes, at most {max} allowed")]
    TooLong { len: usize, max: usize },
}

/// How a caller should react to a [`MintError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The local mirror or the index is unusable; resync before retrying.
    Fatal,
    /// The request itself is wrong; fix it and resubmit.
    CallerCorrectable,
    /// A collaborator failed; the same call may succeed later.
    Transient,
}

/// Failures of the order lifecycle operations.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("local index root {} diverged from ledger root {}", hex::encode(.local), hex::encode(.ledger))]
    Desync { ledger: Digest, local: Digest },

    #[error("name `{name}` appears more than once in the batch")]
    DuplicateName { name: String },

    #[error("name `{name}` was previously minted")]
    NamePreviouslyMinted { name: String },

    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("order for `{name}` locks {locked}, unit price is {required}")]
    Underpaid {
        name: String,
        locked: u64,
        required: u64,
    },

    #[error("total price overflows: {unit_price} x {count}")]
    PriceOverflow { unit_price: u64, count: usize },

    #[error("no orders to mint")]
    NothingToMint,

    #[error("order {position} is not pending")]
    UnknownOrder { position: PositionRef },

    #[error("order {position} is not owned by the caller")]
    NotOrderOwner { position: PositionRef },

    #[error("failed to fetch ledger snapshot")]
    Fetch(#[source] anyhow::Error),

    #[error("transaction builder rejected the instruction set")]
    Builder(#[source] anyhow::Error),

    /// The builder failed and undoing the batch failed too. The index still
    /// holds the batch; `receipt` is what a later revert needs.
    #[error("builder rejected the instruction set and the index revert failed: {revert}")]
    RevertFailed {
        #[source]
        builder: anyhow::Error,
        revert: BatchError,
        receipt: BatchReceipt,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl MintError {
    pub fn class(&self) -> ErrorClass {
        match self {
            MintError::Desync { .. } => ErrorClass::Fatal,
            MintError::DuplicateName { .. }
            | MintError::NamePreviouslyMinted { .. }
            | MintError::InvalidName(_)
            | MintError::Underpaid { .. }
            | MintError::PriceOverflow { .. }
            | MintError::NothingToMint
            | MintError::UnknownOrder { .. }
            | MintError::NotOrderOwner { .. } => ErrorClass::CallerCorrectable,
            MintError::Fetch(_) | MintError::Builder(_) => ErrorClass::Transient,
            MintError::RevertFailed { .. } => ErrorClass::Fatal,
            MintError::Batch(BatchError::RootMismatch { .. }) => ErrorClass::Fatal,
            MintError::Batch(BatchError::KeyExists { .. }) => ErrorClass::CallerCorrectable,
            MintError::Batch(_) => ErrorClass::Fatal,
        }
    }
}
