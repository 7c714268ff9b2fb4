use anyhow::Result;
use async_trait::async_trait;

use crate::instructions::InstructionSet;

/// Turns an abstract instruction set into a ledger transaction
/// (serialization, fee balancing, signing, submission are its business).
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// Builder name for logging.
    fn name(&self) -> &'static str;

    /// Accept an instruction set. Success does not mean the transaction
    /// was submitted, let alone accepted.
    async fn build(&self, instructions: &InstructionSet) -> Result<()>;
}
