//! Batch minting: the only lifecycle step that mutates the index.

use std::collections::HashSet;

use tracing::{error, info, span, warn, Level};

use super::core::MintOrchestrator;
use crate::batch::{BatchReceipt, BatchRequest};
use crate::commitment::CommitmentRecord;
use crate::error::{BatchError, MintError};
use crate::instructions::{Datum, Instruction, InstructionSet, Redeemer, Value};
use crate::orders::{OrderRecord, ORDER_TOKEN_NAME};
use crate::traits::{IndexStore, LedgerSnapshotReader, TransactionBuilder};
use crate::types::{display_key, Digest, LedgerSnapshot, PositionRef, ProofBatch};

/// Everything a successful mint produced.
#[derive(Debug, Clone)]
pub struct MintPlan {
    pub instructions: InstructionSet,
    pub new_commitment: CommitmentRecord,
    pub proofs: ProofBatch,
    /// Undoes the index mutation if the ledger rejects the transaction.
    pub receipt: BatchReceipt,
    /// Order positions the transaction spends.
    pub consumed: Vec<PositionRef>,
    pub total_price: u64,
}

impl<L, B, S> MintOrchestrator<L, B, S>
where
    L: LedgerSnapshotReader,
    B: TransactionBuilder,
    S: IndexStore,
{
    /// Mint one item per order, recording every name in the index.
    ///
    /// Nothing is emitted and the index is untouched unless every name can
    /// be minted. If the builder refuses the instruction set, the index
    /// mutation is reverted before returning.
    pub async fn prepare_mint(&self, orders: &[OrderRecord]) -> Result<MintPlan, MintError> {
        if orders.is_empty() {
            return Err(MintError::NothingToMint);
        }

        let snapshot = self.fetch_snapshot().await?;
        let ledger_root = snapshot.commitment.root;
        let local = self.local_digest()?;
        if ledger_root != local {
            return Err(MintError::Desync {
                ledger: ledger_root,
                local,
            });
        }

        let mut seen = HashSet::with_capacity(orders.len());
        for order in orders {
            if !seen.insert(order.name()) {
                return Err(MintError::DuplicateName {
                    name: order.name().to_string(),
                });
            }
        }

        let settings = &snapshot.settings;
        for order in orders {
            if order.datum.price < settings.unit_price {
                return Err(MintError::Underpaid {
                    name: order.name().to_string(),
                    locked: order.datum.price,
                    required: settings.unit_price,
                });
            }
        }
        let total_price = u64::try_from(orders.len())
            .ok()
            .and_then(|count| settings.unit_price.checked_mul(count))
            .ok_or(MintError::PriceOverflow {
                unit_price: settings.unit_price,
                count: orders.len(),
            })?;

        let requests: Vec<BatchRequest> = orders
            .iter()
            .map(|o| BatchRequest::new(o.index_key(), o.index_value()))
            .collect();

        let outcome = {
            let span = span!(Level::INFO, "mint_batch", orders = orders.len());
            let _enter = span.enter();
            self.coordinator
                .apply_batch(&ledger_root, &requests)
                .map_err(|e| match e {
                    BatchError::KeyExists { key } => MintError::NamePreviouslyMinted {
                        name: display_key(&key).into_owned(),
                    },
                    BatchError::RootMismatch { expected, actual } => MintError::Desync {
                        ledger: expected,
                        local: actual,
                    },
                    other => MintError::Batch(other),
                })?
        };

        let new_commitment = snapshot.commitment.with_root(outcome.new_digest);
        let instructions = mint_instructions(
            &snapshot,
            orders,
            &new_commitment,
            &outcome.proofs,
            total_price,
        );

        if let Err(e) = self.hand_off(&instructions).await {
            warn!("Reverting batch after builder failure");
            if let Err(revert) = self.coordinator.revert(&outcome.receipt) {
                error!("Revert after builder failure failed: {}", revert);
                let builder = match e {
                    MintError::Builder(source) => source,
                    other => anyhow::Error::new(other),
                };
                return Err(MintError::RevertFailed {
                    builder,
                    revert,
                    receipt: outcome.receipt,
                });
            }
            return Err(e);
        }

        info!(
            "Mint prepared: {} names, root {} -> {}, total price {}",
            orders.len(),
            hex::encode(ledger_root),
            new_commitment.root_hex(),
            total_price
        );

        Ok(MintPlan {
            instructions,
            new_commitment,
            proofs: outcome.proofs,
            receipt: outcome.receipt,
            consumed: orders.iter().map(|o| o.position.clone()).collect(),
            total_price,
        })
    }

    /// Undo the index mutation of `plan` after the ledger rejected its
    /// transaction. Returns the restored digest.
    pub fn revert_mint(&self, plan: &MintPlan) -> Result<Digest, MintError> {
        let digest = self.coordinator.revert(&plan.receipt)?;
        info!(
            "Mint reverted: {} names released, root back at {}",
            plan.consumed.len(),
            hex::encode(digest)
        );
        Ok(digest)
    }
}

fn mint_instructions(
    snapshot: &LedgerSnapshot,
    orders: &[OrderRecord],
    new_commitment: &CommitmentRecord,
    proofs: &ProofBatch,
    total_price: u64,
) -> InstructionSet {
    let settings = &snapshot.settings;
    let mut instructions = InstructionSet::new();

    instructions
        .push(Instruction::RequireSigner {
            key_hash: settings.allowed_minter.clone(),
        })
        .push(Instruction::Refer {
            position: snapshot.settings_position.clone(),
        })
        .push(Instruction::Spend {
            position: snapshot.commitment_position.clone(),
            redeemer: Redeemer::UpdateCommitment {
                proofs: proofs.clone(),
            },
        })
        .push(Instruction::Produce {
            address: snapshot.commitment_address.clone(),
            value: snapshot.commitment_value.clone(),
            datum: Datum::Commitment(new_commitment.clone()),
        });

    for order in orders {
        let asset_name = order.name().to_hex();
        instructions
            .push(Instruction::Spend {
                position: order.position.clone(),
                redeemer: Redeemer::ExecuteOrder,
            })
            .push(Instruction::Mint {
                policy_id: settings.policy_id.clone(),
                asset_name: asset_name.clone(),
                quantity: 1,
                redeemer: Redeemer::MintItems,
            })
            .push(Instruction::Produce {
                address: order.datum.destination_address.clone(),
                value: Value::default().with_asset(&settings.policy_id, &asset_name, 1),
                datum: Datum::Raw(order.asset_datum.clone()),
            });
    }

    instructions
        .push(Instruction::Mint {
            policy_id: settings.order_policy_id.clone(),
            asset_name: hex::encode(ORDER_TOKEN_NAME),
            quantity: -(orders.len() as i64),
            redeemer: Redeemer::BurnOrders,
        })
        .push(Instruction::Produce {
            address: settings.payment_address.clone(),
            value: Value::lovelace(total_price),
            datum: Datum::Void,
        });

    instructions
}
