//! Abstract ledger operations handed to the transaction builder.

use serde::{Deserialize, Serialize};

use crate::commitment::CommitmentRecord;
use crate::orders::OrderDatum;
use crate::types::{hex_bytes, PositionRef, ProofBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub policy_id: String,
    /// Hex-encoded asset name.
    pub asset_name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub lovelace: u64,
    #[serde(default)]
    pub assets: Vec<AssetAmount>,
}

impl Value {
    pub fn lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, policy_id: &str, asset_name: &str, quantity: i64) -> Self {
        self.assets.push(AssetAmount {
            policy_id: policy_id.to_string(),
            asset_name: asset_name.to_string(),
            quantity,
        });
        self
    }
}

/// Data attached to a produced position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Datum {
    Commitment(CommitmentRecord),
    Order(OrderDatum),
    /// Opaque datum bytes, e.g. the metadata a minted item carries.
    Raw(#[serde(with = "hex_bytes")] Vec<u8>),
    Void,
}

/// Argument passed to the script guarding a spend or a mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Redeemer {
    /// Advance the commitment; the proofs justify every inserted name.
    UpdateCommitment { proofs: ProofBatch },
    /// Mint the named items of a batch.
    MintItems,
    /// Mint order tokens for new orders.
    RequestOrders { destination_addresses: Vec<String> },
    /// Burn the tokens of executed orders.
    BurnOrders,
    /// Burn the token of a cancelled order.
    CancelOrder,
    /// Spend an order as part of a mint.
    ExecuteOrder,
    /// Spend an order to return its payment.
    ReleaseOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Spend {
        position: PositionRef,
        redeemer: Redeemer,
    },
    Refer {
        position: PositionRef,
    },
    Produce {
        address: String,
        value: Value,
        datum: Datum,
    },
    Mint {
        policy_id: String,
        asset_name: String,
        quantity: i64,
        redeemer: Redeemer,
    },
    RequireSigner {
        key_hash: String,
    },
}

/// Ordered instructions for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionSet {
    instructions: Vec<Instruction>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn spent_positions(&self) -> Vec<&PositionRef> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Spend { position, .. } => Some(position),
                _ => None,
            })
            .collect()
    }

    /// Net quantity minted (negative when burned) of `policy_id`.
    pub fn minted_under(&self, policy_id: &str) -> i64 {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Mint {
                    policy_id: p,
                    quantity,
                    ..
                } if p == policy_id => Some(*quantity),
                _ => None,
            })
            .sum()
    }

    /// Lovelace produced at `address` across all outputs.
    pub fn paid_to(&self, address: &str) -> u64 {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Produce {
                    address: a, value, ..
                } if a == address => Some(value.lovelace),
                _ => None,
            })
            .sum()
    }

    pub fn required_signers(&self) -> Vec<&str> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::RequireSigner { key_hash } => Some(key_hash.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Proofs carried by the commitment update, if any.
    pub fn proof_batch(&self) -> Option<&ProofBatch> {
        self.instructions.iter().find_map(|i| match i {
            Instruction::Spend {
                redeemer: Redeemer::UpdateCommitment { proofs },
                ..
            } => Some(proofs),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a InstructionSet {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
