//! Ledger-published records: the index commitment and protocol settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{hex_bytes, hex_digest, Digest};

/// Current layout version of [`CommitmentRecord::to_bytes`].
pub const COMMITMENT_VERSION: u8 = 1;

const ROOT_LEN: usize = 32;

/// Failures encoding or decoding a [`CommitmentRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentCodecError {
    #[error("encoded commitment is empty")]
    Empty,

    #[error("unsupported commitment version {0}")]
    UnsupportedVersion(u8),

    #[error("commitment must carry at least the root field")]
    MissingRoot,

    #[error("truncated commitment: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("{0} trailing bytes after commitment")]
    TrailingBytes(usize),

    #[error("too many auxiliary fields: {0}")]
    TooManyFields(usize),
}

/// An opaque protocol field carried next to the root (policy ids, script
/// hashes). Never interpreted, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxField(#[serde(with = "hex_bytes")] pub Vec<u8>);

/// The on-ledger statement "the authenticated index has this root".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    #[serde(with = "hex_digest")]
    pub root: Digest,
    #[serde(default)]
    pub aux: Vec<AuxField>,
}

impl CommitmentRecord {
    pub fn new(root: Digest, aux: Vec<AuxField>) -> Self {
        Self { root, aux }
    }

    /// Successor record: same auxiliary fields, new root.
    pub fn with_root(&self, root: Digest) -> Self {
        Self {
            root,
            aux: self.aux.clone(),
        }
    }

    pub fn root_hex(&self) -> String {
        hex::encode(self.root)
    }

    /// Fixed-arity encoding:
    /// `version || field_count || root(32) || (len_be32 || bytes)*`.
    ///
    /// The root sits at a fixed offset, so two records differing only in
    /// their root differ only in bytes `2..34`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CommitmentCodecError> {
        let field_count = self.aux.len() + 1;
        let field_count = u8::try_from(field_count)
            .map_err(|_| CommitmentCodecError::TooManyFields(field_count))?;

        let aux_len: usize = self.aux.iter().map(|f| 4 + f.0.len()).sum();
        let mut out = Vec::with_capacity(2 + ROOT_LEN + aux_len);
        out.push(COMMITMENT_VERSION);
        out.push(field_count);
        out.extend_from_slice(&self.root);
        for field in &self.aux {
            out.extend_from_slice(&(field.0.len() as u32).to_be_bytes());
            out.extend_from_slice(&field.0);
        }
        Ok(out)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, CommitmentCodecError> {
        let (&version, rest) = raw.split_first().ok_or(CommitmentCodecError::Empty)?;
        if version != COMMITMENT_VERSION {
            return Err(CommitmentCodecError::UnsupportedVersion(version));
        }
        let (&field_count, _) = rest.split_first().ok_or(CommitmentCodecError::Truncated {
            offset: 1,
            needed: 1,
        })?;
        if field_count == 0 {
            return Err(CommitmentCodecError::MissingRoot);
        }

        let mut offset = 2;
        let root: Digest = take(raw, &mut offset, ROOT_LEN)?
            .try_into()
            .map_err(|_| CommitmentCodecError::Truncated {
                offset: 2,
                needed: ROOT_LEN,
            })?;

        let mut aux = Vec::with_capacity(usize::from(field_count) - 1);
        for _ in 1..field_count {
            let len_bytes = take(raw, &mut offset, 4)?;
            let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
            aux.push(AuxField(take(raw, &mut offset, len as usize)?.to_vec()));
        }

        if offset != raw.len() {
            return Err(CommitmentCodecError::TrailingBytes(raw.len() - offset));
        }
        Ok(Self { root, aux })
    }
}

fn take<'a>(
    raw: &'a [u8],
    offset: &mut usize,
    len: usize,
) -> Result<&'a [u8], CommitmentCodecError> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= raw.len())
        .ok_or(CommitmentCodecError::Truncated {
            offset: *offset,
            needed: len,
        })?;
    let out = &raw[*offset..end];
    *offset = end;
    Ok(out)
}

/// Protocol settings published on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Policy under which named items are minted.
    pub policy_id: String,
    /// Key hash whose signature every mint requires.
    pub allowed_minter: String,
    /// Price of one name, in the ledger's base unit.
    pub unit_price: u64,
    /// Receives the total price of each mint.
    pub payment_address: String,
    /// Script address where orders are locked.
    pub order_script_address: String,
    /// Policy of the per-order tokens.
    pub order_policy_id: String,
    /// Script guarding the commitment-holding position.
    pub commitment_script_hash: String,
}
