use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::commitment::{CommitmentRecord, Settings};
use crate::crypto::proof::MembershipProof;
use crate::instructions::Value;
use crate::orders::OrderRecord;

/// Fixed-size types used across the system.
pub type Key32 = [u8; 32];
pub type Digest = [u8; 32];

/// Digest of an index holding no entries.
pub const EMPTY_DIGEST: Digest = [0u8; 32];

/// Parse a 32-byte digest from hex, with or without a `0x` prefix.
pub fn digest_from_hex(s: &str) -> anyhow::Result<Digest> {
    let raw = hex::decode(s.trim_start_matches("0x"))?;
    anyhow::ensure!(raw.len() == 32, "digest must be 32 bytes, got {}", raw.len());
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}

/// Human-readable form of an index key: UTF-8 when possible, hex otherwise.
pub fn display_key(key: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(key) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(format!("0x{}", hex::encode(key))),
    }
}

/// Reference to an output position on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionRef {
    /// Transaction id (hex).
    pub tx_id: String,
    /// Output index within the transaction.
    pub index: u32,
}

impl PositionRef {
    pub fn new(tx_id: impl Into<String>, index: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl fmt::Display for PositionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

/// A proof captured during a batch together with the request it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBatchEntry {
    /// Index key the proof is about.
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    /// Value inserted for the key right after the proof was taken.
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
    /// Absence proof against the digest preceding this insertion.
    pub proof: MembershipProof,
}

impl ProofBatchEntry {
    pub fn name(&self) -> Cow<'_, str> {
        display_key(&self.key)
    }
}

/// Ordered proofs of a batch, one per request, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofBatch {
    entries: Vec<ProofBatchEntry>,
}

impl ProofBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProofBatchEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ProofBatchEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProofBatchEntry> {
        self.entries.iter()
    }

    /// Replay the batch the way a validator holding only `start` would:
    /// each proof must attest absence against the running root, which then
    /// advances to the root with the entry's value inserted.
    ///
    /// Returns the final root, or `None` as soon as one proof fails.
    pub fn replay(&self, start: &Digest) -> Option<Digest> {
        let mut root = *start;
        for entry in &self.entries {
            if entry.proof.key != entry.key || !entry.proof.verify_absence(&root) {
                return None;
            }
            root = entry.proof.with_value(entry.value.clone()).computed_root()?;
        }
        Some(root)
    }
}

impl<'a> IntoIterator for &'a ProofBatch {
    type Item = &'a ProofBatchEntry;
    type IntoIter = std::slice::Iter<'a, ProofBatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Everything the minter reads from the ledger before a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Current commitment record.
    pub commitment: CommitmentRecord,
    /// Position holding the commitment record.
    pub commitment_position: PositionRef,
    /// Address of the commitment-holding position.
    pub commitment_address: String,
    /// Value locked with the commitment record; carried over unchanged.
    pub commitment_value: Value,
    /// Published protocol settings.
    pub settings: Settings,
    /// Position holding the settings (referenced, never spent).
    pub settings_position: PositionRef,
    /// Orders currently locked at the order script.
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

/// Serde adapter: `[u8; 32]` as a hex string.
pub mod hex_digest {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        super::digest_from_hex(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter: `Vec<u8>` as a hex string.
pub mod hex_bytes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)
    }
}

/// Serde adapter: `Option<Vec<u8>>` as a hex string or null.
pub mod hex_option {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&hex::encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        s.map(|s| hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom))
            .transpose()
    }
}
