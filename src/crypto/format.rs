use serde::Serialize;

use super::hasher::value_hash;
use super::proof::MembershipProof;
use crate::types::display_key;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofNodeJson {
    pub depth: u16,
    pub direction: String, // "left" | "right"
    pub sibling: String,   // 0x...
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipProofJson {
    pub root: String,
    pub key: String,
    pub name: String,
    /// `None` for a proof of absence.
    pub value_hash: Option<String>,
    pub proof: Vec<ProofNodeJson>,
}

pub fn to_0x_hex(bytes: &[u8]) -> String {
    let mut s = String::from("0x");
    s.push_str(&hex::encode(bytes));
    s
}

/// Render a proof for people and explorers rather than validators.
pub fn proof_to_json(root: &[u8; 32], proof: &MembershipProof) -> MembershipProofJson {
    MembershipProofJson {
        root: to_0x_hex(root),
        key: to_0x_hex(&proof.key),
        name: display_key(&proof.key).into_owned(),
        value_hash: proof.value.as_deref().map(|v| to_0x_hex(&value_hash(v))),
        proof: proof
            .nodes
            .iter()
            .map(|node| ProofNodeJson {
                depth: node.depth,
                direction: if node.is_left {
                    "left".into()
                } else {
                    "right".into()
                },
                sibling: to_0x_hex(&node.sibling),
            })
            .collect(),
    }
}
