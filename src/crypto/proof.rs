use serde::{Deserialize, Serialize};

use super::hasher::{bit_at, key_path, leaf_hash, node_hash, Hash, EMPTY};
use super::sparse_merkle::TREE_DEPTH;
use crate::types::{hex_bytes, hex_digest, hex_option, Digest};

/// A non-empty sibling on the path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Depth of the sibling node (1..=256).
    pub depth: u16,
    /// True when the sibling sits on the left, i.e. the path bit is 1.
    pub is_left: bool,
    #[serde(with = "hex_digest")]
    pub sibling: Hash,
}

/// Proof that `key` holds `value` (or nothing, when `value` is `None`)
/// under some root digest.
///
/// Siblings that are empty subtrees are omitted; `nodes` is ordered from
/// the leaf level up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "hex_option")]
    pub value: Option<Vec<u8>>,
    pub nodes: Vec<ProofNode>,
}

impl MembershipProof {
    pub fn is_absence(&self) -> bool {
        self.value.is_none()
    }

    /// The same path with `value` stored at the leaf.
    ///
    /// Inserting a key only changes nodes on its own path, so the siblings
    /// of an absence proof also prove the key right after its insertion.
    pub fn with_value(&self, value: Vec<u8>) -> Self {
        Self {
            key: self.key.clone(),
            value: Some(value),
            nodes: self.nodes.clone(),
        }
    }

    /// Root implied by this proof, or `None` if the node list is malformed.
    pub fn computed_root(&self) -> Option<Digest> {
        let path = key_path(&self.key);
        let mut current = match &self.value {
            Some(value) => leaf_hash(&path, value),
            None => EMPTY,
        };

        let mut nodes = self.nodes.iter().peekable();
        for depth in (1..=TREE_DEPTH).rev() {
            let bit = bit_at(&path, depth - 1);
            let sibling = match nodes.next_if(|n| usize::from(n.depth) == depth) {
                Some(node) if node.is_left != bit => return None,
                Some(node) => node.sibling,
                None => EMPTY,
            };
            current = if bit {
                node_hash(&sibling, &current)
            } else {
                node_hash(&current, &sibling)
            };
        }

        // Leftovers mean duplicated, unordered or out-of-range depths.
        if nodes.next().is_some() {
            return None;
        }
        Some(current)
    }

    pub fn verify(&self, root: &Digest) -> bool {
        self.computed_root().is_some_and(|r| &r == root)
    }

    pub fn verify_absence(&self, root: &Digest) -> bool {
        self.is_absence() && self.verify(root)
    }

    pub fn verify_inclusion(&self, root: &Digest, value: &[u8]) -> bool {
        self.value.as_deref() == Some(value) && self.verify(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sparse_merkle::SparseMerkleTree;

    fn tree_with(keys: &[&str]) -> SparseMerkleTree {
        let mut tree = SparseMerkleTree::new();
        for key in keys {
            let path = key_path(key.as_bytes());
            tree.upsert(&path, leaf_hash(&path, key.as_bytes()));
        }
        tree
    }

    #[test]
    fn test_every_sibling_is_consumed() {
        let keys = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let tree = tree_with(&keys);
        let proof = MembershipProof {
            key: b"a".to_vec(),
            value: Some(b"a".to_vec()),
            nodes: tree.siblings(&key_path(b"a")),
        };
        assert!(proof.nodes.len() > 1);
        assert_eq!(proof.computed_root(), Some(tree.root()));

        // Leaf-up ordering is required.
        let mut reversed = proof.clone();
        reversed.nodes.reverse();
        assert_eq!(reversed.computed_root(), None);

        // A dropped sibling yields a different, but well-formed, root.
        let mut short = proof.clone();
        short.nodes.pop();
        assert_ne!(short.computed_root(), Some(tree.root()));
        assert!(short.computed_root().is_some());
    }
}
