use std::collections::HashMap;

use super::hasher::{bit_at, node_hash, Hash, EMPTY};
use super::proof::ProofNode;
use crate::types::Key32;

/// Depth of the tree; one level per bit of a 32-byte path.
pub const TREE_DEPTH: usize = 256;

/// Address of a node: its depth (0 = root, 256 = leaf) and the path prefix
/// leading to it, with every bit past `depth` cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId {
    depth: u16,
    prefix: Key32,
}

impl NodeId {
    fn root() -> Self {
        Self {
            depth: 0,
            prefix: [0u8; 32],
        }
    }

    fn leaf(path: &Key32) -> Self {
        Self {
            depth: TREE_DEPTH as u16,
            prefix: *path,
        }
    }

    fn on_path(path: &Key32, depth: usize) -> Self {
        Self {
            depth: depth as u16,
            prefix: prefix_of(path, depth),
        }
    }

    /// The other child of the node at `depth - 1` on `path`.
    fn sibling(path: &Key32, depth: usize) -> Self {
        let mut prefix = prefix_of(path, depth);
        let bit = depth - 1;
        prefix[bit / 8] ^= 1 << (7 - (bit % 8));
        Self {
            depth: depth as u16,
            prefix,
        }
    }
}

fn prefix_of(path: &Key32, depth: usize) -> Key32 {
    let mut out = [0u8; 32];
    let full = depth / 8;
    out[..full].copy_from_slice(&path[..full]);
    if depth % 8 != 0 {
        let mask = 0xFFu8 << (8 - depth % 8);
        out[full] = path[full] & mask;
    }
    out
}

/// Journal of node writes made while a batch is open.
struct Journal {
    writes: Vec<(NodeId, Option<Hash>)>,
    leaves: usize,
}

/// Sparse Merkle tree over 256-bit paths.
///
/// Only non-empty nodes are stored, so a subtree without leaves costs
/// nothing. While a journal is open every node write records the value it
/// replaced; `rollback` replays those in reverse and cannot fail.
pub struct SparseMerkleTree {
    nodes: HashMap<NodeId, Hash>,
    leaves: usize,
    journal: Option<Journal>,
}

impl SparseMerkleTree {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            leaves: 0,
            journal: None,
        }
    }

    pub fn root(&self) -> Hash {
        self.node(&NodeId::root())
    }

    pub fn len(&self) -> usize {
        self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    pub fn contains(&self, path: &Key32) -> bool {
        self.nodes.contains_key(&NodeId::leaf(path))
    }

    pub fn leaf(&self, path: &Key32) -> Option<Hash> {
        self.nodes.get(&NodeId::leaf(path)).copied()
    }

    /// Set the leaf at `path`, recomputing every node up to the root.
    pub fn upsert(&mut self, path: &Key32, leaf: Hash) {
        if !self.contains(path) {
            self.leaves += 1;
        }
        self.set_leaf(path, leaf);
    }

    /// Clear the leaf at `path`. Returns false if it was already empty.
    pub fn remove(&mut self, path: &Key32) -> bool {
        if !self.contains(path) {
            return false;
        }
        self.leaves -= 1;
        self.set_leaf(path, EMPTY);
        true
    }

    /// Non-empty siblings along `path`, leaf level first.
    pub fn siblings(&self, path: &Key32) -> Vec<ProofNode> {
        let mut out = Vec::new();
        for depth in (1..=TREE_DEPTH).rev() {
            if let Some(sibling) = self.nodes.get(&NodeId::sibling(path, depth)) {
                out.push(ProofNode {
                    depth: depth as u16,
                    is_left: bit_at(path, depth - 1),
                    sibling: *sibling,
                });
            }
        }
        out
    }

    pub fn in_journal(&self) -> bool {
        self.journal.is_some()
    }

    /// Start recording node writes. Any journal already open is kept.
    pub fn begin(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Journal {
                writes: Vec::new(),
                leaves: self.leaves,
            });
        }
    }

    /// Keep every write made since `begin`.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every write made since `begin`, newest first.
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for (id, old) in journal.writes.into_iter().rev() {
            match old {
                Some(hash) => {
                    self.nodes.insert(id, hash);
                }
                None => {
                    self.nodes.remove(&id);
                }
            }
        }
        self.leaves = journal.leaves;
    }

    fn node(&self, id: &NodeId) -> Hash {
        self.nodes.get(id).copied().unwrap_or(EMPTY)
    }

    fn set_leaf(&mut self, path: &Key32, leaf: Hash) {
        let mut current = leaf;
        self.write(NodeId::leaf(path), current);
        for depth in (1..=TREE_DEPTH).rev() {
            let sibling = self.node(&NodeId::sibling(path, depth));
            current = if bit_at(path, depth - 1) {
                node_hash(&sibling, &current)
            } else {
                node_hash(&current, &sibling)
            };
            self.write(NodeId::on_path(path, depth - 1), current);
        }
    }

    fn write(&mut self, id: NodeId, hash: Hash) {
        let old = if hash == EMPTY {
            self.nodes.remove(&id)
        } else {
            self.nodes.insert(id, hash)
        };
        if let Some(journal) = self.journal.as_mut() {
            journal.writes.push((id, old));
        }
    }
}

impl Default for SparseMerkleTree {
    fn default() -> Self {
        Self::new()
    }
}
