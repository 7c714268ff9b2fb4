//! Hash primitives of the sparse Merkle index (blake3, domain separated).

use crate::types::Key32;

pub type Hash = [u8; 32];

/// Hash of an empty subtree, at every height.
pub const EMPTY: Hash = [0u8; 32];

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

/// Position of a key in the tree: blake3(key).
#[inline]
pub fn key_path(key: &[u8]) -> Key32 {
    *blake3::hash(key).as_bytes()
}

#[inline]
pub fn value_hash(value: &[u8]) -> Hash {
    *blake3::hash(value).as_bytes()
}

/// leaf = H(0x00 || path || H(value))
#[inline]
pub fn leaf_hash(path: &Key32, value: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_TAG]);
    hasher.update(path);
    hasher.update(&value_hash(value));
    *hasher.finalize().as_bytes()
}

/// node = H(0x01 || left || right); two empty children collapse to empty.
#[inline]
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    if left == &EMPTY && right == &EMPTY {
        return EMPTY;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_TAG]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Bit of `path` at `depth`, most significant bit first.
#[inline]
pub fn bit_at(path: &Key32, depth: usize) -> bool {
    let byte = path[depth / 8];
    let bit = 7 - (depth % 8);
    ((byte >> bit) & 1) == 1
}
