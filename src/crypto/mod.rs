pub mod format;
pub mod hasher;
pub mod proof;
pub mod sparse_merkle;

pub use format::{proof_to_json, to_0x_hex, MembershipProofJson};
pub use proof::{MembershipProof, ProofNode};
pub use sparse_merkle::{SparseMerkleTree, TREE_DEPTH};
