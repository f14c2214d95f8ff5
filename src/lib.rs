//! Binary Merkle tree engine
//!
//! Folds an ordered sequence of leaf digests into a root, and produces and
//! checks inclusion proofs for individual leaves. Everything here is a pure
//! function of its arguments.

mod commitment;
mod config;
mod engine;
mod error;
mod hash;
mod tree;

pub use crate::{
    commitment::Commitment,
    config::{PairEncoding, ProofOrder, TreeConfig, ENV_PREFIX},
    engine::MerkleEngine,
    error::Error,
    hash::{
        digest, hash_node, hash_string, is_valid_digest_text, parse_digests, DigestProvider,
        MerkleHash, DIGEST_HEX_LEN, DIGEST_LEN,
    },
    tree::{
        compute_left_biased_root, generate_proof, get_parent_index, reduce, reduce_with,
        sibling_index, tree_depth, verify_proof, verify_proof_left_biased, verify_root,
        MerkleProof, MerkleTree,
    },
};
