//! Config-bound front end over the tree operations, including variants that
//! take digests as hex text straight from a request body.

use crate::{
    config::{PairEncoding, ProofOrder, TreeConfig},
    error::Error,
    hash::{parse_digests, DigestProvider, MerkleHash},
    tree::{reduce_with, verify_proof_ordered, MerkleProof, MerkleTree},
};
use sha2::Sha256;
use std::marker::PhantomData;
use tracing::debug;

/// Tree operations bound to a digest provider and a [`TreeConfig`]
#[derive(Debug, Clone)]
pub struct MerkleEngine<HF: DigestProvider = Sha256> {
    _hasher: PhantomData<fn() -> HF>,
    config: TreeConfig,
}

impl<HF: DigestProvider> Default for MerkleEngine<HF> {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl<HF: DigestProvider> MerkleEngine<HF> {
    /// Bind the operations to `config`
    pub fn new(config: TreeConfig) -> Self {
        Self {
            _hasher: PhantomData,
            config,
        }
    }

    /// The configuration this engine was built with
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// How two child digests are fed to the hash function
    pub fn pair_encoding(&self) -> PairEncoding {
        self.config.pair_encoding
    }

    /// Concatenation order used when verifying proofs
    pub fn proof_order(&self) -> ProofOrder {
        self.config.proof_order
    }

    /// Build a tree with every level retained under the configured encoding
    pub fn build_tree(&self, leaves: &[MerkleHash]) -> Result<MerkleTree<HF>, Error> {
        MerkleTree::build_with(self.config.pair_encoding, leaves)
    }

    /// Fold `leaves` into their Merkle Root; fails on an empty sequence
    pub fn reduce(&self, leaves: &[MerkleHash]) -> Result<MerkleHash, Error> {
        reduce_with::<HF>(self.config.pair_encoding, leaves)
    }

    /// Merkle Proof for the leaf at `leaf_index`
    pub fn generate_proof(
        &self,
        leaves: &[MerkleHash],
        leaf_index: usize,
    ) -> Result<MerkleProof, Error> {
        self.build_tree(leaves)?.proof(leaf_index)
    }

    /// Recompute the root of `leaves` and compare; any failure reads as `false`
    pub fn verify_root(&self, leaves: &[MerkleHash], expected_root: &MerkleHash) -> bool {
        match self.reduce(leaves) {
            Ok(root) => &root == expected_root,
            Err(e) => {
                debug!("root verification not attempted: {e}");
                false
            }
        }
    }

    /// Verify under the configured proof order. With
    /// [`ProofOrder::LeftBiased`] the proof's leaf index is ignored.
    pub fn verify_proof(
        &self,
        leaf: &MerkleHash,
        proof: &MerkleProof,
        expected_root: &MerkleHash,
    ) -> bool {
        verify_proof_ordered::<HF>(
            self.config.pair_encoding,
            self.config.proof_order,
            leaf,
            proof,
            expected_root,
        )
    }

    /// [`Self::reduce`] over hex text, rejecting malformed digests
    pub fn reduce_text<S: AsRef<str>>(&self, leaves: &[S]) -> Result<MerkleHash, Error> {
        self.reduce(&parse_digests(leaves)?)
    }

    /// [`Self::generate_proof`] over hex text, rejecting malformed digests
    pub fn generate_proof_text<S: AsRef<str>>(
        &self,
        leaves: &[S],
        leaf_index: usize,
    ) -> Result<MerkleProof, Error> {
        self.generate_proof(&parse_digests(leaves)?, leaf_index)
    }

    /// Malformed leaves or root read as `false`
    pub fn verify_root_text<S: AsRef<str>>(&self, leaves: &[S], expected_root: &str) -> bool {
        match (parse_digests(leaves), MerkleHash::from_hex(expected_root)) {
            (Ok(leaves), Ok(root)) => self.verify_root(&leaves, &root),
            (Err(e), _) | (_, Err(e)) => {
                debug!("root verification not attempted: {e}");
                false
            }
        }
    }

    /// Malformed leaf, siblings or root read as `false`
    pub fn verify_proof_text<S: AsRef<str>>(
        &self,
        leaf: &str,
        leaf_index: usize,
        siblings: &[S],
        expected_root: &str,
    ) -> bool {
        let parsed = MerkleHash::from_hex(leaf).and_then(|leaf| {
            let siblings = parse_digests(siblings)?;
            let root = MerkleHash::from_hex(expected_root)?;
            Ok((leaf, MerkleProof::new(leaf_index, siblings), root))
        });
        match parsed {
            Ok((leaf, proof, root)) => self.verify_proof(&leaf, &proof, &root),
            Err(e) => {
                debug!("proof verification not attempted: {e}");
                false
            }
        }
    }
}
