//! Merkle Tree, Merkle Proof and the stateless operations over leaf sequences.
//!
//! Every level is folded left to right in pairs. A lone trailing node is
//! paired with itself, so the parent of `[.., c]` is `H(c || c)` rather than
//! `c` promoted unchanged. Roots and proofs issued by any earlier deployment
//! depend on this rule.

use crate::{
    config::{PairEncoding, ProofOrder},
    error::Error,
    hash::{hash_node, DigestProvider, MerkleHash},
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Merkle Proof for an individual leaf
///
/// `siblings[k]` is the other member of the pair the path passes through at
/// level `k`. The side the path takes at level `k` is bit `k` of `leaf_index`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    /// Position of the proven leaf in the leaf sequence
    pub(crate) leaf_index: usize,
    /// Sibling digests ordered from the leaf level up to just below the root
    pub(crate) siblings: Vec<MerkleHash>,
}

impl MerkleProof {
    /// Rebuild a proof from stored values
    pub fn new(leaf_index: usize, siblings: Vec<MerkleHash>) -> Self {
        Self {
            leaf_index,
            siblings,
        }
    }

    /// Position of the proven leaf in the leaf sequence
    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    /// The flat sibling sequence, the form a proof takes when stored
    pub fn siblings(&self) -> &[MerkleHash] {
        &self.siblings
    }

    /// Consume the proof, keeping only the flat sibling sequence
    pub fn into_siblings(self) -> Vec<MerkleHash> {
        self.siblings
    }

    /// Number of levels between the leaf and the root
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// True for the proof of a single leaf tree, whose root is the leaf itself
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Compute the implied Merkle Root of `leaf` from the recorded path,
    /// placing the running hash on whichever side the leaf index dictates.
    ///
    /// Returns `None` when the leaf index cannot belong to a tree of this depth.
    /// The index is only checked against the proof's depth, not against the
    /// leaf count: in a 3 leaf tree the self-paired last leaf also verifies
    /// when it claims index 3. Callers that need the index bound must pin the
    /// leaf count themselves.
    pub fn compute_implied_root<HF: DigestProvider>(
        &self,
        encoding: PairEncoding,
        leaf: &MerkleHash,
    ) -> Option<MerkleHash> {
        if self.leaf_index.checked_shr(self.depth() as u32).unwrap_or(0) != 0 {
            return None;
        }
        let mut index = self.leaf_index;
        let mut last_hash = *leaf;
        for sibling in &self.siblings {
            last_hash = if index & 1 == 1 {
                hash_node::<HF>(encoding, sibling, &last_hash)
            } else {
                hash_node::<HF>(encoding, &last_hash, sibling)
            };
            index >>= 1;
        }
        Some(last_hash)
    }
}

/// Fold a sibling path onto `leaf` with the running hash always on the left.
pub fn compute_left_biased_root<HF: DigestProvider>(
    encoding: PairEncoding,
    leaf: &MerkleHash,
    siblings: &[MerkleHash],
) -> MerkleHash {
    siblings
        .iter()
        .fold(*leaf, |current, sibling| hash_node::<HF>(encoding, &current, sibling))
}

/// Merkle Tree with every level retained, so many proofs can be cut from
/// one build. `levels[0]` is the leaf sequence, the last level is the root.
#[derive(Debug, Clone)]
pub struct MerkleTree<HF: DigestProvider = Sha256> {
    _hasher: PhantomData<HF>,
    pub(crate) encoding: PairEncoding,
    pub(crate) levels: Vec<Vec<MerkleHash>>,
}

impl<HF: DigestProvider> MerkleTree<HF> {
    /// Build a tree over `leaves` with raw pair encoding
    pub fn build(leaves: &[MerkleHash]) -> Result<Self, Error> {
        Self::build_with(PairEncoding::Raw, leaves)
    }

    /// Build a tree over `leaves` with the given pair encoding
    pub fn build_with(encoding: PairEncoding, leaves: &[MerkleHash]) -> Result<Self, Error> {
        if leaves.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut levels = vec![leaves.to_vec()];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next = next_level::<HF>(encoding, level);
            trace!(level = levels.len(), width = next.len(), "built tree level");
            levels.push(next);
        }
        debug!(leaves = leaves.len(), depth = levels.len() - 1, "built merkle tree");
        Ok(Self {
            _hasher: PhantomData,
            encoding,
            levels,
        })
    }

    /// Get the merkle root of the tree
    pub fn root(&self) -> &MerkleHash {
        // build_with never produces an empty tree
        &self.levels[self.levels.len() - 1][0]
    }

    /// Get the number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The leaf sequence the tree was built from
    pub fn leaves(&self) -> &[MerkleHash] {
        &self.levels[0]
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Every level from the leaves up to the root
    pub fn levels(&self) -> &[Vec<MerkleHash>] {
        &self.levels
    }

    /// Pair encoding the internal nodes were hashed with
    pub fn encoding(&self) -> PairEncoding {
        self.encoding
    }

    /// Calculate a Merkle Proof for the leaf at `leaf_index`
    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof, Error> {
        self.leaf_exists(leaf_index)?;
        let mut index = leaf_index;
        let mut siblings = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.depth()] {
            siblings.push(level[sibling_index(index, level.len())]);
            index = get_parent_index(index);
        }
        Ok(MerkleProof::new(leaf_index, siblings))
    }

    /// Ensure the leaf is a member of the tree
    fn leaf_exists(&self, leaf_index: usize) -> Result<(), Error> {
        if leaf_index >= self.leaf_count() {
            return Err(Error::IndexOutOfRange(leaf_index, self.leaf_count()));
        }
        Ok(())
    }
}

/// Hash one level into the next, pairing a trailing odd node with itself
pub(crate) fn next_level<HF: DigestProvider>(
    encoding: PairEncoding,
    level: &[MerkleHash],
) -> Vec<MerkleHash> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_node::<HF>(encoding, left, right)
        })
        .collect()
}

/// Fold a leaf sequence down to its root without retaining the levels
pub fn reduce_with<HF: DigestProvider>(
    encoding: PairEncoding,
    leaves: &[MerkleHash],
) -> Result<MerkleHash, Error> {
    if leaves.is_empty() {
        return Err(Error::EmptyInput);
    }
    debug!(leaves = leaves.len(), %encoding, "reducing leaf sequence");
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level::<HF>(encoding, &level);
        trace!(width = level.len(), "reduced level");
    }
    Ok(level[0])
}

/// Compute the SHA-256 Merkle Root of `leaves`
pub fn reduce(leaves: &[MerkleHash]) -> Result<MerkleHash, Error> {
    reduce_with::<Sha256>(PairEncoding::Raw, leaves)
}

/// Generate the SHA-256 Merkle Proof for the leaf at `leaf_index`
pub fn generate_proof(leaves: &[MerkleHash], leaf_index: usize) -> Result<MerkleProof, Error> {
    MerkleTree::<Sha256>::build(leaves)?.proof(leaf_index)
}

/// Recompute the root of `leaves` and compare it to `expected_root`.
/// Any failure, including an empty sequence, reads as `false`.
pub fn verify_root(leaves: &[MerkleHash], expected_root: &MerkleHash) -> bool {
    match reduce(leaves) {
        Ok(root) => &root == expected_root,
        Err(e) => {
            debug!("root verification not attempted: {e}");
            false
        }
    }
}

/// Check that `leaf` folds up to `expected_root` along `proof`
pub fn verify_proof(leaf: &MerkleHash, proof: &MerkleProof, expected_root: &MerkleHash) -> bool {
    match proof.compute_implied_root::<Sha256>(PairEncoding::Raw, leaf) {
        Some(root) => &root == expected_root,
        None => {
            debug!(
                leaf_index = proof.leaf_index,
                depth = proof.depth(),
                "proof leaf index does not fit its depth"
            );
            false
        }
    }
}

/// Check a bare sibling list with the running hash always on the left.
///
/// This accepts proofs issued before positions were tracked, and only
/// succeeds for leaves that sit on the left at every level.
pub fn verify_proof_left_biased(
    leaf: &MerkleHash,
    siblings: &[MerkleHash],
    expected_root: &MerkleHash,
) -> bool {
    &compute_left_biased_root::<Sha256>(PairEncoding::Raw, leaf, siblings) == expected_root
}

/// Verify `proof` under the given order
pub(crate) fn verify_proof_ordered<HF: DigestProvider>(
    encoding: PairEncoding,
    order: ProofOrder,
    leaf: &MerkleHash,
    proof: &MerkleProof,
    expected_root: &MerkleHash,
) -> bool {
    let implied = match order {
        ProofOrder::Positional => proof.compute_implied_root::<HF>(encoding, leaf),
        ProofOrder::LeftBiased => Some(compute_left_biased_root::<HF>(
            encoding,
            leaf,
            proof.siblings(),
        )),
    };
    implied.map_or(false, |root| &root == expected_root)
}

/// Depth of a tree over `leaf_count` leaves: ceil(log2(n)), 0 for a single leaf
pub fn tree_depth(leaf_count: usize) -> usize {
    match leaf_count {
        0 | 1 => 0,
        n => (usize::BITS - (n - 1).leading_zeros()) as usize,
    }
}

/// Get a node's parent index given it's own index within its level
pub fn get_parent_index(node_index: usize) -> usize {
    node_index >> 1
}

/// Index of the node paired with `node_index` in a level of `level_len`
/// nodes. A trailing odd node is its own sibling.
pub fn sibling_index(node_index: usize, level_len: usize) -> usize {
    let sibling = node_index ^ 1;
    if sibling < level_len {
        sibling
    } else {
        node_index
    }
}
