//! Commitment over the files submitted in one upload.
//!
//! A single file commits to its own digest. A batch commits to the root of
//! all its digests, with a proof for the named file when it is part of the
//! batch. Storing the result is left to the caller.

use crate::{
    engine::MerkleEngine,
    error::Error,
    hash::{parse_digests, DigestProvider, MerkleHash},
    tree::MerkleProof,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub merkle_root: MerkleHash,
    pub file_count: usize,
    /// Flat sibling list for the named file, empty when it is not in the batch
    pub merkle_proof: Vec<MerkleHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<usize>,
}

impl Commitment {
    /// Build with the default SHA-256, raw-encoded engine
    pub fn build<S: AsRef<str>>(file_hash: &str, file_hashes: &[S]) -> Result<Self, Error> {
        MerkleEngine::<Sha256>::default().commit(file_hash, file_hashes)
    }

    /// The proof for the named file, if one was produced
    pub fn proof(&self) -> Option<MerkleProof> {
        self.leaf_index
            .map(|index| MerkleProof::new(index, self.merkle_proof.clone()))
    }
}

impl<HF: DigestProvider> MerkleEngine<HF> {
    /// Commit to `file_hash`, alone or as a member of `file_hashes`.
    ///
    /// Every digest in `file_hashes` is validated before any hashing. The
    /// proof is cut for the first occurrence of `file_hash` in the batch.
    pub fn commit<S: AsRef<str>>(
        &self,
        file_hash: &str,
        file_hashes: &[S],
    ) -> Result<Commitment, Error> {
        if file_hashes.is_empty() {
            return Ok(Commitment {
                merkle_root: MerkleHash::from_hex(file_hash)?,
                file_count: 1,
                merkle_proof: Vec::new(),
                leaf_index: None,
            });
        }

        let leaves = parse_digests(file_hashes)?;
        let tree = self.build_tree(&leaves)?;
        let leaf_index = file_hashes.iter().position(|h| h.as_ref() == file_hash);
        let merkle_proof = match leaf_index {
            Some(index) => tree.proof(index)?.into_siblings(),
            None => {
                debug!(files = leaves.len(), "committed file is not part of the batch");
                Vec::new()
            }
        };

        Ok(Commitment {
            merkle_root: *tree.root(),
            file_count: leaves.len(),
            merkle_proof,
            leaf_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TreeConfig,
        test_utils::file_leaves,
        tree::{reduce, verify_proof},
    };

    fn batch(n: usize) -> Vec<String> {
        file_leaves(n).iter().map(MerkleHash::to_hex).collect()
    }

    #[test]
    fn test_single_file_commits_to_itself() {
        let hashes = batch(1);
        let commitment = Commitment::build::<String>(&hashes[0], &[]).unwrap();
        assert_eq!(commitment.merkle_root.to_hex(), hashes[0]);
        assert_eq!(commitment.file_count, 1);
        assert!(commitment.merkle_proof.is_empty());
        assert_eq!(commitment.proof(), None);
    }

    #[test]
    fn test_single_file_must_be_valid_digest() {
        assert_eq!(
            Commitment::build::<String>("not-a-hash", &[]),
            Err(Error::InvalidDigestFormat("not-a-hash".to_owned()))
        );
    }

    #[test]
    fn test_batch_commitment_proves_named_file() {
        let hashes = batch(5);
        let leaves = file_leaves(5);
        let commitment = Commitment::build(&hashes[3], &hashes).unwrap();
        assert_eq!(commitment.merkle_root, reduce(&leaves).unwrap());
        assert_eq!(commitment.file_count, 5);
        assert_eq!(commitment.leaf_index, Some(3));

        let proof = commitment.proof().unwrap();
        assert!(verify_proof(&leaves[3], &proof, &commitment.merkle_root));
    }

    #[test]
    fn test_batch_without_named_file_has_empty_proof() {
        let hashes = batch(4);
        let outsider = file_leaves(5)[4].to_hex();
        let commitment = Commitment::build(&outsider, &hashes).unwrap();
        assert_eq!(commitment.file_count, 4);
        assert!(commitment.merkle_proof.is_empty());
        assert_eq!(commitment.leaf_index, None);
    }

    #[test]
    fn test_batch_rejects_malformed_member() {
        let mut hashes = batch(3);
        hashes[2] = hashes[2].to_uppercase();
        assert_eq!(
            Commitment::build(&hashes[0], &hashes),
            Err(Error::InvalidDigestFormat(hashes[2].clone()))
        );
    }

    #[test]
    fn test_duplicate_member_uses_first_occurrence() {
        let mut hashes = batch(4);
        hashes[3] = hashes[1].clone();
        let commitment = Commitment::build(&hashes[1], &hashes).unwrap();
        assert_eq!(commitment.leaf_index, Some(1));
    }

    #[test]
    fn test_legacy_commitment_root() {
        let engine = MerkleEngine::<Sha256>::new(TreeConfig::legacy());
        let hashes = batch(3);
        let commitment = engine.commit(&hashes[0], &hashes).unwrap();
        assert_eq!(
            commitment.merkle_root.to_hex(),
            "0a75c57d690d637366bbf3706259f0393dbed6c86eab9e53a56b30062eebd283"
        );
        assert!(engine.verify_proof(
            &file_leaves(3)[0],
            &commitment.proof().unwrap(),
            &commitment.merkle_root
        ));
    }

    #[test]
    fn test_serializes_record_fields() {
        let hashes = batch(2);
        let commitment = Commitment::build(&hashes[1], &hashes).unwrap();
        let json = serde_json::to_value(&commitment).unwrap();
        assert_eq!(json["fileCount"], 2);
        assert_eq!(json["merkleRoot"], commitment.merkle_root.to_hex());
        assert_eq!(json["merkleProof"][0], hashes[0]);
        assert_eq!(json["leafIndex"], 1);
    }
}
