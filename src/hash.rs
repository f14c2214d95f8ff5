//! Digest primitive and the hex text form digests take at the boundary

use crate::{config::PairEncoding, error::Error};
use blake2::Blake2s256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use std::{fmt, ops::Deref, str::FromStr};

/// Length of a digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Length of a digest rendered as hex text
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// A 32 byte digest. Leaves, internal nodes and roots all share this type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerkleHash(pub [u8; DIGEST_LEN]);

impl MerkleHash {
    /// Parse a digest from its canonical text form
    pub fn from_hex(text: &str) -> Result<Self, Error> {
        if !is_valid_digest_text(text) {
            return Err(Error::InvalidDigestFormat(text.to_owned()));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| Error::InvalidDigestFormat(text.to_owned()))?;
        Ok(MerkleHash(bytes))
    }

    /// Lowercase hex rendering, always 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Deref for MerkleHash {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for MerkleHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for MerkleHash {
    fn from(value: [u8; DIGEST_LEN]) -> Self {
        MerkleHash(value)
    }
}

impl PartialEq<[u8; DIGEST_LEN]> for MerkleHash {
    fn eq(&self, other: &[u8; DIGEST_LEN]) -> bool {
        &self.0 == other
    }
}

impl fmt::Display for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::LowerHex for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for MerkleHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MerkleHash::from_hex(s)
    }
}

impl Serialize for MerkleHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MerkleHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        MerkleHash::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Hash function used for every leaf and node in a tree.
///
/// A pair is hashed as the plain concatenation `left || right`, with no
/// separator, length prefix or domain tag. Reducer, proof generator and
/// verifier must all go through the same provider to agree on a root.
pub trait DigestProvider {
    /// Hash an arbitrary byte string
    fn hash_bytes(data: &[u8]) -> MerkleHash;

    /// Hash the concatenation of two byte strings
    fn hash_pair(left: &[u8], right: &[u8]) -> MerkleHash {
        Self::hash_bytes(&[left, right].concat())
    }
}

macro_rules! impl_digest_provider {
    ($($hasher:ty),+) => {
        $(
            impl DigestProvider for $hasher {
                fn hash_bytes(data: &[u8]) -> MerkleHash {
                    let mut hasher = <$hasher>::default();
                    let mut result = [0u8; DIGEST_LEN];

                    hasher.update(data);
                    result.copy_from_slice(hasher.finalize().as_slice());
                    MerkleHash(result)
                }

                fn hash_pair(left: &[u8], right: &[u8]) -> MerkleHash {
                    let mut hasher = <$hasher>::default();
                    let mut result = [0u8; DIGEST_LEN];

                    hasher.update(left);
                    hasher.update(right);
                    result.copy_from_slice(hasher.finalize().as_slice());
                    MerkleHash(result)
                }
            }
        )+
    };
}

impl_digest_provider!(Sha256, Sha3_256, Blake2s256);

/// Combine two child nodes into their parent under the given pair encoding.
pub fn hash_node<HF: DigestProvider>(
    encoding: PairEncoding,
    left: &MerkleHash,
    right: &MerkleHash,
) -> MerkleHash {
    match encoding {
        PairEncoding::Raw => HF::hash_pair(left, right),
        // Records issued before the raw encoding hashed the concatenated hex text
        PairEncoding::HexText => HF::hash_pair(left.to_hex().as_bytes(), right.to_hex().as_bytes()),
    }
}

/// SHA-256 of a byte string
pub fn digest(data: &[u8]) -> MerkleHash {
    Sha256::hash_bytes(data)
}

/// SHA-256 of the UTF-8 bytes of a string, e.g. to turn a file name into a leaf
pub fn hash_string(value: &str) -> MerkleHash {
    digest(value.as_bytes())
}

/// True iff `text` is exactly 64 characters from `[0-9a-f]`
pub fn is_valid_digest_text(text: &str) -> bool {
    text.len() == DIGEST_HEX_LEN
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Parse a list of hex digests, failing on the first malformed entry
pub fn parse_digests<S: AsRef<str>>(values: &[S]) -> Result<Vec<MerkleHash>, Error> {
    values.iter().map(|v| MerkleHash::from_hex(v.as_ref())).collect()
}
