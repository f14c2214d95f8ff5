//! Tree configuration
//!
//! Two knobs decide whether a root or proof interoperates with values that
//! were issued earlier: how a pair of child digests is encoded before
//! hashing, and in which order a proof walk concatenates the running hash
//! with each sibling.

use crate::error::Error;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Environment variable prefix, e.g. `MERKLE_PAIR_ENCODING=hex-text`
pub const ENV_PREFIX: &str = "MERKLE";

/// How two child digests are fed to the hash function
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairEncoding {
    /// `H(left_bytes || right_bytes)`
    #[default]
    Raw,
    /// `H(hex(left) ++ hex(right))`, the encoding of previously stored records
    HexText,
}

/// Concatenation order used while walking a proof
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofOrder {
    /// Running hash goes on the right whenever its position at that level is odd
    #[default]
    Positional,
    /// Running hash always goes on the left. Only sound for leaves whose
    /// position is even at every level, kept to accept previously issued proofs.
    LeftBiased,
}

/// Settings shared by every operation of an engine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// `MERKLE_PAIR_ENCODING`
    pub pair_encoding: PairEncoding,
    /// `MERKLE_PROOF_ORDER`
    pub proof_order: ProofOrder,
}

impl TreeConfig {
    /// Configuration matching roots and proofs already held in stored records
    pub fn legacy() -> Self {
        Self {
            pair_encoding: PairEncoding::HexText,
            proof_order: ProofOrder::LeftBiased,
        }
    }

    /// Load from a TOML/JSON/YAML file, then overlay `MERKLE_*` environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_builder(
            Config::builder()
                .add_source(File::from(path.as_ref()))
                .add_source(Environment::with_prefix(ENV_PREFIX)),
        )
    }

    /// Load from `MERKLE_*` environment variables only
    pub fn from_env() -> Result<Self, Error> {
        Self::from_builder(Config::builder().add_source(Environment::with_prefix(ENV_PREFIX)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Error> {
        builder
            .build()
            .map_err(|e| Error::Config(format!("failed to read configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| Error::Config(format!("failed to parse configuration: {e}")))
    }
}

impl FromStr for PairEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(PairEncoding::Raw),
            "hex-text" => Ok(PairEncoding::HexText),
            other => Err(Error::Config(format!("unknown pair encoding: {other}"))),
        }
    }
}

impl fmt::Display for PairEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairEncoding::Raw => f.write_str("raw"),
            PairEncoding::HexText => f.write_str("hex-text"),
        }
    }
}

impl FromStr for ProofOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positional" => Ok(ProofOrder::Positional),
            "left-biased" => Ok(ProofOrder::LeftBiased),
            other => Err(Error::Config(format!("unknown proof order: {other}"))),
        }
    }
}

impl fmt::Display for ProofOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofOrder::Positional => f.write_str("positional"),
            ProofOrder::LeftBiased => f.write_str("left-biased"),
        }
    }
}
