//! Command line front end for the Merkle engine.
//!
//! Digests go in as 64 character lowercase hex, results come out as JSON on
//! stdout. Logs are written to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use merkle_engine::{hash_string, MerkleEngine, MerkleHash, PairEncoding, ProofOrder, TreeConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, JSON or YAML); MERKLE_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pair encoding: raw or hex-text (overrides configuration)
    #[arg(long)]
    pair_encoding: Option<PairEncoding>,

    /// Proof order: positional or left-biased (overrides configuration)
    #[arg(long)]
    proof_order: Option<ProofOrder>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// SHA-256 of a UTF-8 string, e.g. a file name
    Hash { text: String },
    /// Merkle root of the given leaves
    Root {
        #[arg(required = true)]
        leaves: Vec<String>,
    },
    /// Inclusion proof for the leaf at --index
    Proof {
        #[arg(short, long)]
        index: usize,
        #[arg(required = true)]
        leaves: Vec<String>,
    },
    /// Check that the leaves reduce to --root
    VerifyRoot {
        #[arg(short, long)]
        root: String,
        leaves: Vec<String>,
    },
    /// Check that --leaf folds up to --root along the given siblings
    VerifyProof {
        #[arg(short, long)]
        leaf: String,
        #[arg(short, long)]
        root: String,
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        siblings: Vec<String>,
    },
    /// Commit to --file-hash, alone or as a member of the given batch
    Commit {
        #[arg(short, long)]
        file_hash: String,
        file_hashes: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let output = run(args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Resolve the configuration and execute one subcommand, returning its JSON result
fn run(args: Args) -> Result<Value> {
    let config = load_configuration(&args)?;
    info!(
        pair_encoding = %config.pair_encoding,
        proof_order = %config.proof_order,
        "engine configured"
    );
    let engine = MerkleEngine::<sha2::Sha256>::new(config);

    let output = match args.command {
        Command::Hash { text } => json!({ "hash": hash_string(&text) }),
        Command::Root { leaves } => {
            let root = engine
                .reduce_text(&leaves)
                .context("failed to compute merkle root")?;
            json!({ "merkleRoot": root, "fileCount": leaves.len() })
        }
        Command::Proof { index, leaves } => {
            let tree = engine
                .build_tree(&parse_leaves(&leaves)?)
                .context("failed to build merkle tree")?;
            let proof = tree
                .proof(index)
                .context("failed to generate merkle proof")?;
            json!({ "merkleRoot": tree.root(), "proof": proof })
        }
        Command::VerifyRoot { root, leaves } => {
            let is_valid = engine.verify_root_text(&leaves, &root);
            json!({ "isValid": is_valid, "fileCount": leaves.len() })
        }
        Command::VerifyProof {
            leaf,
            root,
            index,
            siblings,
        } => {
            let is_valid = engine.verify_proof_text(&leaf, index, &siblings, &root);
            json!({ "isValid": is_valid })
        }
        Command::Commit {
            file_hash,
            file_hashes,
        } => serde_json::to_value(
            engine
                .commit(&file_hash, &file_hashes)
                .context("failed to build commitment")?,
        )?,
    };
    Ok(output)
}

fn parse_leaves(leaves: &[String]) -> Result<Vec<MerkleHash>> {
    merkle_engine::parse_digests(leaves).context("invalid leaf digest")
}

fn load_configuration(args: &Args) -> Result<TreeConfig> {
    let mut config = match &args.config {
        Some(path) => TreeConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TreeConfig::from_env().context("failed to read MERKLE_* environment")?,
    };
    if let Some(pair_encoding) = args.pair_encoding {
        config.pair_encoding = pair_encoding;
    }
    if let Some(proof_order) = args.proof_order {
        config.proof_order = proof_order;
    }
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Unknown log level: {log_level}, using WARN");
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FILE1: &str = "2bc7f5da08ebda7d761bbfd4bed3c6c2718492aa4e0e2063786219bc7687a40c";
    const FILE2: &str = "aa78d5a5c01ef76017576055d20f3007093aa9ba583655f0b236f7506e6bfd60";
    const FILE3: &str = "fe3a0126360ed6fcd6bec4f663d404d9791f1b529c7d239024451d57bfd8333a";
    const RAW_ROOT: &str = "0746f108b3c34f79507f76ae298ca6b7fc81ecb5d0ccbcb4e36fe04701b97dab";
    const HEX_TEXT_ROOT: &str = "0a75c57d690d637366bbf3706259f0393dbed6c86eab9e53a56b30062eebd283";

    fn run_args(argv: &[&str]) -> Result<Value> {
        let argv = std::iter::once("merkle-engine").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv)?;
        run(args)
    }

    fn legacy_config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "pair_encoding = \"hex-text\"").unwrap();
        writeln!(file, "proof_order = \"left-biased\"").unwrap();
        file
    }

    #[test]
    fn test_hash_subcommand() {
        let output = run_args(&["hash", "file1.pdf"]).unwrap();
        assert_eq!(output["hash"], FILE1);
    }

    #[test]
    fn test_root_subcommand() {
        let output = run_args(&["root", FILE1, FILE2, FILE3]).unwrap();
        assert_eq!(output["merkleRoot"], RAW_ROOT);
        assert_eq!(output["fileCount"], 3);

        let output =
            run_args(&["--pair-encoding", "hex-text", "root", FILE1, FILE2, FILE3]).unwrap();
        assert_eq!(output["merkleRoot"], HEX_TEXT_ROOT);
    }

    #[test]
    fn test_proof_subcommand() {
        let output = run_args(&[
            "--pair-encoding",
            "hex-text",
            "proof",
            "-i",
            "2",
            FILE1,
            FILE2,
            FILE3,
        ])
        .unwrap();
        assert_eq!(output["merkleRoot"], HEX_TEXT_ROOT);
        assert_eq!(output["proof"]["leafIndex"], 2);
        assert_eq!(output["proof"]["siblings"][0], FILE3);

        let err = run_args(&["proof", "-i", "9", FILE1]).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "Requested leaf index: 9 is outside a sequence of 1 leaves"
        );
        assert!(run_args(&["proof", "-i", "0", "xyz"]).is_err());
    }

    #[test]
    fn test_verify_root_subcommand() {
        let output =
            run_args(&["verify-root", "--root", RAW_ROOT, FILE1, FILE2, FILE3]).unwrap();
        assert_eq!(output["isValid"], true);
        assert_eq!(output["fileCount"], 3);

        let output = run_args(&["verify-root", "--root", RAW_ROOT, FILE1, FILE2]).unwrap();
        assert_eq!(output["isValid"], false);
    }

    #[test]
    fn test_verify_proof_index_defaults_to_zero() {
        let proof = run_args(&["proof", "-i", "0", FILE1, FILE2, FILE3]).unwrap();
        let siblings: Vec<String> = proof["proof"]["siblings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap().to_owned())
            .collect();

        let mut argv = vec!["verify-proof", "--leaf", FILE1, "--root", RAW_ROOT];
        argv.extend(siblings.iter().map(String::as_str));
        assert_eq!(run_args(&argv).unwrap()["isValid"], true);

        // the same siblings presented for position 1 fold to a different root
        argv.extend(["--index", "1"]);
        assert_eq!(run_args(&argv).unwrap()["isValid"], false);
    }

    #[test]
    fn test_commit_subcommand() {
        let output =
            run_args(&["commit", "--file-hash", FILE2, FILE1, FILE2, FILE3]).unwrap();
        assert_eq!(output["merkleRoot"], RAW_ROOT);
        assert_eq!(output["fileCount"], 3);
        assert_eq!(output["leafIndex"], 1);
        assert_eq!(output["merkleProof"][0], FILE1);

        let output = run_args(&["commit", "--file-hash", FILE2]).unwrap();
        assert_eq!(output["merkleRoot"], FILE2);
        assert_eq!(output["fileCount"], 1);
    }

    #[test]
    fn test_config_file_is_applied() {
        let file = legacy_config_file();
        let path = file.path().to_str().unwrap();
        let args =
            Args::try_parse_from(["merkle-engine", "--config", path, "root", FILE1]).unwrap();
        assert_eq!(load_configuration(&args).unwrap(), TreeConfig::legacy());

        let output = run_args(&["--config", path, "root", FILE1, FILE2, FILE3]).unwrap();
        assert_eq!(output["merkleRoot"], HEX_TEXT_ROOT);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = legacy_config_file();
        let path = file.path().to_str().unwrap();
        let args = Args::try_parse_from([
            "merkle-engine",
            "--config",
            path,
            "--pair-encoding",
            "raw",
            "--proof-order",
            "positional",
            "root",
            FILE1,
        ])
        .unwrap();
        assert_eq!(load_configuration(&args).unwrap(), TreeConfig::default());

        let args = Args::try_parse_from([
            "merkle-engine",
            "--config",
            path,
            "--proof-order",
            "positional",
            "root",
            FILE1,
        ])
        .unwrap();
        let config = load_configuration(&args).unwrap();
        assert_eq!(config.pair_encoding, PairEncoding::HexText);
        assert_eq!(config.proof_order, ProofOrder::Positional);
    }

    #[test]
    fn test_rejects_unknown_flag_values() {
        let unknown = ["merkle-engine", "--pair-encoding", "base64", "root", FILE1];
        assert!(Args::try_parse_from(unknown).is_err());
        assert!(Args::try_parse_from(["merkle-engine", "root"]).is_err());
    }
}
