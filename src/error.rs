//! Merkle Engine Errors

use displaydoc::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// Leaf sequence is empty, at least one leaf is required
    EmptyInput,
    /// Requested leaf index: {0} is outside a sequence of {1} leaves
    IndexOutOfRange(usize, usize),
    /// Value is not a 64 character lowercase hex digest: {0}
    InvalidDigestFormat(String),
    /// Failed to load tree configuration: {0}
    Config(String),
}

impl std::error::Error for Error {}
