//! Error type shared by every entropy codec.
//!
//! Same hand-rolled-enum discipline as [`crate::bitstream::BitStreamError`]:
//! a plain enum with `Display`/`Error` impls, no `thiserror`.

use std::fmt;

use crate::bitstream::BitStreamError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntropyError {
    /// The underlying bitstream read/write failed.
    Bitstream(BitStreamError),
    /// A decoded alphabet or frequency table violates an invariant
    /// (alphabet size out of range, empty alphabet with nonzero length, ...).
    InvalidStream(String),
    /// A caller passed parameters `normalize_frequencies`/`encode_alphabet`
    /// reject outright (scale out of `[256, 65536]`, length > 256, ...).
    InvalidArgument(String),
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::Bitstream(e) => write!(f, "{e}"),
            EntropyError::InvalidStream(msg) => write!(f, "invalid stream: {msg}"),
            EntropyError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for EntropyError {}

impl From<BitStreamError> for EntropyError {
    fn from(e: BitStreamError) -> Self {
        EntropyError::Bitstream(e)
    }
}
