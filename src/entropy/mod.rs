//! Entropy codecs: the bit-level coding stage every block's
//! transform-sequence output is finally run through.
//!
//! `alphabet` is shared plumbing (frequency tables, varints) used by the
//! byte-oriented codecs. Each concrete codec implements [`EntropyEncoder`]/
//! [`EntropyDecoder`], a block-codec trait split generalized from "one fixed
//! block format" to "one of several pluggable codecs selected per block".

pub mod alphabet;
pub mod ans;
pub mod binary;
pub mod error;
pub mod huffman;
pub mod null;
pub mod predictors;
pub mod range;

pub use error::EntropyError;

/// A byte-stream entropy encoder writing to a bitstream.
pub trait EntropyEncoder {
    /// Encodes `block` to the underlying bitstream, returning the number of
    /// bytes consumed (always `block.len()` for these codecs, which are not
    /// allowed to fail midway: a block is encoded whole or not at all).
    fn encode(&mut self, block: &[u8]) -> Result<usize, EntropyError>;

    /// Flushes any pending encoder state. Must be called exactly once after
    /// the last `encode` call and before the underlying bitstream is closed.
    fn finish(&mut self) -> Result<(), EntropyError>;
}

/// A byte-stream entropy decoder reading from a bitstream.
pub trait EntropyDecoder {
    /// Decodes exactly `block.len()` bytes into `block`.
    fn decode(&mut self, block: &mut [u8]) -> Result<usize, EntropyError>;
}

/// Identifies which entropy codec a block was encoded with (mode
/// byte / §6 container block record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyCodecId {
    Null,
    Huffman,
    Range,
    AnsOrder0,
    AnsOrder1,
    BinaryFpaq,
    BinaryCm,
    BinaryTpaq,
    BinaryTpaqx,
}

impl EntropyCodecId {
    pub fn as_u8(self) -> u8 {
        match self {
            EntropyCodecId::Null => 0,
            EntropyCodecId::Huffman => 1,
            EntropyCodecId::Range => 2,
            EntropyCodecId::AnsOrder0 => 3,
            EntropyCodecId::AnsOrder1 => 4,
            EntropyCodecId::BinaryFpaq => 5,
            EntropyCodecId::BinaryCm => 6,
            EntropyCodecId::BinaryTpaq => 7,
            EntropyCodecId::BinaryTpaqx => 8,
        }
    }

    pub fn from_u8(v: u8) -> Result<Self, EntropyError> {
        Ok(match v {
            0 => EntropyCodecId::Null,
            1 => EntropyCodecId::Huffman,
            2 => EntropyCodecId::Range,
            3 => EntropyCodecId::AnsOrder0,
            4 => EntropyCodecId::AnsOrder1,
            5 => EntropyCodecId::BinaryFpaq,
            6 => EntropyCodecId::BinaryCm,
            7 => EntropyCodecId::BinaryTpaq,
            8 => EntropyCodecId::BinaryTpaqx,
            other => return Err(EntropyError::InvalidStream(format!("unknown entropy codec id {other}"))),
        })
    }
}
