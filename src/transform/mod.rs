//! Reversible byte-transforms run before entropy coding, chained
//! into a fixed-capacity [`TransformSequence`] of up to eight stages.
//!
//! Each transform implements [`Transform`]: one concrete transform per
//! module, a shared trait at the seam, rather than a class hierarchy.

pub mod bwt;
pub mod bwts;
pub mod lz;
pub mod rlt;
pub mod rolz;
pub mod sbrt;
pub mod suffix_array;
pub mod text;
pub mod x86;

use std::fmt;

/// Errors a transform can raise. Forward failures are never fatal to the
/// pipeline ("Transform-forward weak": the caller downgrades to a
/// skip); inverse failures always are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Forward could not fit the output in the provided buffer, or block
    /// size exceeds the transform's hard cap (e.g. BWT's 1024 MiB).
    OutputTooSmall,
    /// Inverse-side sanity check violated: an offset, length or index read
    /// back from the encoded stream is out of range for the given input.
    InvalidData(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::OutputTooSmall => write!(f, "transform output does not fit"),
            TransformError::InvalidData(msg) => write!(f, "invalid transform data: {msg}"),
        }
    }
}

impl std::error::Error for TransformError {}

/// A reversible byte transform (`forward`/`inverse`/
/// `getMaxEncodedLength`).
///
/// `forward` returning `Ok(false)` means "not worth it or doesn't fit": the
/// caller must treat the slot as skipped and pass `src` through unchanged.
/// `inverse` returning `Err` is always fatal for the enclosing block.
pub trait Transform {
    /// Upper bound on `forward`'s output length for a `src` of length `n`.
    fn max_encoded_len(&self, n: usize) -> usize;

    /// Encodes `src` into `dst`, returning the number of bytes written, or
    /// `Ok(false)` if `src` should pass through unmodified instead.
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError>;

    /// Decodes `src` (produced by a prior `forward` with the same transform
    /// and settings) into `dst`, writing exactly the original pre-transform
    /// length.
    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError>;
}

/// Identifies one transform stage in a block header's transform-chain code
/// ("Transform/Entropy name table").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformId {
    None,
    Bwt,
    Bwts,
    Mtft,
    Rank,
    Timestamp,
    Srt,
    Lzx,
    Lzp,
    RolzAns,
    RolzBinary,
    Text,
    Rlt,
    Zrlt,
    X86,
}

impl TransformId {
    pub fn as_u8(self) -> u8 {
        match self {
            TransformId::None => 0,
            TransformId::Bwt => 1,
            TransformId::Bwts => 2,
            TransformId::Mtft => 3,
            TransformId::Rank => 4,
            TransformId::Timestamp => 5,
            TransformId::Srt => 6,
            TransformId::Lzx => 7,
            TransformId::Lzp => 8,
            TransformId::RolzAns => 9,
            TransformId::RolzBinary => 10,
            TransformId::Text => 11,
            TransformId::Rlt => 12,
            TransformId::Zrlt => 13,
            TransformId::X86 => 14,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => TransformId::None,
            1 => TransformId::Bwt,
            2 => TransformId::Bwts,
            3 => TransformId::Mtft,
            4 => TransformId::Rank,
            5 => TransformId::Timestamp,
            6 => TransformId::Srt,
            7 => TransformId::Lzx,
            8 => TransformId::Lzp,
            9 => TransformId::RolzAns,
            10 => TransformId::RolzBinary,
            11 => TransformId::Text,
            12 => TransformId::Rlt,
            13 => TransformId::Zrlt,
            14 => TransformId::X86,
            _ => return None,
        })
    }
}

/// Maximum number of stages in a [`TransformSequence`].
pub const MAX_STAGES: usize = 8;

fn make_transform(id: TransformId) -> Box<dyn Transform + Send> {
    match id {
        TransformId::None => Box::new(NoneTransform),
        TransformId::Bwt => Box::new(bwt::Bwt::new()),
        TransformId::Bwts => Box::new(bwts::Bwts::new()),
        TransformId::Mtft => Box::new(sbrt::Sbrt::mtf()),
        TransformId::Rank => Box::new(sbrt::Sbrt::rank()),
        TransformId::Timestamp => Box::new(sbrt::Sbrt::timestamp()),
        TransformId::Srt => Box::new(sbrt::Srt::new()),
        TransformId::Lzx => Box::new(lz::Lzx::new()),
        TransformId::Lzp => Box::new(lz::Lzp::new()),
        TransformId::RolzAns => Box::new(rolz::RolzCodec1::new()),
        TransformId::RolzBinary => Box::new(rolz::RolzCodec2::new()),
        TransformId::Text => Box::new(text::TextCodec::new()),
        TransformId::Rlt => Box::new(rlt::Rlt::new()),
        TransformId::Zrlt => Box::new(rlt::Zrlt::new()),
        TransformId::X86 => Box::new(x86::X86Codec::new()),
    }
}

struct NoneTransform;

impl Transform for NoneTransform {
    fn max_encoded_len(&self, n: usize) -> usize {
        n
    }
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        dst.extend_from_slice(src);
        Ok(true)
    }
    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        dst.extend_from_slice(src);
        Ok(())
    }
}

/// A fixed-capacity chain of up to [`MAX_STAGES`] transforms, run ping-pong
/// style over a pair of scratch buffers ("Transform sequence").
pub struct TransformSequence {
    ids: Vec<TransformId>,
    stages: Vec<Box<dyn Transform + Send>>,
}

impl TransformSequence {
    /// Builds a sequence from a chain of transform ids, in application order
    /// (the order `forward` runs them; `inverse` runs the reverse order).
    pub fn new(ids: Vec<TransformId>) -> Result<Self, TransformError> {
        if ids.len() > MAX_STAGES {
            return Err(TransformError::InvalidData(format!(
                "transform sequence has {} stages, max is {MAX_STAGES}",
                ids.len()
            )));
        }
        let stages = ids.iter().copied().map(make_transform).collect();
        Ok(TransformSequence { ids, stages })
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Runs every stage forward. Stages that report "not worth it" are
    /// marked in the returned skip bitmap (bit `i` set means stage `i` was
    /// skipped and its input passed through unchanged) and contribute no
    /// transformation of their own.
    pub fn forward(&mut self, src: &[u8]) -> Result<(Vec<u8>, u8), TransformError> {
        let mut skip_flags = 0u8;
        let mut cur = src.to_vec();
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let mut out = Vec::with_capacity(stage.max_encoded_len(cur.len()));
            let applied = stage.forward(&cur, &mut out)?;
            if applied {
                cur = out;
            } else {
                skip_flags |= 1 << i;
            }
        }
        Ok((cur, skip_flags))
    }

    /// Runs every stage's inverse in reverse order, skipping stages whose
    /// bit is set in `skip_flags`.
    pub fn inverse(&mut self, src: &[u8], skip_flags: u8) -> Result<Vec<u8>, TransformError> {
        let mut cur = src.to_vec();
        for (i, stage) in self.stages.iter_mut().enumerate().rev() {
            if skip_flags & (1 << i) != 0 {
                continue;
            }
            let mut out = Vec::with_capacity(cur.len() * 2 + 16);
            stage.inverse(&cur, &mut out)?;
            cur = out;
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_is_identity() {
        let mut seq = TransformSequence::new(vec![]).unwrap();
        let (out, skip) = seq.forward(b"hello world").unwrap();
        assert_eq!(out, b"hello world");
        assert_eq!(skip, 0);
        let back = seq.inverse(&out, skip).unwrap();
        assert_eq!(back, b"hello world");
    }

    #[test]
    fn rejects_too_many_stages() {
        let ids = vec![TransformId::None; MAX_STAGES + 1];
        assert!(TransformSequence::new(ids).is_err());
    }

    #[test]
    fn bwt_then_zrlt_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(20);
        let mut seq = TransformSequence::new(vec![TransformId::Bwt, TransformId::Zrlt]).unwrap();
        let (encoded, skip) = seq.forward(&data).unwrap();
        let decoded = seq.inverse(&encoded, skip).unwrap();
        assert_eq!(decoded, data);
    }
}
