//! Pipeline-level error type shared by the container, scheduler and block
//! pipeline modules.
//!
//! A plain `enum` with hand-rolled `Display`/`Error` impls, no `thiserror`
//! derive macro. Subsystem-specific errors
//! ([`crate::bitstream::BitStreamError`], [`crate::entropy::EntropyError`],
//! [`crate::transform::TransformError`]) convert into this one at the pipeline
//! boundary via `From`.

use std::fmt;

use crate::bitstream::BitStreamError;
use crate::entropy::EntropyError;
use crate::transform::TransformError;

/// Errors surfaced by the block pipeline, container frame, and scheduler.
///
/// Corresponds to `{ERR_WRITE_FILE, ERR_PROCESS_BLOCK, ERR_UNKNOWN}`
/// pipeline-level error, extended with the specific bitstream/entropy/transform
/// causes so callers can distinguish configuration mistakes from in-flight
/// decode failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Bad block size, unknown codec/transform name, jobs out of range, etc.
    /// Rejected at construction time; the stream is never touched.
    Configuration(String),
    /// A read or write against the shared bitstream failed.
    WriteFile(BitStreamError),
    /// A block failed to encode or decode: bad magic, unsupported version,
    /// malformed alphabet, a transform sanity check, or a checksum mismatch.
    ProcessBlock {
        /// 1-based id of the block that failed.
        block_id: u64,
        /// Underlying cause.
        cause: ProcessBlockCause,
    },
    /// Catch-all for conditions that don't fit the above (e.g. an entropy
    /// codec surfacing an error unrelated to stream I/O).
    Unknown(String),
}

/// Specific causes of a [`PipelineError::ProcessBlock`] failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessBlockCause {
    Bitstream(BitStreamError),
    Entropy(EntropyError),
    Transform(TransformError),
    ChecksumMismatch { expected: u32, actual: u32 },
    InvalidContainer(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            PipelineError::WriteFile(e) => write!(f, "bitstream I/O error: {e}"),
            PipelineError::ProcessBlock { block_id, cause } => {
                write!(f, "error processing block {block_id}: {cause}")
            }
            PipelineError::Unknown(msg) => write!(f, "unknown error: {msg}"),
        }
    }
}

impl fmt::Display for ProcessBlockCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessBlockCause::Bitstream(e) => write!(f, "{e}"),
            ProcessBlockCause::Entropy(e) => write!(f, "{e}"),
            ProcessBlockCause::Transform(e) => write!(f, "{e}"),
            ProcessBlockCause::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
            ProcessBlockCause::InvalidContainer(msg) => write!(f, "invalid container: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for ProcessBlockCause {}

impl From<BitStreamError> for PipelineError {
    fn from(e: BitStreamError) -> Self {
        PipelineError::WriteFile(e)
    }
}
