//! Error type shared by [`super::input`] and [`super::output`].
//!
//! A single `BitStreamError` kind with numeric codes `INVALID_STREAM |
//! END_OF_STREAM | INPUT_OUTPUT | STREAM_CLOSED`, plain `Result`-returning
//! functions throughout rather than a thrown exception type.

use std::fmt;

/// Discriminant mirroring four bitstream failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitStreamErrorKind {
    InvalidStream,
    EndOfStream,
    InputOutput,
    StreamClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStreamError {
    pub kind: BitStreamErrorKind,
    pub message: String,
}

impl BitStreamError {
    pub fn new(kind: BitStreamErrorKind, message: impl Into<String>) -> Self {
        BitStreamError { kind, message: message.into() }
    }

    pub fn closed() -> Self {
        Self::new(BitStreamErrorKind::StreamClosed, "stream closed")
    }

    pub fn end_of_stream() -> Self {
        Self::new(BitStreamErrorKind::EndOfStream, "no more data to read in the bitstream")
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(BitStreamErrorKind::InvalidStream, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(BitStreamErrorKind::InputOutput, message)
    }
}

impl fmt::Display for BitStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BitStreamError {}

impl From<std::io::Error> for BitStreamError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BitStreamError::end_of_stream()
        } else {
            BitStreamError::io(e.to_string())
        }
    }
}
