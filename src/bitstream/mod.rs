//! Framed, big-endian bit-level I/O over a buffered byte sink/source.
//!
//! This is the foundation every other layer builds on: entropy codecs read
//! and write symbols through a [`DefaultInputBitStream`]/
//! [`DefaultOutputBitStream`] pair, and the container frame itself is just a
//! fixed sequence of `writeBits` calls (see [`crate::container`]).

pub mod error;
pub mod input;
pub mod output;

pub use error::{BitStreamError, BitStreamErrorKind};
pub use input::DefaultInputBitStream;
pub use output::DefaultOutputBitStream;
