//! XXHash32-compatible checksum helpers, seeded with the container magic
//! value.
//!
//! Thin wrapper around the `xxhash-rust` crate. An LZ4 frame checksum
//! typically hard-codes seed 0; this one instead takes an arbitrary seed so
//! every block checksum in this format can share [`crate::config::MAGIC`].

pub use xxhash_rust::xxh32::Xxh32 as Hasher32;

use crate::config::MAGIC;

/// One-shot XXH32 hash seeded with the container magic.
///
/// Fixed to the container's own seed rather than taking an arbitrary one,
/// since every block checksum in this format uses the same seed.
#[inline]
pub fn block_checksum(data: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(data, MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(block_checksum(b"hello world"), block_checksum(b"hello world"));
    }

    #[test]
    fn sensitive_to_content() {
        assert_ne!(block_checksum(b"hello world"), block_checksum(b"hello worle"));
    }

    #[test]
    fn empty_input_is_stable() {
        let h1 = block_checksum(b"");
        let h2 = block_checksum(b"");
        assert_eq!(h1, h2);
    }
}
