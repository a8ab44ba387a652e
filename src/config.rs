// config.rs — compile-time configuration constants.
// Compile-time defaults that can be overridden by Context/CLI at runtime,
// re-pointed at this crate's own container format constants.

/// Container magic value. Chosen as a 32-bit ASCII-ish tag, analogous to an
/// LZ4 frame's own magic number.
pub const MAGIC: u32 = 0x4243_4301; // "BCC\x01"

/// Current container format version ("5 bits format version").
pub const FORMAT_VERSION: u8 = 1;

/// Minimum block size: a power of two, multiple of 16.
pub const MIN_BITSTREAM_BLOCK_SIZE: usize = 1024;

/// Maximum block size.
pub const MAX_BITSTREAM_BLOCK_SIZE: usize = 1 << 28;

/// Default block size used when `Context` omits `blockSize`.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Default number of concurrent block tasks. This crate caps jobs at 64
/// rather than the much higher ceilings some LZ4 CLIs allow.
pub const DEFAULT_JOBS: usize = 1;

/// Maximum number of concurrent block tasks.
pub const MAX_JOBS: usize = 64;

/// Threshold below which a block is always treated as a copy block
/// regardless of `skipBlocks` (step 2, "SMALL_BLOCK_SIZE").
pub const SMALL_BLOCK_SIZE: usize = 16;

/// BitStream internal buffer size. Must be >= 1024 and a multiple of 8;
/// upper bound 2^29.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 64 * 1024;
