//! A block-parallel lossless compression core: BitStream, entropy codecs,
//! reversible byte transforms, a per-block pipeline, a container frame, and
//! a scheduler tying them together (see `DESIGN.md` for the full module
//! map).
//!
//! Rust port of a block-parallel compression design, structured around a
//! thin, well-documented module at each layer boundary, hand-rolled error
//! enums instead of a derive macro, and `rayon` for the scheduler's
//! concurrency.

pub mod bitstream;
pub mod block;
pub mod cli;
pub mod config;
pub mod container;
pub mod context;
pub mod entropy;
pub mod error;
pub mod event;
pub mod scheduler;
pub mod transform;
pub mod util;

pub use config::{FORMAT_VERSION, MAGIC};
pub use container::ContainerHeader;
pub use context::{keys, Context};
pub use entropy::EntropyCodecId;
pub use error::{PipelineError, ProcessBlockCause};
pub use event::{Event, EventType, Listener, ListenerSet};
pub use scheduler::{Config, Scheduler};
pub use transform::TransformId;

/// Compresses `input` into `output` using `ctx` ("External
/// interfaces"). Convenience wrapper around [`Scheduler::encode`] for
/// callers that don't need to reuse a `Scheduler` across calls.
pub fn compress<R: std::io::Read, W: std::io::Write>(
    input: R,
    output: W,
    ctx: &Context,
) -> Result<(), PipelineError> {
    let config = Config::from_context(ctx)?;
    Scheduler::new(config, ListenerSet::new()).encode(input, output)
}

/// Decompresses a container frame from `input` into `output`, using only
/// the codec/transform choices recorded in the frame's own header.
pub fn decompress<R: std::io::Read, W: std::io::Write>(input: R, output: W) -> Result<(), PipelineError> {
    let config = Config::from_context(&Context::new())?;
    Scheduler::new(config, ListenerSet::new()).decode(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_round_trips() {
        let mut ctx = Context::new();
        ctx.set(keys::BLOCK_SIZE, "4096");
        ctx.set(keys::CODEC, "RANGE");
        ctx.set(keys::TRANSFORM, "BWT+ZRLT");
        ctx.set(keys::CHECKSUM, "TRUE");

        let data = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        let mut encoded = Vec::new();
        compress(data.as_slice(), &mut encoded, &ctx).unwrap();

        let mut decoded = Vec::new();
        decompress(encoded.as_slice(), &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }
}
