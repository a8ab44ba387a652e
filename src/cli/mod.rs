//! Minimal command-line surface for the compression core.
//!
//! A thin demonstration binary, not a full `lz4cli.c`-style driver (CLI
//! internals beyond compress/decompress are explicitly out of core scope).
//! Options are parsed with `clap`'s derive API rather than a hand-rolled
//! getopt-style loop, since there is no legacy argv surface to stay
//! bug-compatible with here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::context::{keys, Context};

/// Compress or decompress a file using the block-parallel container format.
#[derive(Debug, Parser)]
#[command(name = "bcc", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: OpMode,
}

#[derive(Debug, Subcommand)]
pub enum OpMode {
    /// Compress INPUT into OUTPUT.
    Compress(CompressArgs),
    /// Decompress INPUT into OUTPUT.
    Decompress(IoArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CodecArg {
    None,
    Huffman,
    Range,
    Ans0,
    Ans1,
    Fpaq,
    Cm,
    Tpaq,
    Tpaqx,
}

impl CodecArg {
    fn as_context_str(self) -> &'static str {
        match self {
            CodecArg::None => "NONE",
            CodecArg::Huffman => "HUFFMAN",
            CodecArg::Range => "RANGE",
            CodecArg::Ans0 => "ANS0",
            CodecArg::Ans1 => "ANS1",
            CodecArg::Fpaq => "FPAQ",
            CodecArg::Cm => "CM",
            CodecArg::Tpaq => "TPAQ",
            CodecArg::Tpaqx => "TPAQX",
        }
    }
}

#[derive(Debug, Args)]
pub struct IoArgs {
    /// Input file path.
    pub input: PathBuf,
    /// Output file path.
    pub output: PathBuf,
    /// Worker count (default: number of logical CPUs).
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Args)]
pub struct CompressArgs {
    #[command(flatten)]
    pub io: IoArgs,
    /// Block size in bytes (must be a multiple of 16).
    #[arg(short, long, default_value_t = crate::config::DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,
    /// Entropy codec to apply after the transform chain.
    #[arg(short, long, value_enum, default_value = "range")]
    pub codec: CodecArg,
    /// '+'-joined transform chain, e.g. "BWT+MTFT+ZRLT" (empty = none).
    #[arg(short, long, default_value = "")]
    pub transform: String,
    /// Attach a per-block checksum.
    #[arg(long)]
    pub checksum: bool,
    /// Store incompressible blocks verbatim instead of running them through
    /// the pipeline.
    #[arg(long)]
    pub skip_blocks: bool,
}

impl From<&CompressArgs> for Context {
    fn from(args: &CompressArgs) -> Self {
        let mut ctx = Context::new();
        ctx.set(keys::BLOCK_SIZE, args.block_size.to_string());
        ctx.set(keys::CODEC, args.codec.as_context_str());
        ctx.set(keys::TRANSFORM, args.transform.as_str());
        ctx.set(keys::CHECKSUM, if args.checksum { "TRUE" } else { "FALSE" });
        ctx.set(keys::SKIP_BLOCKS, if args.skip_blocks { "TRUE" } else { "FALSE" });
        let jobs = args.io.jobs.unwrap_or_else(crate::util::count_cores);
        ctx.set(keys::JOBS, jobs.to_string());
        ctx
    }
}
