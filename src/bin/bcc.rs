//! Thin demonstration binary over the compression core's file API.
//!
//! Covers the two operations the core actually exposes (`bcc compress`,
//! `bcc decompress`) since anything beyond that — globbing, archive
//! formats, progress bars — is out of core scope.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context as _, Result};
use clap::Parser;

use bcc::cli::{Cli, OpMode};
use bcc::context::Context;
use bcc::event::ListenerSet;
use bcc::scheduler::{Config, Scheduler};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        OpMode::Compress(args) => {
            let ctx: Context = (&args).into();
            let config = Config::from_context(&ctx).context("invalid compression settings")?;
            let input = File::open(&args.io.input)
                .with_context(|| format!("opening input {}", args.io.input.display()))?;
            let output = BufWriter::new(
                File::create(&args.io.output)
                    .with_context(|| format!("creating output {}", args.io.output.display()))?,
            );
            Scheduler::new(config, ListenerSet::new())
                .encode(input, output)
                .context("compression failed")?;
        }
        OpMode::Decompress(io) => {
            let mut ctx = Context::new();
            let jobs = io.jobs.unwrap_or_else(bcc::util::count_cores);
            ctx.set(bcc::context::keys::JOBS, jobs.to_string());
            let config = Config::from_context(&ctx).context("invalid settings")?;
            let input =
                File::open(&io.input).with_context(|| format!("opening input {}", io.input.display()))?;
            let output = BufWriter::new(
                File::create(&io.output)
                    .with_context(|| format!("creating output {}", io.output.display()))?,
            );
            Scheduler::new(config, ListenerSet::new())
                .decode(input, output)
                .context("decompression failed")?;
        }
    }

    Ok(())
}
