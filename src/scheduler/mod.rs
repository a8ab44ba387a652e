//! Top-level driver ("Scheduler", §5 "Concurrency & resource
//! model"): turns a byte source into a container frame (and back), batching
//! blocks across up to `Config::jobs` concurrent tasks.
//!
//! Built around a bounded-batch `rayon` pipeline: blocks are grouped into
//! batches of up to `Config::jobs`, transformed/entropy-coded in parallel
//! within a batch, then drained and written in ascending block-id order.
//! `WriteRegister` is the out-of-order result buffer backing that "wait to
//! write" step (`BTreeMap<u64, Vec<u8>>` behind a `Mutex`, drained in
//! ascending id order).

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

use rayon::prelude::*;

use crate::bitstream::{DefaultInputBitStream, DefaultOutputBitStream};
use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_JOBS, MAX_BITSTREAM_BLOCK_SIZE, MAX_JOBS, MIN_BITSTREAM_BLOCK_SIZE};
use crate::container::{self, ContainerHeader};
use crate::context::{keys, Context};
use crate::entropy::EntropyCodecId;
use crate::error::{PipelineError, ProcessBlockCause};
use crate::event::{Event, EventType, ListenerSet};
use crate::transform::TransformId;

/// Upper bound on `block_size * jobs` ("block_size · jobs < 2^31").
const MAX_BATCH_BYTES: u64 = 1u64 << 31;

fn config_err(msg: impl Into<String>) -> PipelineError {
    PipelineError::Configuration(msg.into())
}

fn entropy_name(name: &str) -> Result<EntropyCodecId, PipelineError> {
    Ok(match name {
        "NONE" => EntropyCodecId::Null,
        "HUFFMAN" => EntropyCodecId::Huffman,
        "RANGE" => EntropyCodecId::Range,
        "ANS0" => EntropyCodecId::AnsOrder0,
        "ANS1" => EntropyCodecId::AnsOrder1,
        "FPAQ" => EntropyCodecId::BinaryFpaq,
        "CM" => EntropyCodecId::BinaryCm,
        "TPAQ" => EntropyCodecId::BinaryTpaq,
        "TPAQX" => EntropyCodecId::BinaryTpaqx,
        other => return Err(config_err(format!("unknown entropy codec name {other:?}"))),
    })
}

fn transform_name(name: &str) -> Result<TransformId, PipelineError> {
    Ok(match name {
        "NONE" => TransformId::None,
        "BWT" => TransformId::Bwt,
        "BWTS" => TransformId::Bwts,
        "LZ" => TransformId::Lzx,
        "RLT" => TransformId::Rlt,
        "ZRLT" => TransformId::Zrlt,
        "MTFT" => TransformId::Mtft,
        "RANK" => TransformId::Rank,
        "SRT" => TransformId::Srt,
        "X86" => TransformId::X86,
        "TEXT" => TransformId::Text,
        "ROLZ" => TransformId::RolzAns,
        "ROLZX" => TransformId::RolzBinary,
        other => return Err(config_err(format!("unknown transform name {other:?}"))),
    })
}

/// Validated, typed configuration materialized once from a [`Context`]:
/// keep a string-keyed configuration at the boundary, but materialize a
/// typed, validated struct once inside the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub block_size: usize,
    pub jobs: usize,
    pub entropy: EntropyCodecId,
    pub transform_chain: Vec<TransformId>,
    pub checksum: bool,
    pub skip_blocks: bool,
    pub file_size: Option<u64>,
}

impl Config {
    pub fn from_context(ctx: &Context) -> Result<Self, PipelineError> {
        let block_size = ctx
            .get_int(keys::BLOCK_SIZE)
            .map_err(|e| config_err(e.to_string()))?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_BLOCK_SIZE);
        if block_size < MIN_BITSTREAM_BLOCK_SIZE || block_size > MAX_BITSTREAM_BLOCK_SIZE {
            return Err(config_err(format!(
                "blockSize {block_size} out of range [{MIN_BITSTREAM_BLOCK_SIZE}, {MAX_BITSTREAM_BLOCK_SIZE}]"
            )));
        }
        if block_size % 16 != 0 {
            return Err(config_err(format!("blockSize {block_size} is not a multiple of 16")));
        }

        let mut jobs = ctx
            .get_int(keys::JOBS)
            .map_err(|e| config_err(e.to_string()))?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_JOBS);
        if jobs == 0 || jobs > MAX_JOBS {
            return Err(config_err(format!("jobs {jobs} out of range [1, {MAX_JOBS}]")));
        }
        if (block_size as u64) * (jobs as u64) >= MAX_BATCH_BYTES {
            jobs = (((MAX_BATCH_BYTES - 1) / block_size as u64).max(1)) as usize;
        }

        let entropy = match ctx.get_str(keys::CODEC) {
            Some(name) => entropy_name(name)?,
            None => EntropyCodecId::Huffman,
        };

        let transform_chain = match ctx.get_str(keys::TRANSFORM) {
            Some(spec) if !spec.is_empty() => spec
                .split('+')
                .map(transform_name)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|id| *id != TransformId::None)
                .collect(),
            _ => Vec::new(),
        };
        if transform_chain.len() > crate::transform::MAX_STAGES {
            return Err(config_err(format!(
                "transform chain has {} stages, max is {}",
                transform_chain.len(),
                crate::transform::MAX_STAGES
            )));
        }

        let checksum = ctx.get_bool(keys::CHECKSUM).map_err(|e| config_err(e.to_string()))?.unwrap_or(false);
        let skip_blocks =
            ctx.get_bool(keys::SKIP_BLOCKS).map_err(|e| config_err(e.to_string()))?.unwrap_or(false);
        let file_size =
            ctx.get_int(keys::FILE_SIZE).map_err(|e| config_err(e.to_string()))?.map(|v| v as u64);

        Ok(Config { block_size, jobs, entropy, transform_chain, checksum, skip_blocks, file_size })
    }

    fn block_count_hint(&self) -> Option<u64> {
        self.file_size.map(|n| (n + self.block_size as u64 - 1) / self.block_size as u64)
    }
}

/// Out-of-order result buffer for one batch, drained once every id in the
/// batch's range has arrived.
struct WriteRegister {
    pending: Mutex<BTreeMap<u64, Vec<u8>>>,
}

impl WriteRegister {
    fn new() -> Self {
        WriteRegister { pending: Mutex::new(BTreeMap::new()) }
    }

    fn insert(&self, block_id: u64, bytes: Vec<u8>) {
        self.pending.lock().unwrap().insert(block_id, bytes);
    }

    /// Writes every buffered record whose id falls in `first..=last`, in
    /// ascending order, to `sink`.
    fn drain_in_order<W: Write>(
        &self,
        bw: &mut DefaultOutputBitStream<W>,
        first: u64,
        last: u64,
    ) -> Result<(), PipelineError> {
        let mut pending = self.pending.lock().unwrap();
        for id in first..=last {
            if let Some(bytes) = pending.remove(&id) {
                bw.write_bits_bytes(&bytes, bytes.len() * 8)?;
            }
        }
        Ok(())
    }
}

/// Spin-wait ordering barrier on `processedBlockId` (step 5, §5
/// "suspension only at the shared-bitstream write point").
struct SpinBarrier {
    processed: AtomicU64,
}

impl SpinBarrier {
    fn new(start: u64) -> Self {
        SpinBarrier { processed: AtomicU64::new(start) }
    }

    fn wait_for(&self, predecessor: u64) {
        while self.processed.load(Ordering::Acquire) != predecessor {
            std::hint::spin_loop();
        }
    }

    fn advance(&self, to: u64) {
        self.processed.store(to, Ordering::Release);
    }
}

/// `Condvar`-backed alternative to [`SpinBarrier`] ("replace
/// busy-wait with a condvar in high-contention environments"), used when the
/// scheduler is built with [`Scheduler::new_blocking`].
struct OrderedSlot {
    state: Mutex<u64>,
    cvar: Condvar,
}

impl OrderedSlot {
    fn new(start: u64) -> Self {
        OrderedSlot { state: Mutex::new(start), cvar: Condvar::new() }
    }

    fn wait_for(&self, predecessor: u64) {
        let mut processed = self.state.lock().unwrap();
        while *processed != predecessor {
            processed = self.cvar.wait(processed).unwrap();
        }
    }

    fn advance(&self, to: u64) {
        *self.state.lock().unwrap() = to;
        self.cvar.notify_all();
    }
}

enum Barrier {
    Spin(SpinBarrier),
    Blocking(OrderedSlot),
}

impl Barrier {
    fn wait_for(&self, predecessor: u64) {
        match self {
            Barrier::Spin(b) => b.wait_for(predecessor),
            Barrier::Blocking(b) => b.wait_for(predecessor),
        }
    }
    fn advance(&self, to: u64) {
        match self {
            Barrier::Spin(b) => b.advance(to),
            Barrier::Blocking(b) => b.advance(to),
        }
    }
}

/// Drives the block pipeline and container frame over a byte source/sink.
/// Owns no state across calls to [`Scheduler::encode`]/
/// [`Scheduler::decode`] beyond its [`Config`] and listener set.
pub struct Scheduler {
    config: Config,
    listeners: ListenerSet,
    blocking: bool,
}

impl Scheduler {
    /// Builds a scheduler using the default spin-wait ordering barrier.
    pub fn new(config: Config, listeners: ListenerSet) -> Self {
        Scheduler { config, listeners, blocking: false }
    }

    /// Builds a scheduler using the `Condvar`-backed ordering barrier
    /// instead of spinning (high-contention fallback note).
    pub fn new_blocking(config: Config, listeners: ListenerSet) -> Self {
        Scheduler { config, listeners, blocking: true }
    }

    /// Encodes `input` in full, writing a container frame to `output`
    /// ("Scheduler (forward)").
    pub fn encode<R: Read, W: Write>(&self, mut input: R, output: W) -> Result<(), PipelineError> {
        let mut bw = DefaultOutputBitStream::new(output, crate::config::DEFAULT_STREAM_BUFFER_SIZE)?;
        let header = ContainerHeader::new(
            self.config.checksum,
            self.config.entropy,
            self.config.transform_chain.clone(),
            self.config.block_size,
            self.config.block_count_hint(),
        )?;
        header.write(&mut bw)?;

        self.listeners.notify(&Event::new(EventType::CompressionStart, None, 0));

        let barrier = if self.blocking { Barrier::Blocking(OrderedSlot::new(0)) } else { Barrier::Spin(SpinBarrier::new(0)) };
        let register = WriteRegister::new();

        let mut block_ctx = Context::new();
        block_ctx.set(keys::CHECKSUM, if self.config.checksum { "TRUE" } else { "FALSE" });
        block_ctx.set(keys::SKIP_BLOCKS, if self.config.skip_blocks { "TRUE" } else { "FALSE" });

        let mut next_block_id = 1u64;
        let mut total_in = 0u64;
        loop {
            let batch_cap = self.config.jobs * self.config.block_size;
            let mut batch_buf = vec![0u8; batch_cap];
            let mut filled = 0usize;
            while filled < batch_cap {
                let n = input.read(&mut batch_buf[filled..]).map_err(|e| {
                    PipelineError::ProcessBlock {
                        block_id: next_block_id,
                        cause: ProcessBlockCause::Bitstream(e.into()),
                    }
                })?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            batch_buf.truncate(filled);

            let chunks: Vec<&[u8]> = batch_buf.chunks(self.config.block_size).collect();
            let first_id = next_block_id;
            let last_id = first_id + chunks.len() as u64 - 1;

            let errors: Vec<Option<PipelineError>> = chunks
                .par_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let block_id = first_id + i as u64;
                    // Transform/entropy work happens off any lock, before the
                    // ordering barrier, regardless of whether it succeeds.
                    let result = crate::block::encode_block(
                        chunk,
                        block_id,
                        &self.config.transform_chain,
                        self.config.entropy,
                        &block_ctx,
                        &self.listeners,
                    );
                    // A failing task still reaches and advances the barrier
                    // ("a failing task still increments the
                    // ordering counter so peers are not deadlocked") — it
                    // just contributes nothing to the write register.
                    barrier.wait_for(block_id - 1);
                    let err = match result {
                        Ok(record) => {
                            register.insert(block_id, record.bytes);
                            None
                        }
                        Err(e) => Some(e),
                    };
                    barrier.advance(block_id);
                    err
                })
                .collect();
            for err in errors.into_iter().flatten() {
                return Err(err);
            }

            register.drain_in_order(&mut bw, first_id, last_id)?;
            total_in += filled as u64;
            next_block_id = last_id + 1;

            if filled < batch_cap {
                break;
            }
        }

        container::write_sentinel(&mut bw)?;
        bw.close()?;

        self.listeners.notify(&Event::new(EventType::CompressionEnd, None, total_in));
        Ok(())
    }

    /// Decodes a container frame read from `input`, writing the
    /// reconstructed bytes to `output` ("Scheduler (inverse)").
    ///
    /// **Deviation**: block *records* must be parsed sequentially (each
    /// record's length is only known after reading its own header), but once
    /// a batch of records has been read, their inverse transform/entropy
    /// work runs in parallel via an indexed `rayon` iterator — `collect`
    /// over an `IndexedParallelIterator` preserves input order by
    /// construction, so no explicit write-register is needed on the decode
    /// side the way the encode side needs one.
    pub fn decode<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<(), PipelineError> {
        let mut br = DefaultInputBitStream::new(input, crate::config::DEFAULT_STREAM_BUFFER_SIZE)?;
        let header = ContainerHeader::read(&mut br)?;

        self.listeners.notify(&Event::new(EventType::DecompressionStart, None, 0));

        let mut next_block_id = 1u64;
        let mut total_out = 0u64;
        loop {
            let mut batch: Vec<crate::block::ParsedBlockRecord> = Vec::new();
            let mut hit_sentinel = false;

            for _ in 0..self.config.jobs.max(1) {
                let mode = br.read_bits(8)? as u8;
                let is_copy = mode & 0b1000_0000 != 0;
                let data_size = ((mode >> 5) & 0b11) + 1;
                let extended = mode & 0b0001_0000 != 0;
                let skip_flags = if extended { br.read_bits(8)? as u8 } else { mode & 0b0000_1111 };

                let mut post_len: usize = 0;
                for _ in 0..data_size {
                    post_len = (post_len << 8) | (br.read_bits(8)? as usize);
                }

                if mode == container::SENTINEL_MODE && post_len == 0 {
                    hit_sentinel = true;
                    break;
                }

                let checksum = if header.has_checksum { Some(br.read_bits(32)? as u32) } else { None };
                let mut payload = vec![0u8; post_len];
                if post_len > 0 {
                    br.read_bits_bytes(&mut payload, post_len * 8)?;
                }

                batch.push(crate::block::ParsedBlockRecord {
                    is_copy,
                    skip_flags,
                    post_transform_len: post_len,
                    checksum,
                    payload,
                });
            }

            let first_id = next_block_id;
            let results: Vec<Result<Vec<u8>, PipelineError>> = batch
                .par_iter()
                .enumerate()
                .map(|(i, record)| {
                    crate::block::invert_block(
                        record,
                        first_id + i as u64,
                        &header.transform_chain,
                        header.entropy,
                        &self.listeners,
                    )
                })
                .collect();

            for decoded in results {
                let decoded = decoded?;
                output.write_all(&decoded).map_err(|e| PipelineError::ProcessBlock {
                    block_id: next_block_id,
                    cause: ProcessBlockCause::Bitstream(e.into()),
                })?;
                total_out += decoded.len() as u64;
                next_block_id += 1;
            }

            if hit_sentinel {
                break;
            }
        }

        self.listeners.notify(&Event::new(EventType::DecompressionEnd, None, total_out));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entropy: &str, transform: &str, block_size: usize, checksum: bool) -> Config {
        let mut ctx = Context::new();
        ctx.set(keys::CODEC, entropy);
        ctx.set(keys::TRANSFORM, transform);
        ctx.set(keys::BLOCK_SIZE, block_size.to_string());
        ctx.set(keys::CHECKSUM, if checksum { "TRUE" } else { "FALSE" });
        Config::from_context(&ctx).unwrap()
    }

    fn round_trip(data: &[u8], cfg: Config) -> Vec<u8> {
        let scheduler = Scheduler::new(cfg, ListenerSet::new());
        let mut encoded = Vec::new();
        scheduler.encode(data, &mut encoded).unwrap();
        let mut decoded = Vec::new();
        scheduler.decode(encoded.as_slice(), &mut decoded).unwrap();
        decoded
    }

    #[test]
    fn empty_input_round_trips() {
        let cfg = config("HUFFMAN", "", 1024, true);
        let decoded = round_trip(b"", cfg);
        assert_eq!(decoded, b"");
    }

    #[test]
    fn single_block_round_trips() {
        let cfg = config("HUFFMAN", "RLT", 4096, true);
        let data = vec![b'A'; 4096];
        let decoded = round_trip(&data, cfg);
        assert_eq!(decoded, data);
    }

    #[test]
    fn multi_block_text_round_trips_with_compression() {
        let cfg = config("ANS0", "TEXT+BWT+MTFT+ZRLT", 4096, true);
        let data = b"The quick brown fox jumps over the lazy dog.\n".repeat(128);
        let scheduler = Scheduler::new(cfg, ListenerSet::new());
        let mut encoded = Vec::new();
        scheduler.encode(data.as_slice(), &mut encoded).unwrap();
        assert!(encoded.len() < data.len());
        let mut decoded = Vec::new();
        scheduler.decode(encoded.as_slice(), &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn multiple_jobs_round_trip_in_order() {
        let mut ctx = Context::new();
        ctx.set(keys::CODEC, "RANGE");
        ctx.set(keys::TRANSFORM, "BWT");
        ctx.set(keys::BLOCK_SIZE, "4096");
        ctx.set(keys::JOBS, "4");
        ctx.set(keys::CHECKSUM, "TRUE");
        let cfg = Config::from_context(&ctx).unwrap();
        let data = b"mississippi".repeat(100_000);
        let decoded = round_trip(&data[..1024 * 1024], cfg);
        assert_eq!(decoded, &data[..1024 * 1024]);
    }

    #[test]
    fn incompressible_random_data_copies_every_block() {
        let mut ctx = Context::new();
        ctx.set(keys::CODEC, "RANGE");
        ctx.set(keys::TRANSFORM, "BWT");
        ctx.set(keys::BLOCK_SIZE, "4096");
        ctx.set(keys::SKIP_BLOCKS, "TRUE");
        let cfg = Config::from_context(&ctx).unwrap();
        let data: Vec<u8> = (0..65536u32).map(|i| (i.wrapping_mul(2654435761) >> 16) as u8).collect();
        let decoded = round_trip(&data, cfg);
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_block_size_not_multiple_of_16() {
        let mut ctx = Context::new();
        ctx.set(keys::BLOCK_SIZE, "100");
        assert!(Config::from_context(&ctx).is_err());
    }

    #[test]
    fn caps_jobs_to_respect_batch_byte_limit() {
        let mut ctx = Context::new();
        ctx.set(keys::BLOCK_SIZE, (1usize << 28).to_string());
        ctx.set(keys::JOBS, "64");
        let cfg = Config::from_context(&ctx).unwrap();
        assert!((cfg.block_size as u64) * (cfg.jobs as u64) < MAX_BATCH_BYTES);
    }
}
