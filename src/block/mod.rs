//! Per-block encode/decode pipeline.
//!
//! Generalizes a per-chunk compress/decompress split (one fixed block
//! format in, out again) into "run the block's configured transform chain,
//! then its configured entropy codec". [`crate::scheduler`] drives this
//! module per block and owns the shared container bitstream; this module
//! never touches it directly.
//!
//! **Design note (concurrency split)**: a literal reading of the ordering
//! barrier would have the entropy coder itself run under that barrier,
//! writing mode/length/checksum/payload directly into the shared bitstream
//! as it goes. Here, each block's entropy payload is instead rendered into
//! its own private, self-contained bitstream (a `DefaultOutputBitStream<Vec<u8>>`
//! that is opened, written, closed, and unwrapped entirely inside
//! [`encode_block`]) *before* the barrier is reached. The already-finished
//! bytes are then spliced into the shared stream as a single byte-run write
//! by the scheduler, so only that final write contends on the shared
//! bitstream rather than a stateful bit-level coder running inside the
//! locked section. This keeps the barrier's critical section to a plain
//! byte copy.

use crate::context::keys;
use crate::context::Context;
use crate::entropy::ans::{AnsOrder0Decoder, AnsOrder0Encoder, AnsOrder1Decoder, AnsOrder1Encoder};
use crate::entropy::binary::{BinaryDecoder, BinaryEncoder};
use crate::entropy::huffman::{HuffmanDecoder, HuffmanEncoder};
use crate::entropy::null::{NullDecoder, NullEncoder};
use crate::entropy::predictors::{cm::CmPredictor, fpaq::FpaqPredictor, tpaq::TpaqPredictor};
use crate::entropy::range::{RangeDecoder, RangeEncoder};
use crate::entropy::{EntropyCodecId, EntropyDecoder, EntropyEncoder, EntropyError};
use crate::error::{PipelineError, ProcessBlockCause};
use crate::event::{Event, EventType, ListenerSet};
use crate::transform::{TransformId, TransformSequence};
use crate::util;

use crate::bitstream::{DefaultInputBitStream, DefaultOutputBitStream};

pub use crate::config::SMALL_BLOCK_SIZE;

/// Order-0 entropy (bits/byte) above which `skipBlocks=true` treats a block
/// as incompressible and copies it instead of running the pipeline.
pub const INCOMPRESSIBLE_ENTROPY_THRESHOLD: f64 = 7.5;

const COPY_BLOCK_MASK: u8 = 0b1000_0000;
const DATA_SIZE_SHIFT: u8 = 5;
const EXTENDED_SKIP_MASK: u8 = 0b0001_0000;
const SKIP_BITMAP_MASK: u8 = 0b0000_1111;

/// A fully rendered block record ("Block record"), ready to be
/// spliced byte-for-byte into the container's shared bitstream.
pub struct EncodedBlockRecord {
    pub bytes: Vec<u8>,
    pub original_len: usize,
    pub post_transform_len: usize,
    pub checksum: Option<u32>,
    pub is_copy: bool,
}

fn bytes_needed(len: usize) -> u8 {
    if len == 0 {
        return 1;
    }
    let bits = usize::BITS - (len as u32).leading_zeros();
    (((bits + 7) / 8).max(1)).min(4) as u8
}

fn entropy_buffer_size(len: usize) -> usize {
    let want = (len.max(1) + 64).next_power_of_two();
    want.clamp(1024, 1 << 20)
}

fn encode_entropy(data: &[u8], codec: EntropyCodecId) -> Result<Vec<u8>, EntropyError> {
    let buf_size = entropy_buffer_size(data.len());
    let mut bw = DefaultOutputBitStream::new(Vec::new(), buf_size)?;
    match codec {
        EntropyCodecId::Null => {
            let mut enc = NullEncoder::new(&mut bw);
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::Huffman => {
            let mut enc = HuffmanEncoder::new(&mut bw);
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::Range => {
            let mut enc = RangeEncoder::new(&mut bw);
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::AnsOrder0 => {
            let mut enc = AnsOrder0Encoder::new(&mut bw);
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::AnsOrder1 => {
            let mut enc = AnsOrder1Encoder::new(&mut bw);
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::BinaryFpaq => {
            let mut enc = BinaryEncoder::new(&mut bw, FpaqPredictor::new());
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::BinaryCm => {
            let mut enc = BinaryEncoder::new(&mut bw, CmPredictor::new());
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::BinaryTpaq => {
            let mut enc = BinaryEncoder::new(&mut bw, TpaqPredictor::new_tpaq());
            enc.encode(data)?;
            enc.finish()?;
        }
        EntropyCodecId::BinaryTpaqx => {
            let mut enc = BinaryEncoder::new(&mut bw, TpaqPredictor::new_tpaqx());
            enc.encode(data)?;
            enc.finish()?;
        }
    }
    bw.into_inner().map_err(Into::into)
}

fn decode_entropy(payload: &[u8], codec: EntropyCodecId, out_len: usize) -> Result<Vec<u8>, EntropyError> {
    let buf_size = entropy_buffer_size(payload.len());
    let mut br = DefaultInputBitStream::new(payload, buf_size)?;
    let mut out = vec![0u8; out_len];
    match codec {
        EntropyCodecId::Null => {
            let mut dec = NullDecoder::new(&mut br);
            dec.decode(&mut out)?;
        }
        EntropyCodecId::Huffman => {
            let mut dec = HuffmanDecoder::new(&mut br);
            dec.decode(&mut out)?;
        }
        EntropyCodecId::Range => {
            let mut dec = RangeDecoder::new(&mut br)?;
            dec.decode(&mut out)?;
        }
        EntropyCodecId::AnsOrder0 => {
            let mut dec = AnsOrder0Decoder::new(&mut br);
            dec.decode(&mut out)?;
        }
        EntropyCodecId::AnsOrder1 => {
            let mut dec = AnsOrder1Decoder::new(&mut br);
            dec.decode(&mut out)?;
        }
        EntropyCodecId::BinaryFpaq => {
            let mut dec = BinaryDecoder::new(&mut br, FpaqPredictor::new())?;
            dec.decode(&mut out)?;
        }
        EntropyCodecId::BinaryCm => {
            let mut dec = BinaryDecoder::new(&mut br, CmPredictor::new())?;
            dec.decode(&mut out)?;
        }
        EntropyCodecId::BinaryTpaq => {
            let mut dec = BinaryDecoder::new(&mut br, TpaqPredictor::new_tpaq())?;
            dec.decode(&mut out)?;
        }
        EntropyCodecId::BinaryTpaqx => {
            let mut dec = BinaryDecoder::new(&mut br, TpaqPredictor::new_tpaqx())?;
            dec.decode(&mut out)?;
        }
    }
    Ok(out)
}

fn process_err(block_id: u64, cause: ProcessBlockCause) -> PipelineError {
    PipelineError::ProcessBlock { block_id, cause }
}

/// Runs the forward pipeline for one block ("Steps (forward)").
pub fn encode_block(
    data: &[u8],
    block_id: u64,
    transform_chain: &[TransformId],
    entropy: EntropyCodecId,
    ctx: &Context,
    listeners: &ListenerSet,
) -> Result<EncodedBlockRecord, PipelineError> {
    let want_checksum = ctx.get_bool(keys::CHECKSUM).unwrap_or(None).unwrap_or(false);
    let skip_blocks = ctx.get_bool(keys::SKIP_BLOCKS).unwrap_or(None).unwrap_or(false);

    let checksum = if want_checksum { Some(util::block_checksum(data)) } else { None };
    listeners.notify(&Event::new(EventType::BeforeTransform, Some(block_id), data.len() as u64));

    let is_small = data.len() <= SMALL_BLOCK_SIZE;
    let is_incompressible = skip_blocks && util::order0_entropy(data) > INCOMPRESSIBLE_ENTROPY_THRESHOLD;
    let copy = is_small || is_incompressible;

    let (payload, post_len, skip_flags) = if copy {
        (data.to_vec(), data.len(), 0xFFu8)
    } else {
        let mut seq = TransformSequence::new(transform_chain.to_vec())
            .map_err(|e| process_err(block_id, ProcessBlockCause::Transform(e)))?;
        let (transformed, skip_flags) =
            seq.forward(data).map_err(|e| process_err(block_id, ProcessBlockCause::Transform(e)))?;
        let payload = encode_entropy(&transformed, entropy)
            .map_err(|e| process_err(block_id, ProcessBlockCause::Entropy(e)))?;
        (payload, transformed.len(), skip_flags)
    };

    let data_size = bytes_needed(post_len);
    let extended = transform_chain.len() > 4;

    let mut mode = 0u8;
    if copy {
        mode |= COPY_BLOCK_MASK;
    }
    mode |= (data_size - 1) << DATA_SIZE_SHIFT;
    if extended {
        mode |= EXTENDED_SKIP_MASK;
    } else {
        mode |= skip_flags & SKIP_BITMAP_MASK;
    }

    let mut bytes = Vec::with_capacity(payload.len() + 8);
    bytes.push(mode);
    if extended {
        bytes.push(skip_flags);
    }
    for i in (0..data_size).rev() {
        bytes.push(((post_len >> (8 * i as u32)) & 0xFF) as u8);
    }
    if let Some(c) = checksum {
        bytes.extend_from_slice(&c.to_be_bytes());
    }
    bytes.extend_from_slice(&payload);

    let mut after_entropy = Event::new(EventType::AfterEntropy, Some(block_id), bytes.len() as u64);
    if let Some(c) = checksum {
        after_entropy = after_entropy.with_checksum(c);
    }
    listeners.notify(&after_entropy);

    Ok(EncodedBlockRecord { bytes, original_len: data.len(), post_transform_len: post_len, checksum, is_copy: copy })
}

/// A parsed-but-not-yet-inverted block record, as read back from the
/// container's shared bitstream.
pub struct ParsedBlockRecord {
    pub is_copy: bool,
    pub skip_flags: u8,
    pub post_transform_len: usize,
    pub checksum: Option<u32>,
    pub payload: Vec<u8>,
}

/// Reads one block record's framing (mode/length/checksum/payload) from the
/// shared input bitstream. Does not run the inverse transform/entropy
/// stages; callers combine this with [`invert_block`].
pub fn read_block_record<R: std::io::Read>(
    br: &mut DefaultInputBitStream<R>,
    has_checksum: bool,
) -> Result<ParsedBlockRecord, PipelineError> {
    let mode = br
        .read_bits(8)
        .map_err(|e| process_err(0, ProcessBlockCause::Bitstream(e)))? as u8;
    let is_copy = mode & COPY_BLOCK_MASK != 0;
    let data_size = ((mode >> DATA_SIZE_SHIFT) & 0b11) + 1;
    let extended = mode & EXTENDED_SKIP_MASK != 0;

    let skip_flags = if extended {
        br.read_bits(8)
            .map_err(|e| process_err(0, ProcessBlockCause::Bitstream(e)))? as u8
    } else {
        mode & SKIP_BITMAP_MASK
    };

    let mut post_transform_len: usize = 0;
    for _ in 0..data_size {
        let b = br
            .read_bits(8)
            .map_err(|e| process_err(0, ProcessBlockCause::Bitstream(e)))? as usize;
        post_transform_len = (post_transform_len << 8) | b;
    }

    let checksum = if has_checksum {
        Some(
            br.read_bits(32)
                .map_err(|e| process_err(0, ProcessBlockCause::Bitstream(e)))? as u32,
        )
    } else {
        None
    };

    let mut payload = vec![0u8; post_transform_len];
    if post_transform_len > 0 {
        br.read_bits_bytes(&mut payload, post_transform_len * 8)
            .map_err(|e| process_err(0, ProcessBlockCause::Bitstream(e)))?;
    }

    Ok(ParsedBlockRecord { is_copy, skip_flags, post_transform_len, checksum, payload })
}

/// Runs the inverse pipeline for one parsed block record: reads the header,
/// runs the inverse transform sequence, ...
/// verifies the checksum").
pub fn invert_block(
    record: &ParsedBlockRecord,
    block_id: u64,
    transform_chain: &[TransformId],
    entropy: EntropyCodecId,
    listeners: &ListenerSet,
) -> Result<Vec<u8>, PipelineError> {
    listeners.notify(&Event::new(
        EventType::BeforeEntropyDecode,
        Some(block_id),
        record.post_transform_len as u64,
    ));

    let data = if record.is_copy {
        record.payload.clone()
    } else {
        let transformed = decode_entropy(&record.payload, entropy, record.post_transform_len)
            .map_err(|e| process_err(block_id, ProcessBlockCause::Entropy(e)))?;
        let mut seq = TransformSequence::new(transform_chain.to_vec())
            .map_err(|e| process_err(block_id, ProcessBlockCause::Transform(e)))?;
        seq.inverse(&transformed, record.skip_flags)
            .map_err(|e| process_err(block_id, ProcessBlockCause::Transform(e)))?
    };

    if let Some(expected) = record.checksum {
        let actual = util::block_checksum(&data);
        if actual != expected {
            return Err(process_err(block_id, ProcessBlockCause::ChecksumMismatch { expected, actual }));
        }
    }

    listeners.notify(&Event::new(EventType::AfterInverseTransform, Some(block_id), data.len() as u64));
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(checksum: bool, skip_blocks: bool) -> Context {
        let mut ctx = Context::new();
        ctx.set(keys::CHECKSUM, if checksum { "TRUE" } else { "FALSE" });
        ctx.set(keys::SKIP_BLOCKS, if skip_blocks { "TRUE" } else { "FALSE" });
        ctx
    }

    fn round_trip(data: &[u8], chain: &[TransformId], entropy: EntropyCodecId, checksum: bool, skip_blocks: bool) {
        let ctx = ctx_with(checksum, skip_blocks);
        let listeners = ListenerSet::new();
        let record = encode_block(data, 1, chain, entropy, &ctx, &listeners).unwrap();

        let mut source = std::io::Cursor::new(record.bytes.clone());
        let mut br = DefaultInputBitStream::new(&mut source, 1024).unwrap();
        let parsed = read_block_record(&mut br, checksum).unwrap();
        assert_eq!(parsed.is_copy, record.is_copy);

        let decoded = invert_block(&parsed, 1, chain, entropy, &listeners).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_small_block_as_copy() {
        round_trip(b"hi", &[TransformId::Bwt], EntropyCodecId::Huffman, true, false);
    }

    #[test]
    fn round_trips_text_block_with_huffman() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(20);
        round_trip(&data, &[TransformId::Bwt, TransformId::Zrlt], EntropyCodecId::Huffman, true, false);
    }

    #[test]
    fn round_trips_with_ans_and_no_transform() {
        let data = b"aaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbcccccccccccccccccccc".to_vec();
        round_trip(&data, &[], EntropyCodecId::AnsOrder0, false, false);
    }

    #[test]
    fn round_trips_with_binary_fpaq() {
        let data = b"mississippi river mississippi river mississippi river".to_vec();
        round_trip(&data, &[TransformId::Bwt], EntropyCodecId::BinaryFpaq, true, false);
    }

    #[test]
    fn incompressible_random_block_is_copied() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
        let ctx = ctx_with(false, true);
        let listeners = ListenerSet::new();
        let record = encode_block(&data, 1, &[TransformId::Bwt], EntropyCodecId::Range, &ctx, &listeners).unwrap();
        assert!(record.is_copy);
    }

    #[test]
    fn checksum_mismatch_is_detected() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(10);
        let ctx = ctx_with(true, false);
        let listeners = ListenerSet::new();
        let record = encode_block(&data, 1, &[TransformId::Bwt], EntropyCodecId::Huffman, &ctx, &listeners).unwrap();
        let mut bytes = record.bytes.clone();
        *bytes.last_mut().unwrap() ^= 0xFF;

        let mut source = std::io::Cursor::new(bytes);
        let mut br = DefaultInputBitStream::new(&mut source, 1024).unwrap();
        let parsed = read_block_record(&mut br, true).unwrap();
        let result = invert_block(&parsed, 1, &[TransformId::Bwt], EntropyCodecId::Huffman, &listeners);
        assert!(result.is_err());
    }
}
