//! Criterion benchmarks for the per-block encode/decode pipeline.
//!
//! Run with:
//!   cargo bench --bench block

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bcc::block::{encode_block, read_block_record, invert_block};
use bcc::context::Context;
use bcc::entropy::EntropyCodecId;
use bcc::event::ListenerSet;
use bcc::transform::TransformId;

fn synthetic_text(size: usize) -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .cycle()
        .take(size)
        .copied()
        .collect()
}

fn bench_block_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_encode_decode");
    let chain = [TransformId::Bwt, TransformId::Mtft, TransformId::Zrlt];
    let ctx = Context::new();
    let listeners = ListenerSet::new();

    for &chunk_size in &[65_536usize, 262_144] {
        let data = synthetic_text(chunk_size);

        group.throughput(Throughput::Bytes(chunk_size as u64));
        group.bench_with_input(BenchmarkId::new("encode", chunk_size), &data, |b, data| {
            b.iter(|| encode_block(data, 0, &chain, EntropyCodecId::Range, &ctx, &listeners).unwrap())
        });

        let record = encode_block(&data, 0, &chain, EntropyCodecId::Range, &ctx, &listeners).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&record.bytes);

        group.bench_function(BenchmarkId::new("decode", chunk_size), |b| {
            b.iter(|| {
                let mut br = bcc::bitstream::DefaultInputBitStream::new(bytes.as_slice(), 65536).unwrap();
                let parsed = read_block_record(&mut br, false).unwrap();
                invert_block(&parsed, 0, &chain, EntropyCodecId::Range, &listeners).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_block_encode_decode);
criterion_main!(benches);
