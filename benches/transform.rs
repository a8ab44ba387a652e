//! Criterion benchmarks for the reversible byte transforms.
//!
//! Run with:
//!   cargo bench --bench transform

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bcc::transform::{TransformId, TransformSequence};

fn synthetic_text(size: usize) -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .cycle()
        .take(size)
        .copied()
        .collect()
}

fn bench_transform_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_forward_inverse");

    let chains: &[(&str, &[TransformId])] = &[
        ("bwt_mtft_zrlt", &[TransformId::Bwt, TransformId::Mtft, TransformId::Zrlt]),
        ("rlt", &[TransformId::Rlt]),
        ("text_bwt", &[TransformId::Text, TransformId::Bwt]),
    ];

    for &chunk_size in &[65_536usize, 262_144] {
        let data = synthetic_text(chunk_size);
        for &(label, ids) in chains {
            let mut seq = TransformSequence::new(ids.to_vec()).unwrap();
            group.throughput(Throughput::Bytes(chunk_size as u64));
            group.bench_with_input(BenchmarkId::new(label, chunk_size), &data, |b, data| {
                b.iter(|| seq.forward(data).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_transform_chains);
criterion_main!(benches);
