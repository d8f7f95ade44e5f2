use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use documind::documents::Chunker;
use documind::embedding::HashingEmbedder;
use documind::VectorIndex;

fn corpus(records: usize) -> Vec<String> {
    (0..records)
        .map(|i| {
            format!(
                "Record {} covers topic {} with details about item {} and region {}.",
                i,
                i % 17,
                i % 101,
                i % 7
            )
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for records in [100, 1_000, 10_000] {
        let mut index = VectorIndex::new(Arc::new(HashingEmbedder::default()));
        index.add(&corpus(records), None).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(records), &index, |b, index| {
            b.iter(|| index.search(black_box("details about topic 3 in region 5"), 5))
        });
    }

    group.finish();
}

fn bench_chunk(c: &mut Criterion) {
    let text = "A sentence of moderate length for the chunker to split. ".repeat(2_000);
    let chunker = Chunker::default();

    c.bench_function("chunk_112k_chars", |b| b.iter(|| chunker.chunk(black_box(&text))));
}

criterion_group!(benches, bench_search, bench_chunk);
criterion_main!(benches);
