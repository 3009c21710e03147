use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stratum::cache::{DocumentChunk, RamCacheConfig, RamVectorCache};
use stratum::embedding::StubEmbedder;
use stratum::similarity::{ScoredSlot, cosine_distance, select_top_k};

const DIM: usize = 384;

fn populated_cache(documents: usize) -> (RamVectorCache, StubEmbedder) {
    let embedder = StubEmbedder::new(DIM);
    let cache = RamVectorCache::new(RamCacheConfig::new(64 * 1024 * 1024, DIM, documents))
        .expect("bench config");

    let chunks: Vec<DocumentChunk> = (0..documents)
        .map(|i| DocumentChunk::new(format!("doc-{i}"), format!("lecture notes section {i}")))
        .collect();
    let embeddings: Vec<Vec<f32>> = chunks
        .iter()
        .map(|chunk| embedder.embed_sync(&chunk.text))
        .collect();
    cache.add_documents(&chunks, &embeddings).expect("insert");

    (cache, embedder)
}

fn bench_cosine_distance(c: &mut Criterion) {
    let embedder = StubEmbedder::new(DIM);
    let a = embedder.embed_sync("syllabus");
    let b = embedder.embed_sync("grading policy");

    c.bench_function("cosine_distance_384", |bench| {
        bench.iter(|| cosine_distance(black_box(&a), black_box(&b)))
    });
}

fn bench_select_top_k(c: &mut Criterion) {
    let candidates: Vec<ScoredSlot> = (0..10_000u32)
        .map(|slot| ScoredSlot {
            slot,
            distance: ((slot * 7919) % 10_000) as f32 / 10_000.0,
        })
        .collect();

    c.bench_function("select_top_10_of_10k", |bench| {
        bench.iter(|| select_top_k(black_box(candidates.clone()), 10))
    });
}

fn bench_cache_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("ram_cache_search");
    for documents in [1_000usize, 10_000] {
        let (cache, embedder) = populated_cache(documents);
        let query = embedder.embed_sync("when is the next exam?");

        group.bench_with_input(BenchmarkId::from_parameter(documents), &query, |bench, q| {
            bench.iter(|| cache.search(black_box(q), 10).expect("search"))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cosine_distance,
    bench_select_top_k,
    bench_cache_search
);
criterion_main!(benches);
