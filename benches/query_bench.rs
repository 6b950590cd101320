//! Aggregation and ranking benchmarks
//!
//! Measures the two hot paths of a patient query:
//! 1. Averaging a handful of phenotype embeddings
//! 2. Exact k-NN ranking against every disease aggregate

use std::hint::black_box;
use std::num::NonZeroUsize;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use phenomatch::vector::Metadata;
use phenomatch::{Aggregator, Collection, DistanceMetric, EmbeddingCache, QueryService, ReadOnlyStore};

const DIMENSION: usize = 200;
const PHENOTYPES: usize = 5_000;

/// Deterministic pseudo-random vector so runs are comparable.
fn synthetic_vector(seed: usize) -> Vec<f32> {
    let mut state = (seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..DIMENSION)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / u32::MAX as f32) - 0.25
        })
        .collect()
}

fn phenotype_id(n: usize) -> String {
    format!("HP:{n:07}")
}

fn build_cache() -> EmbeddingCache {
    EmbeddingCache::from_pairs((0..PHENOTYPES).map(|n| (phenotype_id(n), synthetic_vector(n))))
}

fn build_diseases(count: usize) -> Collection {
    let mut collection = Collection::new("bench", std::env::temp_dir(), DistanceMetric::Cosine);
    for n in 0..count {
        collection
            .upsert(
                &format!("OMIM:{n:06}"),
                synthetic_vector(PHENOTYPES + n),
                Metadata::new(),
            )
            .expect("upsert failed");
    }
    collection
}

fn bench_average(c: &mut Criterion) {
    let cache = build_cache();
    let mut group = c.benchmark_group("aggregate_average");

    for terms in [1usize, 5, 20, 100] {
        let ids: Vec<String> = (0..terms).map(|n| phenotype_id(n * 37 % PHENOTYPES)).collect();
        group.throughput(Throughput::Elements(terms as u64));
        group.bench_with_input(BenchmarkId::from_parameter(terms), &ids, |b, ids| {
            b.iter(|| Aggregator::average(black_box(ids), &cache))
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let cache = build_cache();
    let query: Vec<String> = (0..8).map(|n| phenotype_id(n * 101)).collect();
    let k = NonZeroUsize::new(10).expect("non-zero");
    let mut group = c.benchmark_group("query_top10");

    for diseases in [1_000usize, 10_000] {
        let collection = build_diseases(diseases);
        let store = ReadOnlyStore::new(&collection);
        let service = QueryService::new(&cache, &store);

        group.throughput(Throughput::Elements(diseases as u64));
        group.bench_function(BenchmarkId::from_parameter(diseases), |b| {
            b.iter(|| service.query(black_box(query.as_slice()), k))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_average, bench_query);
criterion_main!(benches);
