//! Classification and grouping benchmark
//!
//! Nightly evidence for a large control catalog carries a few hundred
//! findings per result and a few dozen results per artifact. Both the
//! classifier and the grouper run once per evaluation, so they should stay
//! well under the cost of reading the artifacts from disk.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench classification
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Map;
use umbral::artifact::{Artifact, AssessmentResult, Finding, FindingState, Property, Timestamp};
use umbral::grouping::group_results;
use umbral::properties::{PropertyKeys, CURRENT_NAMESPACE};
use umbral::regression::evaluate;

/// A result with `size` findings; every `flip_every`-th one is not satisfied
fn create_bench_result(uuid: &str, day: u32, size: usize, flip_every: usize) -> AssessmentResult {
    let findings = (0..size)
        .map(|i| {
            let state = if i % flip_every == 0 {
                FindingState::NotSatisfied
            } else {
                FindingState::Satisfied
            };
            Finding::new(format!("ac-{i}_smt"), state)
        })
        .collect();
    AssessmentResult {
        uuid: uuid.to_string(),
        title: None,
        description: String::new(),
        start: Timestamp::parse(&format!("2024-01-{:02}T00:00:00Z", day % 28 + 1)).unwrap(),
        end: None,
        props: vec![Property::new("target", CURRENT_NAMESPACE, format!("cluster-{}", day % 4))],
        observations: Vec::new(),
        findings,
        extra: Map::new(),
    }
}

/// Benchmark: classify threshold vs latest at increasing catalog sizes
fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    for size in [10, 100, 1000] {
        let threshold = create_bench_result("threshold", 1, size, 7);
        let latest = create_bench_result("latest", 2, size, 5);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| evaluate(black_box(&threshold), black_box(&latest)));
        });
    }

    group.finish();
}

/// Benchmark: group many results from one artifact by target
fn bench_grouping(c: &mut Criterion) {
    let artifact = Artifact {
        uuid: "bench".to_string(),
        metadata: Default::default(),
        results: (0..64)
            .map(|i| create_bench_result(&format!("r{i}"), i, 100, 9))
            .collect(),
        extra: Map::new(),
    };
    let keys = PropertyKeys::default();

    c.bench_function("group_results_64x100", |b| {
        b.iter(|| group_results([("bench.yaml", black_box(&artifact))], &keys));
    });
}

criterion_group!(benches, bench_classification, bench_grouping);
criterion_main!(benches);
