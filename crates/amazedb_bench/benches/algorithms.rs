//! Sort and search benchmarks.

use amazedb_bench::utils::generate_documents;
use amazedb_core::algorithms::{find_equal, search_by_field, sort_by_field};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

/// Benchmark stable merge sort by field.
fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_by_field");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let docs = generate_documents(count, 16);
            b.iter(|| sort_by_field(black_box(docs.clone()), "age").unwrap());
        });
    }
    group.finish();
}

/// Benchmark binary search over an already sorted sequence.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_by_field");

    for count in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let sorted = sort_by_field(generate_documents(count, 16), "age").unwrap();
            let target = json!(50);
            b.iter(|| search_by_field(black_box(&sorted), "age", &target).unwrap());
        });
    }
    group.finish();
}

/// Benchmark the sort-then-search equality path used by `get_one`.
fn bench_find_equal(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_equal");

    for count in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let docs = generate_documents(count, 16);
            let target = json!(50);
            b.iter(|| find_equal(black_box(&docs), "age", &target));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort, bench_search, bench_find_equal);
criterion_main!(benches);
