//! Filter evaluation benchmarks.

use amazedb_bench::utils::generate_documents;
use amazedb_core::Filters;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

const DOCUMENTS: usize = 10_000;

/// Benchmark one full matching pass per filter shape.
fn bench_filters(c: &mut Criterion) {
    let docs = generate_documents(DOCUMENTS, 16);
    let mut group = c.benchmark_group("filter_pass");
    group.throughput(Throughput::Elements(DOCUMENTS as u64));

    let cases = [
        ("equality", Filters::new().eq("age", 42)),
        ("range", Filters::new().gte("age", 20).lt("age", 40)),
        (
            "regex",
            Filters::from_json(&json!({"name": {"__re": "^a.*z$"}})).unwrap(),
        ),
        (
            "custom",
            Filters::new().custom("age", |v| Ok(v.as_i64().is_some_and(|n| n % 7 == 0))),
        ),
        ("missing_field", Filters::new().eq("absent", 1)),
    ];

    for (name, filters) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for doc in black_box(&docs) {
                    if filters.matches(doc).unwrap() {
                        hits += 1;
                    }
                }
                hits
            });
        });
    }
    group.finish();
}

/// Benchmark parsing the JSON filter syntax.
fn bench_parse(c: &mut Criterion) {
    let query = json!({
        "age": {"__gte": 18, "__lt": 65},
        "name": {"__re": "^[a-m]"},
        "id": {"__ne": 0},
    });
    c.bench_function("filter_parse", |b| {
        b.iter(|| Filters::from_json(black_box(&query)).unwrap());
    });
}

criterion_group!(benches, bench_filters, bench_parse);
criterion_main!(benches);
