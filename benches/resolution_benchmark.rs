//! Lookup Resolution Benchmarks
//!
//! Covers expression parsing, container preparation and read paths for both arities.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use std::sync::Arc;
use uplook::{MapLookup, UpLook, UpLookConfig, parse};

const TEST_EXPRESSIONS: &[(&str, &str)] = &[
    ("literal", "just a plain value"),
    ("no_arguments", "~uuid()"),
    ("key", "~lookup(\"one\")"),
    ("json_default", "~~lookup(\"four\", {\"hosts\": [\"a\", \"b\"], \"port\": 8080})"),
];

fn settings(width: usize) -> Value {
    let fields: serde_json::Map<String, Value> = (0..width)
        .map(|i| {
            let value = match i % 3 {
                0 => json!(format!("~lookup(\"{i}\", \"fallback\")")),
                1 => json!({"nested": format!("~~lookup(\"{i}\")"), "plain": i}),
                _ => json!(i),
            };
            (format!("field_{i}"), value)
        })
        .collect();
    Value::Object(fields)
}

fn table(width: usize) -> MapLookup {
    MapLookup::new((0..width).map(|i| (i.to_string(), json!(i))))
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Elements(1));

    for (complexity, expression) in TEST_EXPRESSIONS {
        group.bench_with_input(
            BenchmarkId::new("parse", complexity),
            expression,
            |b, expr| b.iter(|| black_box(parse(black_box(expr)))),
        );
    }

    group.finish();
}

fn bench_preparation(c: &mut Criterion) {
    let mut group = c.benchmark_group("preparation");

    for width in [10, 100, 1000] {
        let input = settings(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("prepare", width), &input, |b, input| {
            b.iter(|| {
                let values = UpLook::from_json(input.clone()).unwrap();
                black_box(values.prepare())
            })
        });
    }

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");
    group.throughput(Throughput::Elements(1));

    let values = UpLook::from_json(json!({
        "static": "~lookup(\"1\")",
        "dynamic": "~~lookup(\"1\")",
        "fallback": "~~lookup(\"missing\", [1, 2, 3])",
        "plain": "value",
    }))
    .unwrap();
    values.register_function("lookup", Arc::new(table(10)));
    values.prepare().unwrap();

    for field in ["plain", "static", "dynamic", "fallback"] {
        group.bench_function(field, |b| b.iter(|| black_box(values.get(black_box(field)))));
    }

    let timed = UpLook::with_config(
        [("dynamic", json!("~~lookup(\"1\")"))],
        UpLookConfig::strict(),
    )
    .unwrap();
    timed.register_function("lookup", Arc::new(table(10)));
    group.bench_function("dynamic_with_timeout", |b| {
        b.iter(|| black_box(timed.get("dynamic")))
    });

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(50);

    for width in [10, 100, 1000] {
        let values = UpLook::from_json(settings(width)).unwrap();
        values.register_function("lookup", Arc::new(table(width)));
        group.throughput(Throughput::Elements(width as u64));
        group.bench_function(BenchmarkId::new("export", width), |b| {
            b.iter(|| black_box(values.export()))
        });
    }

    group.finish();
}

criterion_group!(
    resolution_benchmarks,
    bench_parser,
    bench_preparation,
    bench_reads,
    bench_export
);

criterion_main!(resolution_benchmarks);
