//! Grant Selection Benchmarks
//!
//! Measures parsing of the comma-separated operation selection:
//! - Short, well-formed selections
//! - Mixed selections with out-of-range and non-numeric tokens
//! - Long selections with whitespace and duplicates

use bibliotheca::parse_selection;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_parse_short_selection(c: &mut Criterion) {
    c.bench_function("parse_selection_short", |b| {
        b.iter(|| parse_selection(black_box("1,2,3")));
    });
}

fn bench_parse_mixed_selection(c: &mut Criterion) {
    c.bench_function("parse_selection_mixed", |b| {
        b.iter(|| parse_selection(black_box("1,3,9,abc,5, ,-2,7")));
    });
}

fn bench_parse_long_selection(c: &mut Criterion) {
    let input: String = (0..500).map(|i| format!(" {} ", i % 9)).collect::<Vec<_>>().join(",");

    c.bench_function("parse_selection_long", |b| {
        b.iter(|| parse_selection(black_box(&input)));
    });
}

criterion_group!(
    benches,
    bench_parse_short_selection,
    bench_parse_mixed_selection,
    bench_parse_long_selection
);
criterion_main!(benches);
