//! Benchmark tests for cinestream-core operations
//!
//! Run with: cargo bench -p cinestream-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cinestream_core::catalog::{default_records, group_by_type};
use cinestream_core::quality::{quality_ladder, QualityPolicy, Rendition};
use cinestream_core::ContentRecord;

// ============================================================================
// Helpers
// ============================================================================

fn create_renditions(count: usize) -> Vec<Rendition> {
    const HEIGHTS: [u32; 6] = [240, 360, 480, 720, 1080, 2160];
    (0..count)
        .map(|i| {
            let height = HEIGHTS[i % HEIGHTS.len()];
            Rendition::new(height, height as u64 * 3_500 + i as u64)
        })
        .collect()
}

fn create_catalog(copies: usize) -> Vec<ContentRecord> {
    let base = default_records();
    (0..copies)
        .flat_map(|n| {
            base.iter().cloned().map(move |mut r| {
                r.id += (n * base.len()) as u64;
                r
            })
        })
        .collect()
}

// ============================================================================
// Quality Benchmarks
// ============================================================================

fn bench_quality_ladder(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_ladder");

    for count in [4, 16, 64] {
        let renditions = create_renditions(count);
        group.bench_with_input(BenchmarkId::new("recognized", count), &renditions, |b, r| {
            b.iter(|| quality_ladder(black_box(r), QualityPolicy::Recognized))
        });
        group.bench_with_input(BenchmarkId::new("verbatim", count), &renditions, |b, r| {
            b.iter(|| quality_ladder(black_box(r), QualityPolicy::Verbatim))
        });
    }

    group.finish();
}

// ============================================================================
// Catalog Benchmarks
// ============================================================================

fn bench_search(c: &mut Criterion) {
    let records = create_catalog(100);

    c.bench_function("search_records", |b| {
        b.iter(|| {
            records
                .iter()
                .filter(|r| r.matches(black_box("cricket")))
                .count()
        })
    });

    c.bench_function("group_by_type", |b| {
        b.iter(|| group_by_type(black_box(&records)))
    });
}

criterion_group!(benches, bench_quality_ladder, bench_search);
criterion_main!(benches);
