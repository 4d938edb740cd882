//! Benchmarks for masonry packing.
//!
//! Run with: cargo bench -p cardgrid-layout

use cardgrid_layout::{GridMetrics, MasonryGrid, PackItem, Section, Unmeasured, pack};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// `n` items with a repeating mix of spans and heights.
fn make_items(n: usize) -> Vec<PackItem> {
    (0..n)
        .map(|i| {
            let span = match i % 7 {
                0 => 2,
                3 => 3,
                _ => 1,
            };
            PackItem::new(format!("s{i}"), span, 80.0 + (i * 37 % 240) as f64)
        })
        .collect()
}

fn make_sections(n: usize) -> Vec<Section> {
    const TYPES: [&str; 6] = ["info", "analytics", "map", "list", "news", "chart"];
    (0..n)
        .map(|i| {
            Section::new(format!("Section {i}"))
                .with_id(format!("s{i}"))
                .with_type(TYPES[i % TYPES.len()])
        })
        .collect()
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("masonry/pack");
    let metrics = GridMetrics::default();

    for n in [5, 20, 100, 500] {
        let items = make_items(n);
        group.bench_with_input(BenchmarkId::new("desktop", n), &items, |b, items| {
            b.iter(|| black_box(pack(items, 1920.0, &metrics)))
        });
        group.bench_with_input(BenchmarkId::new("mobile", n), &items, |b, items| {
            b.iter(|| black_box(pack(items, 375.0, &metrics)))
        });
    }

    group.finish();
}

fn bench_max_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("masonry/max_columns");
    let items = make_items(200);

    for max_columns in [1, 2, 4, 8, 12] {
        let metrics = GridMetrics {
            min_column_width: 120.0,
            max_columns,
            gap: 12.0,
        };
        group.bench_with_input(
            BenchmarkId::new("columns", max_columns),
            &metrics,
            |b, metrics| b.iter(|| black_box(pack(&items, 2560.0, metrics))),
        );
    }

    group.finish();
}

fn bench_grid_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("masonry/grid_resize");
    let sections = make_sections(60);

    group.bench_function("resize_cycle", |b| {
        b.iter_batched(
            || {
                let mut grid = MasonryGrid::new(GridMetrics::default(), 1920.0);
                grid.set_sections(&sections);
                grid
            },
            |mut grid| {
                for width in [1920.0, 1280.0, 800.0, 375.0] {
                    grid.set_container_width(width);
                    black_box(grid.layout(&Unmeasured).map(|p| p.total_height()).ok());
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_pack, bench_max_columns, bench_grid_resize);

criterion_main!(benches);
