// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile-fill throughput and compositor scalar-vs-batch agreement benchmarks,
//! mirroring the teacher's `benches/tiling.rs` shape (`LineIterator`-style
//! randomized inputs feeding the hot path under test).

use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion};
use criterion::measurement::WallTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vecraster::compose::{compose, compose_batch16, Compose};
use vecraster::flatten::{flatten_path, DEFAULT_TOLERANCE};
use vecraster::paint::FillRule;
use vecraster::path::Path;
use vecraster::tiling::TileGrid;
use vecraster::Rect;

const SEED: u64 = 0;

fn random_path(rng: &mut StdRng, canvas: f64, count: usize) -> Path {
    let mut path = Path::new();
    for _ in 0..count {
        let x0 = rng.gen_range(0.0..canvas);
        let y0 = rng.gen_range(0.0..canvas);
        let w = rng.gen_range(4.0..64.0);
        let h = rng.gen_range(4.0..64.0);
        path.add_rect(Rect::new(x0, y0, (x0 + w).min(canvas), (y0 + h).min(canvas)));
    }
    path
}

fn tile_fill_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_fill");
    many_small_rects(&mut group);
    few_large_rects(&mut group);
    group.finish();
}

fn many_small_rects(g: &mut BenchmarkGroup<WallTime>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let path = random_path(&mut rng, 512.0, 500);
    let subpaths = flatten_path(&path, DEFAULT_TOLERANCE);

    g.bench_function("many small rects", |b| {
        b.iter(|| {
            let grid = TileGrid::new(512, 512);
            grid.rasterize_fill(&subpaths, FillRule::NonZero)
        })
    });
}

fn few_large_rects(g: &mut BenchmarkGroup<WallTime>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let path = random_path(&mut rng, 512.0, 8);
    let subpaths = flatten_path(&path, DEFAULT_TOLERANCE);

    g.bench_function("few large rects", |b| {
        b.iter(|| {
            let grid = TileGrid::new(512, 512);
            grid.rasterize_fill(&subpaths, FillRule::NonZero)
        })
    });
}

fn compositor_scalar_vs_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositor");

    let mut rng = StdRng::seed_from_u64(SEED);
    let src: Vec<[u8; 4]> = (0..4096)
        .map(|_| [rng.gen(), rng.gen(), rng.gen::<u8>() / 2, rng.gen()])
        .collect();
    let dst: Vec<[u8; 4]> = (0..4096)
        .map(|_| [rng.gen(), rng.gen(), rng.gen::<u8>() / 2, rng.gen()])
        .collect();

    group.bench_function("scalar source-over", |b| {
        b.iter(|| {
            src.iter()
                .zip(dst.iter())
                .map(|(s, d)| compose(Compose::SourceOver, *s, *d))
                .collect::<Vec<_>>()
        })
    });

    group.bench_function("batch16 source-over", |b| {
        b.iter(|| {
            src.chunks_exact(16)
                .zip(dst.chunks_exact(16))
                .map(|(s, d)| {
                    let s: [[u8; 4]; 16] = s.try_into().unwrap();
                    let d: [[u8; 4]; 16] = d.try_into().unwrap();
                    compose_batch16(Compose::SourceOver, &s, &d)
                })
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

criterion_group!(tiling, tile_fill_throughput);
criterion_group!(compositing, compositor_scalar_vs_batch);
criterion_main!(tiling, compositing);
