// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The 16x16 tile grid: the unit of parallel dispatch. A [`TileGrid`] owns
//! per-tile edge/backdrop binning (`strip.rs`) and turns it into one
//! [`Tile`] per grid cell, each with its own output alpha buffer, so the
//! parallel engine (`engine.rs`) can hand whole tiles to worker threads
//! independently.

use crate::flatten::FlatLine;
use crate::geom::Point;
use crate::paint::FillRule;
use crate::strip::{self, TileBin};

pub const TILE_SIZE: u32 = 16;

/// A single tile's rasterized coverage, in grid (not pixel) coordinates.
#[derive(Clone, Debug)]
pub struct Tile {
    pub tx: u32,
    pub ty: u32,
    /// Row-major `TILE_SIZE * TILE_SIZE` alpha coverage, edge tiles padded
    /// with zero past the canvas boundary.
    pub alpha: Vec<u8>,
    /// True when every pixel in this tile has full (255) coverage — the
    /// fast path a compositor can use to skip per-pixel blending.
    pub fully_covered: bool,
    /// True when every pixel in this tile has zero coverage — the tile can
    /// be skipped entirely.
    pub empty: bool,
}

impl Tile {
    pub fn pixel_origin(&self) -> (u32, u32) {
        (self.tx * TILE_SIZE, self.ty * TILE_SIZE)
    }
}

pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let tiles_x = (width + TILE_SIZE - 1) / TILE_SIZE;
        let tiles_y = (height + TILE_SIZE - 1) / TILE_SIZE;
        TileGrid { width, height, tiles_x, tiles_y }
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    pub fn tile_index(&self, tx: u32, ty: u32) -> u32 {
        ty * self.tiles_x + tx
    }

    /// Phase 1 + 2 of spec.md §4.D: bin every segment into its tile's local
    /// `cover`/`area` arrays, then prefix-sum each tile's own cover total
    /// across its row into the backdrop every other tile in that row reads
    /// from. Both phases are serial but cheap; the expensive per-tile sweep
    /// (phase 3, [`finish_tile`]) is what callers dispatch in parallel.
    pub fn bin(&self, subpaths: &[Vec<FlatLine>]) -> (Vec<TileBin>, Vec<Vec<f32>>) {
        let bins = strip::bin_subpaths(self.tiles_x, self.tiles_y, self.width, self.height, subpaths);
        let backdrops = strip::compute_backdrops(&bins, self.tiles_x, self.tiles_y);
        (bins, backdrops)
    }

    /// Finish a single already-binned tile (phase 3) into its final [`Tile`].
    pub fn finish_tile(&self, tx: u32, ty: u32, bin: &TileBin, backdrop: &[f32], rule: FillRule) -> Tile {
        let alpha = strip::finish_tile(bin, backdrop, rule);
        let (ox, oy) = (tx * TILE_SIZE, ty * TILE_SIZE);
        let mut any_covered = false;
        let mut all_full = true;
        for ly in 0..TILE_SIZE {
            let py = oy + ly;
            if py >= self.height {
                all_full = false;
                continue;
            }
            for lx in 0..TILE_SIZE {
                let px = ox + lx;
                if px >= self.width {
                    all_full = false;
                    continue;
                }
                let a = alpha[(ly * TILE_SIZE + lx) as usize];
                any_covered |= a != 0;
                all_full &= a == 255;
            }
        }
        Tile { tx, ty, alpha, fully_covered: any_covered && all_full, empty: !any_covered }
    }

    /// Serial convenience entry point running all three phases of §4.D
    /// in-thread: bin, compute backdrops, then finish every tile in turn.
    /// The parallel engine instead calls [`Self::bin`]/[`Self::finish_tile`]
    /// directly so phase 3 can run as independent per-tile worker jobs.
    pub fn rasterize_fill(&self, subpaths: &[Vec<FlatLine>], rule: FillRule) -> Vec<Tile> {
        let (bins, backdrops) = self.bin(subpaths);
        let mut tiles = Vec::with_capacity(self.tile_count() as usize);
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let idx = self.tile_index(tx, ty) as usize;
                tiles.push(self.finish_tile(tx, ty, &bins[idx], &backdrops[idx], rule));
            }
        }
        tiles
    }
}

/// Detect whether a single closed subpath (already flattened) is an
/// axis-aligned rectangle, the fast path the teacher's `rect.rs` takes to
/// skip general tile binning. Returns the rectangle's corners in `(min, max)`
/// form if so.
pub fn as_axis_aligned_rect(lines: &[FlatLine]) -> Option<(Point, Point)> {
    if lines.len() != 4 {
        return None;
    }
    let pts: Vec<Point> = lines.iter().map(|l| l.p0).collect();
    let xs: Vec<f64> = pts.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = pts.iter().map(|p| p.y).collect();

    let is_axis_aligned = lines.iter().all(|l| {
        (l.p0.x - l.p1.x).abs() < 1e-6 || (l.p0.y - l.p1.y).abs() < 1e-6
    });
    if !is_axis_aligned {
        return None;
    }

    let (min_x, max_x) = (xs.iter().cloned().fold(f64::MAX, f64::min), xs.iter().cloned().fold(f64::MIN, f64::max));
    let (min_y, max_y) = (ys.iter().cloned().fold(f64::MAX, f64::min), ys.iter().cloned().fold(f64::MIN, f64::max));

    // Every vertex must be one of the four corners for this to be a simple
    // axis-aligned rectangle rather than some other rectilinear shape.
    let is_corner = |p: &Point| {
        (p.x == min_x || p.x == max_x) && (p.y == min_y || p.y == max_y)
    };
    if pts.iter().all(is_corner) {
        Some((Point::new(min_x, min_y), Point::new(max_x, max_y)))
    } else {
        None
    }
}
