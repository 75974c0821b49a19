// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ties the [`TileGrid`], [`WorkerPool`] and [`DirtyAtlas`] together: the
//! parallel tile engine. [`TileEngine::rasterize_and_composite`] is the main
//! entry point — it bins and backdrop-prefixes the path serially (cheap),
//! then dispatches the expensive per-tile coverage sweep and its compositing
//! into the pixmap as one worker-pool job per tile (component H).

use std::sync::{Arc, Mutex};

use crate::cancel::CancelToken;
use crate::color::{Premultiplied, Rgba};
use crate::compose::{self, Compose};
use crate::dirty::DirtyAtlas;
use crate::error::RasterError;
use crate::flatten::FlatLine;
use crate::paint::FillRule;
use crate::pixmap::Pixmap;
use crate::pool::WorkerPool;
use crate::strip;
use crate::tiling::{Tile, TileGrid, TILE_SIZE};

/// Per-pixel color source a composite pass samples from: either a constant
/// premultiplied color or an arbitrary callback (gradients, custom brushes).
pub type ColorSource = Arc<dyn Fn(u32, u32) -> Rgba + Send + Sync>;

pub fn solid_source(color: Rgba) -> ColorSource {
    Arc::new(move |_x, _y| color)
}

pub struct TileEngine {
    grid: TileGrid,
    pool: WorkerPool,
    dirty: Arc<DirtyAtlas>,
    pixmap: Arc<Mutex<Pixmap>>,
    tile_free_list: Mutex<Vec<Vec<u8>>>,
}

impl TileEngine {
    pub fn new(pixmap: Pixmap, worker_count: usize) -> Self {
        let grid = TileGrid::new(pixmap.width(), pixmap.height());
        let dirty = Arc::new(DirtyAtlas::new(grid.tile_count().max(1)));
        TileEngine {
            pool: WorkerPool::new(worker_count),
            dirty,
            pixmap: Arc::new(Mutex::new(pixmap)),
            grid,
            tile_free_list: Mutex::new(Vec::new()),
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn dirty(&self) -> &DirtyAtlas {
        &self.dirty
    }

    /// Take a zeroed `TILE_SIZE * TILE_SIZE` alpha buffer from the free
    /// list, allocating a fresh one if the pool is empty.
    pub fn acquire_tile_buffer(&self) -> Vec<u8> {
        let mut free = self.tile_free_list.lock().unwrap();
        free.pop().unwrap_or_else(|| vec![0u8; (TILE_SIZE * TILE_SIZE) as usize])
    }

    /// Return a buffer to the free list, clearing it to transparent first so
    /// the next `acquire` always sees zeroed memory.
    pub fn release_tile_buffer(&self, mut buf: Vec<u8>) {
        buf.iter_mut().for_each(|b| *b = 0);
        self.tile_free_list.lock().unwrap().push(buf);
    }

    /// Rasterize `subpaths` and composite the result into the pixmap in one
    /// pass: phases 1/2 (edge binning, backdrop prefix) run serially here
    /// since they're cheap, then phase 3 (the per-tile coverage sweep) and
    /// its compositing are dispatched as one independent worker-pool job per
    /// tile — the expensive step genuinely runs inside the dispatched work,
    /// not after the fact. `cancel` is checked before binning and once more
    /// after the dispatch returns; individual tile jobs bail out early (and
    /// skip touching the pixmap) once cancellation is observed mid-flight.
    pub fn rasterize_and_composite(
        &self,
        subpaths: &[Vec<FlatLine>],
        rule: FillRule,
        color: ColorSource,
        op: Compose,
        cancel: &CancelToken,
    ) -> Result<(), RasterError> {
        cancel.check()?;
        let (bins, backdrops) = self.grid.bin(subpaths);
        cancel.check()?;

        let tiles_x = self.grid.tiles_x;
        let jobs = bins.into_iter().zip(backdrops).enumerate().map(|(idx, (bin, backdrop))| {
            let tx = idx as u32 % tiles_x;
            let ty = idx as u32 / tiles_x;
            let tile_index = ty * tiles_x + tx;
            let pixmap = Arc::clone(&self.pixmap);
            let dirty = Arc::clone(&self.dirty);
            let color = Arc::clone(&color);
            let cancel = cancel.clone();
            Box::new(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let alpha = strip::finish_tile(&bin, &backdrop, rule);
                if !alpha.iter().any(|&a| a != 0) {
                    return;
                }
                let mut pm = pixmap.lock().unwrap();
                let (ox, oy) = (tx * TILE_SIZE, ty * TILE_SIZE);
                for ly in 0..TILE_SIZE {
                    let py = oy + ly;
                    if py >= pm.height() {
                        break;
                    }
                    for lx in 0..TILE_SIZE {
                        let px = ox + lx;
                        if px >= pm.width() {
                            break;
                        }
                        let a = alpha[(ly * TILE_SIZE + lx) as usize];
                        if a == 0 {
                            continue;
                        }
                        let sampled = color(px, py);
                        let coverage = a as f32 / 255.0;
                        let src = Premultiplied {
                            r: sampled.r * sampled.a * coverage,
                            g: sampled.g * sampled.a * coverage,
                            b: sampled.b * sampled.a * coverage,
                            a: sampled.a * coverage,
                        };
                        let dst = pm.get_premultiplied_u8(px, py);
                        let result = compose::compose(op, src.to_rgba8_fast(), dst);
                        pm.set_premultiplied_u8(px, py, result);
                    }
                }
                dirty.mark(tile_index);
            }) as Box<dyn FnOnce() + Send>
        });
        self.pool.execute_all(jobs)?;
        cancel.check()
    }

    /// Composite a batch of already-rasterized tiles into the pixmap,
    /// dispatched one job per tile across the worker pool. Each tile's
    /// alpha mask modulates `color` (sampled per composited pixel) before
    /// applying the Porter-Duff operator `op` against the existing pixmap
    /// contents; every non-empty tile is marked dirty. Used for the
    /// incremental dirty-only repaint path, where tiles have already been
    /// computed by a previous full pass.
    pub fn composite_tiles(&self, tiles: Vec<Tile>, color: ColorSource, op: Compose, cancel: &CancelToken) -> Result<(), RasterError> {
        cancel.check()?;
        let jobs = tiles.into_iter().filter(|t| !t.empty).map(|tile| {
            let pixmap = Arc::clone(&self.pixmap);
            let dirty = Arc::clone(&self.dirty);
            let color = Arc::clone(&color);
            let tile_index = self.grid.tile_index(tile.tx, tile.ty);
            let cancel = cancel.clone();
            Box::new(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let mut pm = pixmap.lock().unwrap();
                let (ox, oy) = tile.pixel_origin();
                for ly in 0..TILE_SIZE {
                    let py = oy + ly;
                    if py >= pm.height() {
                        break;
                    }
                    for lx in 0..TILE_SIZE {
                        let px = ox + lx;
                        if px >= pm.width() {
                            break;
                        }
                        let a = tile.alpha[(ly * TILE_SIZE + lx) as usize];
                        if a == 0 {
                            continue;
                        }
                        let sampled = color(px, py);
                        let coverage = a as f32 / 255.0;
                        let src = Premultiplied {
                            r: sampled.r * sampled.a * coverage,
                            g: sampled.g * sampled.a * coverage,
                            b: sampled.b * sampled.a * coverage,
                            a: sampled.a * coverage,
                        };
                        let dst = pm.get_premultiplied_u8(px, py);
                        let result = compose::compose(op, src.to_rgba8_fast(), dst);
                        pm.set_premultiplied_u8(px, py, result);
                    }
                }
                dirty.mark(tile_index);
            }) as Box<dyn FnOnce() + Send>
        });
        self.pool.execute_all(jobs)?;
        cancel.check()
    }

    /// Run the composite pass only over tiles currently marked dirty,
    /// draining the atlas as it goes — the incremental-repaint path.
    pub fn composite_dirty_only(&self, all_tiles: Vec<Tile>, color: ColorSource, op: Compose, cancel: &CancelToken) -> Result<(), RasterError> {
        let dirty_indices: std::collections::HashSet<u32> = self.dirty.drain().into_iter().collect();
        let filtered: Vec<Tile> = all_tiles
            .into_iter()
            .filter(|t| dirty_indices.contains(&self.grid.tile_index(t.tx, t.ty)))
            .collect();
        self.composite_tiles(filtered, color, op, cancel)
    }

    pub fn with_pixmap<R>(&self, f: impl FnOnce(&Pixmap) -> R) -> R {
        f(&self.pixmap.lock().unwrap())
    }

    /// Overwrite the engine's pixmap wholesale, used by pipeline stages
    /// (e.g. hairline rendering) that mutate a local copy directly rather
    /// than going through the tile compositor.
    pub fn replace_pixmap(&self, pixmap: Pixmap) {
        *self.pixmap.lock().unwrap() = pixmap;
    }

    pub fn close(&mut self) {
        self.pool.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{flatten_path, DEFAULT_TOLERANCE};
    use crate::geom::Rect;
    use crate::paint::FillRule;
    use crate::path::Path;

    #[test]
    fn composite_solid_rect_fills_interior() {
        let pixmap = Pixmap::new(32, 32).unwrap();
        let mut engine = TileEngine::new(pixmap, 2);

        let mut p = Path::new();
        p.add_rect(Rect::new(4.0, 4.0, 20.0, 20.0));
        let subpaths = flatten_path(&p, DEFAULT_TOLERANCE);
        let cancel = CancelToken::new();

        engine
            .rasterize_and_composite(&subpaths, FillRule::NonZero, solid_source(Rgba::new(1.0, 0.0, 0.0, 1.0)), Compose::SourceOver, &cancel)
            .unwrap();

        engine.with_pixmap(|pm| {
            let c = pm.get_pixel(10, 10);
            assert!((c.r - 1.0).abs() < 0.02);
            assert!((c.a - 1.0).abs() < 0.02);
        });
        engine.close();
    }

    #[test]
    fn dirty_atlas_marks_touched_tiles() {
        let pixmap = Pixmap::new(64, 64).unwrap();
        let mut engine = TileEngine::new(pixmap, 2);

        let mut p = Path::new();
        p.add_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let subpaths = flatten_path(&p, DEFAULT_TOLERANCE);
        let cancel = CancelToken::new();

        engine
            .rasterize_and_composite(&subpaths, FillRule::NonZero, solid_source(Rgba::BLACK), Compose::SourceOver, &cancel)
            .unwrap();
        assert!(engine.dirty().is_dirty(0));
        engine.close();
    }

    #[test]
    fn cancelled_token_short_circuits_before_dispatch() {
        let pixmap = Pixmap::new(32, 32).unwrap();
        let mut engine = TileEngine::new(pixmap, 2);

        let mut p = Path::new();
        p.add_rect(Rect::new(4.0, 4.0, 20.0, 20.0));
        let subpaths = flatten_path(&p, DEFAULT_TOLERANCE);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = engine.rasterize_and_composite(&subpaths, FillRule::NonZero, solid_source(Rgba::BLACK), Compose::SourceOver, &cancel);
        assert!(matches!(result, Err(RasterError::Cancelled)));
        engine.close();
    }
}
