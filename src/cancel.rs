// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative cancellation, checked at the checkpoints spec.md §5 names:
//! every 32 tiles during tile-parallel rendering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::RasterError;

#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), RasterError> {
        if self.is_cancelled() {
            Err(RasterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Checkpoint cadence for tile-parallel rendering: check once per this many
/// tiles processed, rather than every tile (too much atomic-load overhead)
/// or only at the end (too coarse to actually cancel in time).
pub const TILE_CHECK_INTERVAL: usize = 32;
