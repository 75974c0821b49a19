// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A wait-free bitmap of dirty tiles, one bit per tile, packed 64 to a word
//! so marking and draining never take a lock.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct DirtyAtlas {
    words: Vec<AtomicU64>,
    len: u32,
}

impl DirtyAtlas {
    pub fn new(tile_count: u32) -> Self {
        let word_count = ((tile_count as usize) + 63) / 64;
        let mut words = Vec::with_capacity(word_count.max(1));
        for _ in 0..word_count.max(1) {
            words.push(AtomicU64::new(0));
        }
        DirtyAtlas { words, len: tile_count }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn mark(&self, tile_index: u32) {
        debug_assert!(tile_index < self.len);
        let word = tile_index as usize / 64;
        let bit = tile_index as usize % 64;
        self.words[word].fetch_or(1 << bit, Ordering::Release);
    }

    pub fn is_dirty(&self, tile_index: u32) -> bool {
        let word = tile_index as usize / 64;
        let bit = tile_index as usize % 64;
        (self.words[word].load(Ordering::Acquire) >> bit) & 1 != 0
    }

    /// Atomically read and clear every dirty bit, returning the indices that
    /// were set. Iterates via trailing-zero-count so a sparsely dirty atlas
    /// costs close to nothing to drain.
    pub fn drain(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for (wi, word) in self.words.iter().enumerate() {
            let mut bits = word.swap(0, Ordering::AcqRel);
            while bits != 0 {
                let bit = bits.trailing_zeros();
                let index = wi as u32 * 64 + bit;
                if index < self.len {
                    out.push(index);
                }
                bits &= bits - 1;
            }
        }
        out
    }

    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_drain_round_trips() {
        let atlas = DirtyAtlas::new(200);
        atlas.mark(3);
        atlas.mark(130);
        atlas.mark(199);
        let mut drained = atlas.drain();
        drained.sort();
        assert_eq!(drained, vec![3, 130, 199]);
    }

    #[test]
    fn drain_clears_the_bits() {
        let atlas = DirtyAtlas::new(64);
        atlas.mark(10);
        assert_eq!(atlas.drain(), vec![10]);
        assert!(atlas.drain().is_empty());
    }

    #[test]
    fn is_dirty_reflects_marked_state() {
        let atlas = DirtyAtlas::new(64);
        assert!(!atlas.is_dirty(5));
        atlas.mark(5);
        assert!(atlas.is_dirty(5));
    }
}
