//! # Leaf Block Vector
//!
//! The bottom layer of a hierarchical bit vector: a sequence of 64-bit words
//! grouped into [`BLOCK_WORDS`]-word blocks. Positions whose block is
//! unallocated read as zero.

use super::pool::{Block, BlockId, BlockPool, BLOCK_WORDS};
use crate::bits::{mask_from, mask_span, mask_to, FULL};

/// Word storage for the leaf layer, allocated one block at a time.
#[derive(Clone, Debug, Default)]
pub struct BlockVec {
    /// Block id per block position.
    index: Vec<BlockId>,
    pool: BlockPool,
    /// Covered word count.
    words: usize,
}

impl BlockVec {
    /// Creates an empty vector covering no words.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: Vec::new(),
            pool: BlockPool::new(),
            words: 0,
        }
    }

    /// Covered word count.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.words
    }

    /// True when no words are covered.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.words == 0
    }

    /// Number of live blocks.
    #[inline]
    #[must_use]
    pub const fn allocated_blocks(&self) -> usize {
        self.pool.allocated_count()
    }

    /// Extends coverage to `words`. New words are all-ones when `fill` is
    /// set, unallocated otherwise. Never shrinks.
    pub fn resize(&mut self, words: usize, fill: bool) {
        if words <= self.words {
            return;
        }
        let old = self.words;
        self.index
            .resize(words.div_ceil(BLOCK_WORDS), BlockId::UNALLOCATED);
        self.words = words;
        if fill {
            self.fill(old, words);
        }
    }

    /// True when block position `block` owns storage.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, block: usize) -> bool {
        self.index.get(block).is_some_and(|id| id.is_allocated())
    }

    /// Reads word `i`. Unallocated or uncovered words read as zero.
    #[inline]
    #[must_use]
    pub fn word(&self, i: usize) -> u64 {
        match self.index.get(i / BLOCK_WORDS) {
            Some(id) if id.is_allocated() => {
                self.pool.get(*id).map_or(0, |block| block[i % BLOCK_WORDS])
            }
            _ => 0,
        }
    }

    /// Mutable access to word `i`, `None` when its block is unallocated.
    #[inline]
    pub fn word_mut(&mut self, i: usize) -> Option<&mut u64> {
        self.block_mut(i / BLOCK_WORDS)
            .map(|block| &mut block[i % BLOCK_WORDS])
    }

    /// Allocates a zeroed block at `block` unless one is present.
    pub fn ensure_block(&mut self, block: usize) {
        if let Some(slot) = self.index.get_mut(block) {
            if !slot.is_allocated() {
                *slot = self.pool.allocate(0);
            }
        }
    }

    /// Releases the block at `block`, if any.
    pub fn free_block(&mut self, block: usize) {
        if let Some(slot) = self.index.get_mut(block) {
            self.pool.free(*slot);
            *slot = BlockId::UNALLOCATED;
        }
    }

    /// Frees every block while keeping coverage.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.index.fill(BlockId::UNALLOCATED);
    }

    /// Sets words `[begin, end)` to all-ones, allocating as needed.
    pub fn fill(&mut self, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        let first = begin / BLOCK_WORDS;
        let last = (end - 1) / BLOCK_WORDS;
        for block in first..=last {
            let (lo, hi) = Self::clip(block, begin, end);
            if lo == 0 && hi == BLOCK_WORDS && !self.is_allocated(block) {
                self.index[block] = self.pool.allocate(FULL);
                continue;
            }
            self.ensure_block(block);
            if let Some(words) = self.block_mut(block) {
                words[lo..hi].fill(FULL);
            }
        }
    }

    /// Zeroes words `[begin, end)`, releasing fully covered blocks.
    pub fn reset(&mut self, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        let first = begin / BLOCK_WORDS;
        let last = (end - 1) / BLOCK_WORDS;
        for block in first..=last {
            let (lo, hi) = Self::clip(block, begin, end);
            if lo == 0 && hi == BLOCK_WORDS {
                self.free_block(block);
            } else if let Some(words) = self.block_mut(block) {
                words[lo..hi].fill(0);
            }
        }
    }

    /// Sets bits `first..=last`, allocating blocks as needed.
    pub fn set_span(&mut self, first: usize, last: usize) {
        let (fw, lw) = (first / 64, last / 64);
        if fw == lw {
            self.or_word(fw, mask_span(first % 64, last % 64));
            return;
        }
        self.or_word(fw, mask_from(first % 64));
        self.fill(fw + 1, lw);
        self.or_word(lw, mask_to(last % 64));
    }

    /// Clears bits `first..=last`, releasing fully covered blocks.
    pub fn clear_span(&mut self, first: usize, last: usize) {
        let (fw, lw) = (first / 64, last / 64);
        if fw == lw {
            self.and_word(fw, !mask_span(first % 64, last % 64));
            return;
        }
        self.and_word(fw, !mask_from(first % 64));
        self.reset(fw + 1, lw);
        self.and_word(lw, !mask_to(last % 64));
    }

    fn or_word(&mut self, i: usize, bits: u64) {
        self.ensure_block(i / BLOCK_WORDS);
        if let Some(word) = self.word_mut(i) {
            *word |= bits;
        }
    }

    fn and_word(&mut self, i: usize, bits: u64) {
        if let Some(word) = self.word_mut(i) {
            *word &= bits;
        }
    }

    fn block_mut(&mut self, block: usize) -> Option<&mut Block> {
        let id = *self.index.get(block)?;
        self.pool.get_mut(id)
    }

    /// Word range of `block` that lies inside `[begin, end)`.
    fn clip(block: usize, begin: usize, end: usize) -> (usize, usize) {
        let base = block * BLOCK_WORDS;
        let lo = begin.saturating_sub(base);
        let hi = (end - base).min(BLOCK_WORDS);
        (lo, hi)
    }
}
