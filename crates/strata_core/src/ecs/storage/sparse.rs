//! Blocked-array backend: values live in 4096-slot blocks, one per layer-2
//! word of the presence set, and a block is dropped as soon as that word
//! clears.

use std::iter;

use super::Backend;
use crate::bits::{BitLayers, Hbv, EMPTY};

/// Ids per value block (one layer-2 summary word).
const BLOCK_SLOTS: usize = 4096;
const BLOCK_SHIFT: u32 = 12;

type ValueBlock<T> = Box<[Option<T>]>;

/// Values in lazily allocated fixed-size blocks.
#[derive(Debug)]
pub struct SparseBackend<T> {
    blocks: Vec<Option<ValueBlock<T>>>,
}

impl<T> Default for SparseBackend<T> {
    fn default() -> Self {
        Self { blocks: Vec::new() }
    }
}

impl<T> SparseBackend<T> {
    /// Number of value blocks holding memory.
    #[must_use]
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.iter().filter(|block| block.is_some()).count()
    }

    #[inline]
    fn split(id: u32) -> (usize, usize) {
        ((id >> BLOCK_SHIFT) as usize, id as usize & (BLOCK_SLOTS - 1))
    }

    /// Stores `value` at `id`, returning the previous value.
    pub(super) fn insert(&mut self, id: u32, value: T) -> Option<T> {
        let (block, slot) = Self::split(id);
        if self.blocks.len() <= block {
            self.blocks.resize_with(block + 1, || None);
        }
        let values = self.blocks[block].get_or_insert_with(|| {
            iter::repeat_with(|| None).take(BLOCK_SLOTS).collect()
        });
        values[slot].replace(value)
    }

    /// Removes and returns the value at `id`.
    pub(super) fn take(&mut self, id: u32) -> Option<T> {
        let (block, slot) = Self::split(id);
        self.blocks.get_mut(block)?.as_mut()?[slot].take()
    }

    /// Drops `id`'s block when `has` holds nothing in it anymore.
    pub(super) fn release_if_empty(&mut self, id: u32, has: &Hbv) {
        let (block, _) = Self::split(id);
        if has.layer(2, block as u32) == EMPTY {
            if let Some(values) = self.blocks.get_mut(block) {
                *values = None;
            }
        }
    }

    /// Base pointer of every block, null where unallocated.
    pub(super) fn block_ptrs(&mut self) -> Vec<*mut Option<T>> {
        self.blocks
            .iter_mut()
            .map(|block| {
                block
                    .as_mut()
                    .map_or(std::ptr::null_mut(), |values| values.as_mut_ptr())
            })
            .collect()
    }
}

impl<T> Backend<T> for SparseBackend<T> {
    #[inline]
    fn get(&self, id: u32) -> Option<&T> {
        let (block, slot) = Self::split(id);
        self.blocks.get(block)?.as_ref()?[slot].as_ref()
    }

    #[inline]
    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let (block, slot) = Self::split(id);
        self.blocks.get_mut(block)?.as_mut()?[slot].as_mut()
    }

    fn create(&mut self, id: u32, value: T, _has: &Hbv) {
        self.insert(id, value);
    }

    fn remove(&mut self, id: u32, has: &Hbv) {
        drop(self.take(id));
        self.release_if_empty(id, has);
    }

    fn sweep(&mut self, has: &Hbv) {
        for (block, values) in self.blocks.iter_mut().enumerate() {
            if values.is_some() && has.layer(2, block as u32) == EMPTY {
                *values = None;
            }
        }
    }
}
