//! # Block Pool
//!
//! Owner of the leaf bit storage: fixed-size 64-word blocks that are
//! allocated and freed individually and addressed by [`BlockId`].

use tracing::trace;

/// Words per leaf block.
pub const BLOCK_WORDS: usize = 64;

/// One leaf block: 64 words of 64 bits.
pub type Block = [u64; BLOCK_WORDS];

/// Handle to a block in a [`BlockPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Sentinel for a block position that owns no storage.
    pub const UNALLOCATED: Self = Self(u32::MAX);

    /// Returns true unless this is [`BlockId::UNALLOCATED`].
    #[inline]
    #[must_use]
    pub const fn is_allocated(self) -> bool {
        self.0 != u32::MAX
    }

    #[inline]
    const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// A growable pool of leaf blocks.
///
/// Freed blocks release their memory immediately; their slot goes on a free
/// list and is handed out again by the next [`BlockPool::allocate`].
///
/// # Example
///
/// ```rust
/// use strata_core::memory::BlockPool;
///
/// let mut pool = BlockPool::new();
/// let id = pool.allocate(0);
/// pool.get_mut(id).unwrap()[3] = 0b101;
/// assert_eq!(pool.get(id).unwrap()[3], 0b101);
/// pool.free(id);
/// assert_eq!(pool.allocated_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct BlockPool {
    /// Block slots, `None` once freed.
    storage: Vec<Option<Box<Block>>>,
    /// Free list - indices of empty slots.
    free_list: Vec<u32>,
    /// Number of live blocks.
    allocated_count: usize,
}

impl BlockPool {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: Vec::new(),
            free_list: Vec::new(),
            allocated_count: 0,
        }
    }

    /// Number of live blocks.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Number of slots ever handed out, live or free.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.storage.len()
    }

    /// Allocates a block with every word set to `fill`.
    pub fn allocate(&mut self, fill: u64) -> BlockId {
        let block = Box::new([fill; BLOCK_WORDS]);
        self.allocated_count += 1;

        if let Some(slot) = self.free_list.pop() {
            self.storage[slot as usize] = Some(block);
            return BlockId(slot);
        }

        // One slot per leaf block, so at most MAX_BITS / 4096.
        let slot = self.storage.len() as u32;
        if self.storage.len().is_power_of_two() {
            trace!(slots = self.storage.len(), "block pool growing");
        }
        self.storage.push(Some(block));
        BlockId(slot)
    }

    /// Releases a block. Freeing an unallocated or already freed id is a
    /// no-op.
    pub fn free(&mut self, id: BlockId) {
        if !id.is_allocated() {
            return;
        }
        if let Some(slot) = self.storage.get_mut(id.slot()) {
            if slot.take().is_some() {
                self.free_list.push(id.0);
                self.allocated_count -= 1;
            }
        }
    }

    /// Reads a live block.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.storage.get(id.slot())?.as_deref()
    }

    /// Mutably accesses a live block.
    #[inline]
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.storage.get_mut(id.slot())?.as_deref_mut()
    }

    /// Frees every block.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.free_list.clear();
        self.allocated_count = 0;
    }
}
