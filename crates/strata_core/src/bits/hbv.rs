//! # Hierarchical Bit Vector
//!
//! The owned, mutable vector. Layers 1 and 2 are plain word arrays; the leaf
//! layer is a [`BlockVec`] so that empty 4096-id regions cost no memory.

use super::traverse::{self, for_each_at, Ones};
use super::{
    address_of, bit, index_of, mask_from, mask_span, mask_to, value_of, BitLayers, BITS_PER_LAYER,
    EMPTY, FULL, LEAF, MAX_BITS,
};
use crate::error::{StrataError, StrataResult};
use crate::memory::{BlockVec, BLOCK_WORDS};

/// A boolean membership set over `[0, 2^24)`.
///
/// Reads past the current capacity return the vector's default value, so a
/// default-`true` vector can stand for "everything not yet recorded" without
/// allocating it.
///
/// # Example
///
/// ```rust
/// use strata_core::bits::{self, Hbv};
///
/// let mut set = Hbv::with_capacity(10_000, false);
/// set.set(42, true);
/// set.range_set(5000, 5003, true);
///
/// let mut seen = Vec::new();
/// bits::for_each(&set, |id| seen.push(id));
/// assert_eq!(seen, [42, 5000, 5001, 5002]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Hbv {
    layer0: u64,
    layer1: Vec<u64>,
    layer2: Vec<u64>,
    layer3: BlockVec,
    default: bool,
}

impl Hbv {
    /// Creates an empty default-`false` vector with no capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vector covering at least `bits` ids, every one of them set
    /// to `default`.
    #[must_use]
    pub fn with_capacity(bits: u32, default: bool) -> Self {
        let mut vec = Self {
            layer0: if default { FULL } else { EMPTY },
            default,
            ..Self::default()
        };
        vec.resize(bits.min(MAX_BITS));
        vec
    }

    /// Value read for ids past the capacity.
    #[inline]
    #[must_use]
    pub const fn default_value(&self) -> bool {
        self.default
    }

    /// Covered ids, a multiple of 64.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        // Bounded by MAX_BITS / 64 words.
        (self.layer3.len() as u32) << BITS_PER_LAYER
    }

    /// Number of leaf blocks currently holding memory.
    #[inline]
    #[must_use]
    pub const fn allocated_blocks(&self) -> usize {
        self.layer3.allocated_blocks()
    }

    /// Extends the capacity to at least `bits` ids (capped at `2^24`),
    /// growing by no less than half the current capacity. New ids take the
    /// default value. Never shrinks.
    pub fn grow_to(&mut self, bits: u32) {
        let bits = bits.min(MAX_BITS);
        let capacity = self.capacity();
        if bits <= capacity {
            return;
        }
        let amortized = capacity.saturating_add(capacity / 2).min(MAX_BITS);
        self.resize(bits.max(amortized));
    }

    /// Checked [`Hbv::grow_to`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CapacityExceeded`] when `bits` exceeds `2^24`.
    pub fn try_grow_to(&mut self, bits: u64) -> StrataResult<()> {
        let bits = u32::try_from(bits)
            .ok()
            .filter(|b| *b <= MAX_BITS)
            .ok_or(StrataError::CapacityExceeded {
                id: bits,
                capacity: MAX_BITS,
            })?;
        self.grow_to(bits);
        Ok(())
    }

    fn resize(&mut self, bits: u32) {
        let words3 = (bits as usize).div_ceil(64);
        let words2 = words3.div_ceil(64);
        let words1 = words2.div_ceil(64);
        let fill = self.fill_word();
        self.layer1.resize(words1.max(self.layer1.len()), fill);
        self.layer2.resize(words2.max(self.layer2.len()), fill);
        self.layer3.resize(words3, self.default);
    }

    #[inline]
    const fn fill_word(&self) -> u64 {
        if self.default {
            FULL
        } else {
            EMPTY
        }
    }

    /// Reads the bit for `id`.
    #[inline]
    #[must_use]
    pub fn test(&self, id: u32) -> bool {
        let word = (id >> BITS_PER_LAYER) as usize;
        if word >= self.layer3.len() {
            return self.default;
        }
        self.layer3.word(word) & bit(id) != 0
    }

    /// Writes the bit for `id`. `id` must be below [`Hbv::capacity`].
    #[inline]
    pub fn set(&mut self, id: u32, value: bool) {
        debug_assert!(
            id < self.capacity(),
            "id {id} beyond capacity {}; grow_to first",
            self.capacity()
        );
        if value {
            self.insert(id);
        } else {
            self.remove(id);
        }
    }

    /// Checked [`Hbv::set`] that grows the vector when needed.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CapacityExceeded`] when `id >= 2^24`.
    pub fn try_set(&mut self, id: u32, value: bool) -> StrataResult<()> {
        self.try_grow_to(u64::from(id) + 1)?;
        self.set(id, value);
        Ok(())
    }

    fn insert(&mut self, id: u32) {
        let word = (id >> BITS_PER_LAYER) as usize;
        self.layer3.ensure_block(word / BLOCK_WORDS);
        let Some(slot) = self.layer3.word_mut(word) else {
            return;
        };
        let was_empty = *slot == EMPTY;
        *slot |= bit(id);
        if was_empty {
            self.bubble_fill(id);
        }
    }

    fn remove(&mut self, id: u32) {
        let Some(slot) = self.layer3.word_mut((id >> BITS_PER_LAYER) as usize) else {
            return;
        };
        *slot &= !bit(id);
        if *slot == EMPTY {
            self.bubble_empty(id);
        }
    }

    /// Marks the summaries above `id`'s leaf word as non-empty. Only called
    /// on a zero to non-zero transition of that word.
    fn bubble_fill(&mut self, id: u32) {
        self.layer2[index_of(2, id) as usize] |= value_of(2, id);
        self.layer1[index_of(1, id) as usize] |= value_of(1, id);
        self.layer0 |= value_of(0, id);
    }

    /// Clears summaries above `id` while the word below is empty, releasing
    /// the leaf block when its summary word empties.
    fn bubble_empty(&mut self, id: u32) {
        if self.layer3.word((id >> BITS_PER_LAYER) as usize) != EMPTY {
            return;
        }
        let i2 = index_of(2, id) as usize;
        self.layer2[i2] &= !value_of(2, id);
        if self.layer2[i2] != EMPTY {
            return;
        }
        self.layer3.free_block(i2);
        let i1 = index_of(1, id) as usize;
        self.layer1[i1] &= !value_of(1, id);
        if self.layer1[i1] != EMPTY {
            return;
        }
        self.layer0 &= !value_of(0, id);
    }

    /// Writes `value` to every id in `[begin, end)`. `end` must not exceed
    /// [`Hbv::capacity`].
    pub fn range_set(&mut self, begin: u32, end: u32, value: bool) {
        if begin >= end {
            return;
        }
        debug_assert!(
            end <= self.capacity(),
            "range end {end} beyond capacity {}; grow_to first",
            self.capacity()
        );
        if value {
            self.range_fill(begin, end - 1);
        } else {
            self.range_clear(begin, end - 1);
        }
    }

    /// Summaries over a filled range are set regardless of prior state.
    fn range_fill(&mut self, first: u32, last: u32) {
        self.layer3.set_span(first as usize, last as usize);
        span_or(&mut self.layer2, address_of(2, first), address_of(2, last));
        span_or(&mut self.layer1, address_of(1, first), address_of(1, last));
        self.layer0 |= mask_span(
            (address_of(0, first) & 63) as usize,
            (address_of(0, last) & 63) as usize,
        );
    }

    /// Only summaries strictly inside the range can be cleared blindly; the
    /// two boundary paths are re-derived by bubbling.
    fn range_clear(&mut self, first: u32, last: u32) {
        self.layer3.clear_span(first as usize, last as usize);
        interior_clear(&mut self.layer2, address_of(2, first), address_of(2, last));
        interior_clear(&mut self.layer1, address_of(1, first), address_of(1, last));
        let (lo, hi) = (address_of(0, first), address_of(0, last));
        if lo + 1 < hi {
            self.layer0 &= !mask_span((lo + 1) as usize, (hi - 1) as usize);
        }
        self.bubble_empty(first);
        self.bubble_empty(last);
    }

    /// Resets every covered id to the default value.
    pub fn clear(&mut self) {
        let fill = self.fill_word();
        if self.default {
            self.layer3.fill(0, self.layer3.len());
        } else {
            self.layer3.clear();
        }
        self.layer2.fill(fill);
        self.layer1.fill(fill);
        self.layer0 = fill;
    }

    /// In-place union with `other`. Grows to cover `other`'s last id.
    pub fn merge_add<V: BitLayers + ?Sized>(&mut self, other: &V) {
        let Some(last) = traverse::last(other) else {
            return;
        };
        self.grow_to(last + 1);
        for_each_at(other, 2, |word| {
            let bits = other.layer(LEAF, word);
            if bits != EMPTY {
                self.or_leaf_word(word, bits);
            }
        });
    }

    /// In-place difference with `other`. Only subtrees non-empty in both
    /// operands are visited.
    pub fn merge_sub<V: BitLayers + ?Sized>(&mut self, other: &V) {
        let mut nodes = [EMPTY; LEAF as usize];
        let mut prefix = [0u32; LEAF as usize];
        nodes[0] = other.layer0() & self.layer0;
        if nodes[0] == EMPTY {
            return;
        }
        let mut level = 0usize;
        loop {
            let node = nodes[level];
            let low = node.trailing_zeros();
            nodes[level] = node & (node - 1);
            let index = prefix[level] | low;

            if level + 1 < LEAF as usize {
                level += 1;
                let depth = level as u32;
                nodes[level] = other.layer(depth, index) & self.layer(depth, index);
                prefix[level] = index << BITS_PER_LAYER;
            } else {
                self.and_not_leaf_word(index, other.layer(LEAF, index));
            }

            while nodes[level] == EMPTY {
                if level == 0 {
                    return;
                }
                level -= 1;
            }
        }
    }

    fn or_leaf_word(&mut self, word: u32, bits: u64) {
        let index = word as usize;
        self.layer3.ensure_block(index / BLOCK_WORDS);
        let Some(slot) = self.layer3.word_mut(index) else {
            return;
        };
        let was_empty = *slot == EMPTY;
        *slot |= bits;
        if was_empty {
            self.bubble_fill(word << BITS_PER_LAYER);
        }
    }

    fn and_not_leaf_word(&mut self, word: u32, bits: u64) {
        let Some(slot) = self.layer3.word_mut(word as usize) else {
            return;
        };
        *slot &= !bits;
        if *slot == EMPTY {
            self.bubble_empty(word << BITS_PER_LAYER);
        }
    }

    /// Calls `f` for every set id in `[begin, end)`, ascending.
    pub fn for_each_in(&self, begin: u32, end: u32, mut f: impl FnMut(u32)) {
        if begin >= end {
            return;
        }
        let last = end - 1;
        let (first_word, last_word) = (begin >> BITS_PER_LAYER, last >> BITS_PER_LAYER);
        for word in first_word..=last_word {
            if self.layer(2, word >> BITS_PER_LAYER) & bit(word) == EMPTY {
                continue;
            }
            let mut bits = self.layer(LEAF, word);
            if word == first_word {
                bits &= mask_from((begin & 63) as usize);
            }
            if word == last_word {
                bits &= mask_to((last & 63) as usize);
            }
            while bits != EMPTY {
                let low = bits.trailing_zeros();
                bits &= bits - 1;
                f((word << BITS_PER_LAYER) | low);
            }
        }
    }

    /// Ascending iterator over set ids.
    #[must_use]
    pub fn iter(&self) -> Ones<'_, Self> {
        traverse::iter(self)
    }

    /// Number of set ids. Linear in the number of non-empty leaf words.
    #[must_use]
    pub fn count(&self) -> usize {
        traverse::count(self)
    }

    /// Checks that every summary bit is set iff the word below it is
    /// non-empty. Used by tests and debug assertions.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        for level in 0..LEAF {
            let words = match level {
                0 => 1,
                1 => self.layer1.len(),
                _ => self.layer2.len(),
            };
            for i in 0..words as u32 {
                let word = self.layer(level, i);
                for b in 0..64u32 {
                    let child = (i << BITS_PER_LAYER) | b;
                    let non_empty = if self.covers(level + 1, child) {
                        self.layer(level + 1, child) != EMPTY
                    } else {
                        self.default
                    };
                    if (word & bit(b) != 0) != non_empty {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn covers(&self, level: u32, index: u32) -> bool {
        let index = index as usize;
        match level {
            1 => index < self.layer1.len(),
            2 => index < self.layer2.len(),
            _ => index < self.layer3.len(),
        }
    }
}

impl BitLayers for Hbv {
    #[inline]
    fn layer0(&self) -> u64 {
        self.layer0
    }

    #[inline]
    fn layer(&self, level: u32, index: u32) -> u64 {
        let i = index as usize;
        match level {
            0 => self.layer0,
            1 => self.layer1.get(i).copied().unwrap_or(self.fill_word()),
            2 => self.layer2.get(i).copied().unwrap_or(self.fill_word()),
            _ if i < self.layer3.len() => self.layer3.word(i),
            _ => self.fill_word(),
        }
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        self.test(id)
    }
}

/// Sets bit addresses `first..=last` across a word array.
fn span_or(words: &mut [u64], first: u32, last: u32) {
    let (fw, lw) = ((first >> 6) as usize, (last >> 6) as usize);
    let (lo, hi) = ((first & 63) as usize, (last & 63) as usize);
    if fw == lw {
        words[fw] |= mask_span(lo, hi);
        return;
    }
    words[fw] |= mask_from(lo);
    words[fw + 1..lw].fill(FULL);
    words[lw] |= mask_to(hi);
}

/// Clears bit addresses strictly between `first` and `last`.
fn interior_clear(words: &mut [u64], first: u32, last: u32) {
    if first + 1 >= last {
        return;
    }
    let (first, last) = (first + 1, last - 1);
    let (fw, lw) = ((first >> 6) as usize, (last >> 6) as usize);
    let (lo, hi) = ((first & 63) as usize, (last & 63) as usize);
    if fw == lw {
        words[fw] &= !mask_span(lo, hi);
        return;
    }
    words[fw] &= !mask_from(lo);
    words[fw + 1..lw].fill(EMPTY);
    words[lw] &= !mask_to(hi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{first, for_each, last};

    fn collect(vec: &Hbv) -> Vec<u32> {
        let mut out = Vec::new();
        for_each(vec, |id| out.push(id));
        out
    }

    #[test]
    fn test_set_and_test() {
        let mut vec = Hbv::with_capacity(100_000, false);
        assert!(!vec.test(7));
        vec.set(7, true);
        vec.set(70_000, true);
        assert!(vec.test(7));
        assert!(vec.test(70_000));
        assert!(!vec.test(8));
        assert!(vec.is_consistent());

        vec.set(7, false);
        assert!(!vec.test(7));
        assert_eq!(collect(&vec), [70_000]);
        assert!(vec.is_consistent());
    }

    #[test]
    fn test_reads_past_capacity_use_default() {
        let absent = Hbv::with_capacity(64, false);
        let present = Hbv::with_capacity(64, true);
        assert!(!absent.test(1_000_000));
        assert!(present.test(1_000_000));
        assert_eq!(present.layer(2, 4000), FULL);
        assert!(present.is_consistent());
    }

    #[test]
    fn test_leaf_block_freed_when_empty() {
        let mut vec = Hbv::with_capacity(20_000, false);
        vec.set(5000, true);
        vec.set(5001, true);
        assert_eq!(vec.allocated_blocks(), 1);

        vec.set(5000, false);
        assert_eq!(vec.allocated_blocks(), 1);
        vec.set(5001, false);
        assert_eq!(vec.allocated_blocks(), 0);
        assert_eq!(vec.layer0(), EMPTY);
    }

    #[test]
    fn test_range_true_across_blocks() {
        let mut vec = Hbv::with_capacity(1 << 20, false);
        vec.range_set(4090, 270_000, true);
        assert!(!vec.test(4089));
        assert!(vec.test(4090));
        assert!(vec.test(269_999));
        assert!(!vec.test(270_000));
        assert_eq!(first(&vec), Some(4090));
        assert_eq!(last(&vec), Some(269_999));
        assert_eq!(vec.count(), 270_000 - 4090);
        assert!(vec.is_consistent());
    }

    #[test]
    fn test_range_false_keeps_outside_bits() {
        let mut vec = Hbv::with_capacity(1 << 20, false);
        vec.range_set(0, 300_000, true);
        vec.range_set(10, 299_990, false);
        let expected: Vec<u32> = (0..10).chain(299_990..300_000).collect();
        assert_eq!(collect(&vec), expected);
        assert!(vec.is_consistent());
        // Only the two boundary blocks keep memory.
        assert_eq!(vec.allocated_blocks(), 2);
    }

    #[test]
    fn test_range_false_empties_everything() {
        let mut vec = Hbv::with_capacity(1 << 20, false);
        vec.range_set(100, 600_000, true);
        vec.range_set(0, 1 << 20, false);
        assert_eq!(vec.layer0(), EMPTY);
        assert_eq!(vec.allocated_blocks(), 0);
        assert!(vec.is_consistent());
    }

    #[test]
    fn test_grow_is_amortized() {
        let mut vec = Hbv::with_capacity(6400, false);
        vec.grow_to(6401);
        assert!(vec.capacity() >= 9600);
        vec.grow_to(u32::MAX);
        assert_eq!(vec.capacity(), MAX_BITS);
    }

    #[test]
    fn test_try_set_rejects_out_of_range() {
        let mut vec = Hbv::new();
        assert!(vec.try_set(MAX_BITS - 1, true).is_ok());
        assert!(vec.test(MAX_BITS - 1));
        assert_eq!(
            vec.try_set(MAX_BITS, true),
            Err(StrataError::CapacityExceeded {
                id: u64::from(MAX_BITS) + 1,
                capacity: MAX_BITS
            })
        );
    }

    #[test]
    fn test_merge_add_and_sub() {
        let mut a = Hbv::with_capacity(1000, false);
        let mut b = Hbv::with_capacity(100_000, false);
        a.set(1, true);
        a.set(500, true);
        b.set(500, true);
        b.set(90_000, true);

        a.merge_add(&b);
        assert_eq!(collect(&a), [1, 500, 90_000]);
        assert!(a.is_consistent());

        a.merge_sub(&b);
        assert_eq!(collect(&a), [1]);
        assert!(a.is_consistent());
    }

    #[test]
    fn test_clear_restores_default() {
        let mut vec = Hbv::with_capacity(5000, false);
        vec.range_set(0, 5000, true);
        vec.clear();
        assert_eq!(vec.count(), 0);
        assert_eq!(vec.allocated_blocks(), 0);

        let mut full = Hbv::with_capacity(128, true);
        full.set(3, false);
        full.clear();
        assert!(full.test(3));
        assert!(full.is_consistent());
    }

    #[test]
    fn test_for_each_in() {
        let mut vec = Hbv::with_capacity(10_000, false);
        for id in [3, 64, 65, 4095, 4096, 9000] {
            vec.set(id, true);
        }
        let mut seen = Vec::new();
        vec.for_each_in(4, 4097, |id| seen.push(id));
        assert_eq!(seen, [64, 65, 4095, 4096]);
    }
}
