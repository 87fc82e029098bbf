//! # Hierarchical Bit Vectors
//!
//! A 4-layer bitmap tree over identifiers in `[0, 2^24)`.
//!
//! ```text
//! layer0:            [ 1 word  ]                 bit b -> layer1[b] != 0
//! layer1:         [ up to 64 words ]             bit b -> layer2[64i + b] != 0
//! layer2:      [ up to 4096 words ]              bit b -> layer3[64i + b] != 0
//! layer3:   [ leaf words, allocated in 64-word blocks ]   bit b -> id 64i + b
//! ```
//!
//! Every summary bit is set iff the 64-bit word it covers one layer down is
//! non-zero, so traversal skips an empty 64-id span (or 4096, or 262144) in
//! a single step.
//!
//! Everything that can be traversed implements [`BitLayers`]: the owned
//! [`Hbv`] as well as the lazy [`And`], [`Or`], [`Not`], [`All`] and
//! [`Any`] views.

mod compound;
mod hbv;
mod traverse;

pub use compound::{and, not, or, All, And, Any, Not, Or};
pub use hbv::Hbv;
pub use traverse::{count, first, for_each, for_each_at, is_empty, iter, last, Ones};

/// Bits addressed per layer word (`log2(64)`).
pub const BITS_PER_LAYER: u32 = 6;
/// Number of layers, leaf included.
pub const LAYER_COUNT: u32 = 4;
/// Index of the leaf layer.
pub const LEAF: u32 = LAYER_COUNT - 1;
/// Hard capacity of a vector in bits.
pub const MAX_BITS: u32 = 1 << (BITS_PER_LAYER * LAYER_COUNT);
/// A word with no bit set.
pub const EMPTY: u64 = 0;
/// A word with every bit set.
pub const FULL: u64 = u64::MAX;

/// Read interface shared by bit vectors and their compound views.
///
/// `layer(level, index)` returns word `index` of layer `level`; level 0
/// ignores `index`. Words past the end of a vector read as its default.
pub trait BitLayers {
    /// The root summary word.
    fn layer0(&self) -> u64;

    /// Word `index` of layer `level` (0..=3).
    fn layer(&self, level: u32, index: u32) -> u64;

    /// Membership test through the leaf layer.
    #[inline]
    fn contains(&self, id: u32) -> bool {
        self.layer(LEAF, id >> BITS_PER_LAYER) & bit(id) != 0
    }
}

impl<T: BitLayers + ?Sized> BitLayers for &T {
    #[inline]
    fn layer0(&self) -> u64 {
        (**self).layer0()
    }

    #[inline]
    fn layer(&self, level: u32, index: u32) -> u64 {
        (**self).layer(level, index)
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        (**self).contains(id)
    }
}

/// Index of the word holding `id`'s summary at `level`.
#[inline]
#[must_use]
pub const fn index_of(level: u32, id: u32) -> u32 {
    let shift = BITS_PER_LAYER * (LAYER_COUNT - level);
    if shift >= u32::BITS {
        0
    } else {
        id >> shift
    }
}

/// Bit address of `id` within layer `level` (word index * 64 + bit).
#[inline]
#[must_use]
pub const fn address_of(level: u32, id: u32) -> u32 {
    id >> (BITS_PER_LAYER * (LEAF - level))
}

/// Single-bit mask of `id`'s summary inside its word at `level`.
#[inline]
#[must_use]
pub const fn value_of(level: u32, id: u32) -> u64 {
    bit(address_of(level, id))
}

/// Single-bit mask of the low six bits of `address`.
#[inline]
#[must_use]
pub const fn bit(address: u32) -> u64 {
    1 << (address & 63)
}

/// Bits `lo..=63`.
#[inline]
#[must_use]
pub const fn mask_from(lo: usize) -> u64 {
    FULL << lo
}

/// Bits `0..=hi`.
#[inline]
#[must_use]
pub const fn mask_to(hi: usize) -> u64 {
    FULL >> (63 - hi)
}

/// Bits `lo..=hi`.
#[inline]
#[must_use]
pub const fn mask_span(lo: usize, hi: usize) -> u64 {
    mask_from(lo) & mask_to(hi)
}
