//! # Traversal
//!
//! Depth-first walks over any [`BitLayers`]. Each step descends into the
//! lowest (or highest) set bit of the current node word, so empty spans are
//! never visited. A level is popped as soon as its node word runs out, which
//! also covers compound views whose child word comes back empty.

use std::iter::FusedIterator;
use std::ops::ControlFlow;

use super::{BitLayers, BITS_PER_LAYER, EMPTY, LAYER_COUNT, LEAF};

/// Walks set addresses at `depth` in ascending (`REV = false`) or
/// descending order until `f` breaks. Returns the address that broke.
fn walk<const REV: bool, V, F>(vec: &V, depth: u32, mut f: F) -> Option<u32>
where
    V: BitLayers + ?Sized,
    F: FnMut(u32) -> ControlFlow<()>,
{
    let depth = depth.min(LEAF) as usize;
    let mut nodes = [EMPTY; LAYER_COUNT as usize];
    let mut prefix = [0u32; LAYER_COUNT as usize];
    nodes[0] = vec.layer0();
    if nodes[0] == EMPTY {
        return None;
    }

    let mut level = 0usize;
    loop {
        let node = nodes[level];
        let pos = if REV {
            63 - node.leading_zeros()
        } else {
            node.trailing_zeros()
        };
        nodes[level] = node & !(1u64 << pos);
        let index = prefix[level] | pos;

        if level < depth {
            level += 1;
            nodes[level] = vec.layer(level as u32, index);
            prefix[level] = index << BITS_PER_LAYER;
        } else if f(index).is_break() {
            return Some(index);
        }

        while nodes[level] == EMPTY {
            if level == 0 {
                return None;
            }
            level -= 1;
        }
    }
}

/// Calls `f` with every set id of `vec`, ascending.
#[inline]
pub fn for_each<V, F>(vec: &V, mut f: F)
where
    V: BitLayers + ?Sized,
    F: FnMut(u32),
{
    walk::<false, _, _>(vec, LEAF, |id| {
        f(id);
        ControlFlow::Continue(())
    });
}

/// Calls `f` with every set summary address at `depth`, ascending.
///
/// Depth 3 yields ids; depth 2 yields the index of every non-empty leaf
/// word, which is the unit parallel dispatch splits work on.
#[inline]
pub fn for_each_at<V, F>(vec: &V, depth: u32, mut f: F)
where
    V: BitLayers + ?Sized,
    F: FnMut(u32),
{
    walk::<false, _, _>(vec, depth, |address| {
        f(address);
        ControlFlow::Continue(())
    });
}

/// Lowest set id.
#[must_use]
pub fn first<V: BitLayers + ?Sized>(vec: &V) -> Option<u32> {
    walk::<false, _, _>(vec, LEAF, |_| ControlFlow::Break(()))
}

/// Highest set id.
#[must_use]
pub fn last<V: BitLayers + ?Sized>(vec: &V) -> Option<u32> {
    walk::<true, _, _>(vec, LEAF, |_| ControlFlow::Break(()))
}

/// True when the root summary is empty.
///
/// Exact for an [`Hbv`](super::Hbv). An intersection may report `false`
/// and still yield nothing; use [`first`] when that matters.
#[inline]
#[must_use]
pub fn is_empty<V: BitLayers + ?Sized>(vec: &V) -> bool {
    vec.layer0() == EMPTY
}

/// Number of set ids.
#[must_use]
pub fn count<V: BitLayers + ?Sized>(vec: &V) -> usize {
    let mut total = 0usize;
    for_each_at(vec, LEAF - 1, |word| {
        total += vec.layer(LEAF, word).count_ones() as usize;
    });
    total
}

/// Ascending iterator over set ids.
#[must_use]
pub fn iter<V: BitLayers + ?Sized>(vec: &V) -> Ones<'_, V> {
    let mut nodes = [EMPTY; LAYER_COUNT as usize];
    nodes[0] = vec.layer0();
    Ones {
        vec,
        nodes,
        prefix: [0; LAYER_COUNT as usize],
        level: 0,
    }
}

/// Iterator returned by [`iter`].
#[derive(Debug)]
pub struct Ones<'a, V: ?Sized> {
    vec: &'a V,
    nodes: [u64; LAYER_COUNT as usize],
    prefix: [u32; LAYER_COUNT as usize],
    level: usize,
}

impl<V: BitLayers + ?Sized> Iterator for Ones<'_, V> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            while self.nodes[self.level] == EMPTY {
                if self.level == 0 {
                    return None;
                }
                self.level -= 1;
            }

            let node = self.nodes[self.level];
            self.nodes[self.level] = node & (node - 1);
            let index = self.prefix[self.level] | node.trailing_zeros();

            if self.level == LEAF as usize {
                return Some(index);
            }
            self.level += 1;
            self.nodes[self.level] = self.vec.layer(self.level as u32, index);
            self.prefix[self.level] = index << BITS_PER_LAYER;
        }
    }
}

impl<V: BitLayers + ?Sized> FusedIterator for Ones<'_, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Hbv;

    fn sample() -> Hbv {
        let mut vec = Hbv::with_capacity(1 << 20, false);
        for id in [0, 63, 64, 4095, 4096, 262_143, 262_144, 1_000_000] {
            vec.set(id, true);
        }
        vec
    }

    #[test]
    fn test_for_each_ascending() {
        let vec = sample();
        let mut seen = Vec::new();
        for_each(&vec, |id| seen.push(id));
        assert_eq!(seen, [0, 63, 64, 4095, 4096, 262_143, 262_144, 1_000_000]);
    }

    #[test]
    fn test_iter_matches_for_each() {
        let vec = sample();
        let mut seen = Vec::new();
        for_each(&vec, |id| seen.push(id));
        assert_eq!(iter(&vec).collect::<Vec<_>>(), seen);
        assert_eq!(count(&vec), seen.len());
    }

    #[test]
    fn test_first_last() {
        let vec = sample();
        assert_eq!(first(&vec), Some(0));
        assert_eq!(last(&vec), Some(1_000_000));

        let empty = Hbv::with_capacity(4096, false);
        assert_eq!(first(&empty), None);
        assert_eq!(last(&empty), None);
        assert!(is_empty(&empty));
        assert_eq!(iter(&empty).next(), None);
    }

    #[test]
    fn test_for_each_at_leaf_words() {
        let vec = sample();
        let mut words = Vec::new();
        for_each_at(&vec, 2, |w| words.push(w));
        assert_eq!(words, [0, 1, 63, 64, 4095, 4096, 15_625]);

        let mut roots = Vec::new();
        for_each_at(&vec, 0, |w| roots.push(w));
        assert_eq!(roots, [0, 1, 3]);
    }
}
