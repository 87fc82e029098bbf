//! # Compound Views
//!
//! Lazy set algebra. A view computes each word on demand from its operands,
//! so intersecting three vectors costs nothing until traversal asks for a
//! word, and then only the words on the traversal path.

use super::{BitLayers, EMPTY, FULL, LEAF};

/// Intersection of a tuple of 2 to 4 operands.
#[derive(Clone, Copy, Debug)]
pub struct And<T>(pub T);

/// Union of a tuple of 2 to 4 operands.
#[derive(Clone, Copy, Debug)]
pub struct Or<T>(pub T);

/// Complement of one operand.
///
/// Summary words of a complement cannot be derived from the operand's
/// summaries, so every summary reads as full. Traversing a bare `Not`
/// therefore walks the whole `[0, 2^24)` range; use it under an [`And`]
/// with a bounded operand.
#[derive(Clone, Copy, Debug)]
pub struct Not<T>(pub T);

/// Intersection of a runtime-sized slice of operands.
///
/// An empty slice is the universal set.
#[derive(Clone, Copy, Debug)]
pub struct All<'a, T>(pub &'a [T]);

/// Union of a runtime-sized slice of operands.
#[derive(Clone, Copy, Debug)]
pub struct Any<'a, T>(pub &'a [T]);

/// Builds an [`And`] view.
///
/// ```rust
/// use strata_core::bits::{self, Hbv};
///
/// let mut a = Hbv::with_capacity(128, false);
/// let mut b = Hbv::with_capacity(128, false);
/// a.range_set(0, 10, true);
/// b.range_set(5, 20, true);
/// assert_eq!(bits::count(&bits::and((&a, &b))), 5);
/// ```
#[inline]
#[must_use]
pub fn and<T>(operands: T) -> And<T>
where
    And<T>: BitLayers,
{
    And(operands)
}

/// Builds an [`Or`] view.
#[inline]
#[must_use]
pub fn or<T>(operands: T) -> Or<T>
where
    Or<T>: BitLayers,
{
    Or(operands)
}

/// Builds a [`Not`] view.
#[inline]
#[must_use]
pub fn not<T: BitLayers>(operand: T) -> Not<T> {
    Not(operand)
}

macro_rules! impl_tuple_views {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: BitLayers),+> BitLayers for And<($($name,)+)> {
            #[inline]
            fn layer0(&self) -> u64 {
                FULL $(& self.0.$idx.layer0())+
            }

            #[inline]
            fn layer(&self, level: u32, index: u32) -> u64 {
                FULL $(& self.0.$idx.layer(level, index))+
            }

            #[inline]
            fn contains(&self, id: u32) -> bool {
                true $(&& self.0.$idx.contains(id))+
            }
        }

        impl<$($name: BitLayers),+> BitLayers for Or<($($name,)+)> {
            #[inline]
            fn layer0(&self) -> u64 {
                EMPTY $(| self.0.$idx.layer0())+
            }

            #[inline]
            fn layer(&self, level: u32, index: u32) -> u64 {
                EMPTY $(| self.0.$idx.layer(level, index))+
            }

            #[inline]
            fn contains(&self, id: u32) -> bool {
                false $(|| self.0.$idx.contains(id))+
            }
        }
    };
}

impl_tuple_views!(A: 0, B: 1);
impl_tuple_views!(A: 0, B: 1, C: 2);
impl_tuple_views!(A: 0, B: 1, C: 2, D: 3);

impl<T: BitLayers> BitLayers for Not<T> {
    #[inline]
    fn layer0(&self) -> u64 {
        FULL
    }

    #[inline]
    fn layer(&self, level: u32, index: u32) -> u64 {
        if level < LEAF {
            FULL
        } else {
            !self.0.layer(LEAF, index)
        }
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        !self.0.contains(id)
    }
}

impl<T: BitLayers> BitLayers for All<'_, T> {
    #[inline]
    fn layer0(&self) -> u64 {
        self.0.iter().fold(FULL, |acc, v| acc & v.layer0())
    }

    #[inline]
    fn layer(&self, level: u32, index: u32) -> u64 {
        let mut acc = FULL;
        for operand in self.0 {
            acc &= operand.layer(level, index);
            if acc == EMPTY {
                break;
            }
        }
        acc
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        self.0.iter().all(|v| v.contains(id))
    }
}

impl<T: BitLayers> BitLayers for Any<'_, T> {
    #[inline]
    fn layer0(&self) -> u64 {
        self.0.iter().fold(EMPTY, |acc, v| acc | v.layer0())
    }

    #[inline]
    fn layer(&self, level: u32, index: u32) -> u64 {
        self.0.iter().fold(EMPTY, |acc, v| acc | v.layer(level, index))
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        self.0.iter().any(|v| v.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{for_each, iter, Hbv};

    fn vec_of(ids: &[u32]) -> Hbv {
        let mut vec = Hbv::with_capacity(1 << 16, false);
        for &id in ids {
            vec.set(id, true);
        }
        vec
    }

    #[test]
    fn test_and_or() {
        let a = vec_of(&[1, 2, 3, 5000, 9000]);
        let b = vec_of(&[2, 3, 4, 9000]);
        let c = vec_of(&[3, 9000, 60_000]);

        assert_eq!(iter(&and((&a, &b))).collect::<Vec<_>>(), [2, 3, 9000]);
        assert_eq!(iter(&and((&a, &b, &c))).collect::<Vec<_>>(), [3, 9000]);
        assert_eq!(
            iter(&or((&b, &c))).collect::<Vec<_>>(),
            [2, 3, 4, 9000, 60_000]
        );
    }

    #[test]
    fn test_and_with_empty_child_word() {
        // Same layer1 summary, disjoint leaf words.
        let a = vec_of(&[0]);
        let b = vec_of(&[100]);
        let mut seen = Vec::new();
        for_each(&and((&a, &b)), |id| seen.push(id));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_not_under_and() {
        let alive = vec_of(&[1, 2, 3, 4]);
        let dead = vec_of(&[2, 4]);
        assert_eq!(
            iter(&and((&alive, not(&dead)))).collect::<Vec<_>>(),
            [1, 3]
        );
        assert!(not(&dead).contains(1));
    }

    #[test]
    fn test_slice_views() {
        let a = vec_of(&[1, 2, 3]);
        let b = vec_of(&[2, 3]);
        let c = vec_of(&[3, 7]);
        let operands = [&a, &b, &c];
        assert_eq!(iter(&All(&operands)).collect::<Vec<_>>(), [3]);
        assert_eq!(iter(&Any(&operands)).collect::<Vec<_>>(), [1, 2, 3, 7]);
        assert!(All(&operands).contains(3));
        assert!(!Any(&operands).contains(4));
    }
}
