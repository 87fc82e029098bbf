//! # Disjoint Slot Access
//!
//! Hands out `&mut` values for distinct ids to several threads at once.
//!
//! SAFETY: This module requires unsafe to split one exclusive borrow of a
//! backend into per-id exclusive borrows. Sound because:
//! - [`RawSlots`] is created from `&mut` backend and borrows it for its
//!   whole lifetime, so the backend cannot move or reallocate meanwhile
//! - Sparse and dense backends keep every id's value in its own slot
//! - [`RawSlots::get`] requires callers to request each id at most once
#![allow(unsafe_code)]

use std::marker::PhantomData;

use super::dense::{DenseBackend, DenseSlot};
use super::sparse::SparseBackend;
use super::Backend;

/// Backends whose values occupy one slot per id.
pub trait DisjointSlots<T>: Backend<T> {
    /// Borrows every value slot for per-id access.
    fn raw_slots(&mut self) -> RawSlots<'_, T>;
}

enum Layout<'a, T> {
    /// Base pointer per 4096-id block, null where unallocated.
    Blocked(Vec<*mut Option<T>>),
    /// Packed slots reached through the id redirect.
    Packed {
        base: *mut DenseSlot<T>,
        len: usize,
        redirect: &'a SparseBackend<u32>,
    },
}

/// Exclusive access to all value slots of one backend.
pub struct RawSlots<'a, T> {
    layout: Layout<'a, T>,
    _borrow: PhantomData<&'a mut T>,
}

// SAFETY: RawSlots stands in for `&'a mut Backend`. Moving it to another
// thread moves that exclusive borrow, which is sound for `T: Send`.
unsafe impl<T: Send> Send for RawSlots<'_, T> {}
// SAFETY: Shared use only hands out `&mut T` for distinct ids (see
// `RawSlots::get`), i.e. disjoint exclusive borrows sent to other threads.
unsafe impl<T: Send> Sync for RawSlots<'_, T> {}

impl<'a, T> RawSlots<'a, T> {
    /// Value slot of `id`, or `None` when it holds no value.
    ///
    /// # Safety
    ///
    /// No other reference obtained for the same `id` from this `RawSlots`
    /// may be alive while the returned one is.
    #[inline]
    #[must_use]
    pub unsafe fn get(&self, id: u32) -> Option<&'a mut T> {
        match &self.layout {
            Layout::Blocked(blocks) => {
                let base = *blocks.get((id >> 12) as usize)?;
                if base.is_null() {
                    return None;
                }
                // SAFETY: base points at a live 4096-slot block borrowed for
                // 'a; the offset is below 4096; the caller guarantees no
                // other reference to this slot exists.
                unsafe { (*base.add(id as usize & 4095)).as_mut() }
            }
            Layout::Packed {
                base,
                len,
                redirect,
            } => {
                let slot = *redirect.get(id)? as usize;
                if slot >= *len {
                    return None;
                }
                // SAFETY: slot < len within the packed array borrowed for
                // 'a; the caller guarantees no other reference to it exists.
                unsafe { Some(&mut (*base.add(slot)).value) }
            }
        }
    }
}

impl<T> DisjointSlots<T> for SparseBackend<T> {
    fn raw_slots(&mut self) -> RawSlots<'_, T> {
        RawSlots {
            layout: Layout::Blocked(self.block_ptrs()),
            _borrow: PhantomData,
        }
    }
}

impl<T> DisjointSlots<T> for DenseBackend<T> {
    fn raw_slots(&mut self) -> RawSlots<'_, T> {
        let (slots, redirect) = self.parts_mut();
        RawSlots {
            layout: Layout::Packed {
                base: slots.as_mut_ptr(),
                len: slots.len(),
                redirect,
            },
            _borrow: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Hbv;

    #[test]
    fn test_sparse_slots() {
        let has = Hbv::with_capacity(10_000, false);
        let mut backend = SparseBackend::default();
        backend.create(3, 30u32, &has);
        backend.create(9000, 90, &has);
        {
            let slots = backend.raw_slots();
            // SAFETY: each id is requested once.
            unsafe {
                *slots.get(3).unwrap() += 1;
                *slots.get(9000).unwrap() += 1;
                assert!(slots.get(5000).is_none());
                assert!(slots.get(4).is_none());
            }
        }
        assert_eq!(backend.get(3), Some(&31));
        assert_eq!(backend.get(9000), Some(&91));
    }

    #[test]
    fn test_dense_slots() {
        let has = Hbv::with_capacity(64, false);
        let mut backend = DenseBackend::default();
        backend.create(7, 1i64, &has);
        backend.create(2, 2, &has);
        {
            let slots = backend.raw_slots();
            // SAFETY: each id is requested once.
            unsafe {
                *slots.get(2).unwrap() *= 10;
                assert!(slots.get(3).is_none());
            }
        }
        assert_eq!(backend.get(2), Some(&20));
        assert_eq!(backend.get(7), Some(&1));
    }
}
