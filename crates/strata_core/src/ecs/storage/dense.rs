//! Packed backend: values sit contiguously in insertion order and a sparse
//! redirect maps each id to its slot. Removal swaps the last slot into the
//! hole and repoints the moved id.

use super::sparse::SparseBackend;
use super::Backend;
use crate::bits::Hbv;

/// A packed value and the id that owns it.
#[derive(Debug)]
pub(super) struct DenseSlot<T> {
    pub(super) value: T,
    pub(super) owner: u32,
}

/// Packed values with an id redirect.
///
/// The redirect entry of every stored id equals that id's current slot.
#[derive(Debug)]
pub struct DenseBackend<T> {
    slots: Vec<DenseSlot<T>>,
    redirect: SparseBackend<u32>,
}

impl<T> Default for DenseBackend<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            redirect: SparseBackend::default(),
        }
    }
}

impl<T> DenseBackend<T> {
    /// `(id, value)` pairs in packed order, which is not id order.
    pub fn iter_packed(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.slots.iter().map(|slot| (slot.owner, &slot.value))
    }

    /// Number of packed values.
    #[must_use]
    pub fn packed_len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot_of(&self, id: u32) -> Option<usize> {
        self.redirect.get(id).map(|slot| *slot as usize)
    }

    pub(super) fn parts_mut(&mut self) -> (&mut [DenseSlot<T>], &SparseBackend<u32>) {
        (&mut self.slots, &self.redirect)
    }
}

impl<T> Backend<T> for DenseBackend<T> {
    #[inline]
    fn get(&self, id: u32) -> Option<&T> {
        let slot = self.slot_of(id)?;
        self.slots.get(slot).map(|slot| &slot.value)
    }

    #[inline]
    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let slot = self.slot_of(id)?;
        self.slots.get_mut(slot).map(|slot| &mut slot.value)
    }

    fn create(&mut self, id: u32, value: T, _has: &Hbv) {
        // Slot count is bounded by the 2^24 identifier space.
        let slot = self.slots.len() as u32;
        self.slots.push(DenseSlot { value, owner: id });
        self.redirect.insert(id, slot);
    }

    fn remove(&mut self, id: u32, has: &Hbv) {
        let Some(slot) = self.redirect.take(id) else {
            return;
        };
        self.redirect.release_if_empty(id, has);

        let index = slot as usize;
        if index >= self.slots.len() {
            return;
        }
        let removed = self.slots.swap_remove(index);
        if let Some(moved) = self.slots.get(index) {
            self.redirect.insert(moved.owner, slot);
        }
        drop(removed);
    }

    fn sweep(&mut self, has: &Hbv) {
        self.redirect.sweep(has);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(ids: &[u32]) -> Hbv {
        let mut has = Hbv::with_capacity(1024, false);
        for &id in ids {
            has.set(id, true);
        }
        has
    }

    #[test]
    fn test_swap_remove_repoints_last() {
        let mut has = present(&[10, 20, 30]);
        let mut backend = DenseBackend::default();
        for id in [10, 20, 30] {
            backend.create(id, id + 1, &has);
        }

        has.set(10, false);
        backend.remove(10, &has);
        assert_eq!(backend.packed_len(), 2);
        assert_eq!(backend.get(30), Some(&31));
        assert_eq!(backend.get(20), Some(&21));
        assert_eq!(backend.get(10), None);
        assert_eq!(backend.iter_packed().next(), Some((30, &31)));
    }

    #[test]
    fn test_remove_last_slot() {
        let mut has = present(&[1, 2]);
        let mut backend = DenseBackend::default();
        backend.create(1, "a", &has);
        backend.create(2, "b", &has);

        has.set(2, false);
        backend.remove(2, &has);
        assert_eq!(backend.get(1), Some(&"a"));
        assert_eq!(backend.packed_len(), 1);
    }
}
