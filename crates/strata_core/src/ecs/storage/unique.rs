//! Deduplicating backend: each distinct value is stored once, in a slot
//! with its own presence set of owners. A slot is emptied when its last
//! owner goes away.

use super::sparse::SparseBackend;
use super::Backend;
use crate::bits::{self, Hbv};

/// Distinct values shared by many ids.
///
/// In filter mode the storage's filter becomes one slot's owner set and
/// every read returns that slot's value.
#[derive(Debug)]
pub struct UniqueBackend<T> {
    values: Vec<Option<T>>,
    owners: Vec<Hbv>,
    redirect: SparseBackend<u32>,
    active: Option<u32>,
}

impl<T> Default for UniqueBackend<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            owners: Vec::new(),
            redirect: SparseBackend::default(),
            active: None,
        }
    }
}

impl<T: PartialEq> UniqueBackend<T> {
    /// Number of distinct values held.
    #[must_use]
    pub fn unique_len(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    /// Slot of the stored value equal to `value`.
    #[must_use]
    pub fn find(&self, value: &T) -> Option<u32> {
        self.values
            .iter()
            .position(|stored| stored.as_ref() == Some(value))
            .map(|slot| slot as u32)
    }

    /// Owner set of `slot`.
    #[must_use]
    pub fn owners(&self, slot: u32) -> Option<&Hbv> {
        self.owners.get(slot as usize)
    }

    /// Value held in `slot`.
    #[must_use]
    pub fn value(&self, slot: u32) -> Option<&T> {
        self.values.get(slot as usize)?.as_ref()
    }

    /// Enters filter mode on `slot`. Returns false for an empty slot.
    pub(super) fn activate(&mut self, slot: u32) -> bool {
        if self.value(slot).is_none() {
            return false;
        }
        self.active = Some(slot);
        true
    }

    pub(super) fn deactivate(&mut self) {
        self.active = None;
    }

    /// Slot holding `value`, storing it in a free slot when new.
    fn intern(&mut self, value: T) -> u32 {
        if let Some(slot) = self.find(&value) {
            return slot;
        }
        if let Some(slot) = self.values.iter().position(Option::is_none) {
            self.values[slot] = Some(value);
            return slot as u32;
        }
        self.values.push(Some(value));
        self.owners.push(Hbv::new());
        // Distinct values never outnumber ids.
        (self.values.len() - 1) as u32
    }

    fn attach(&mut self, id: u32, slot: u32) {
        let owners = &mut self.owners[slot as usize];
        owners.grow_to(id + 1);
        owners.set(id, true);
        self.redirect.insert(id, slot);
    }
}

impl<T: PartialEq> Backend<T> for UniqueBackend<T> {
    #[inline]
    fn get(&self, id: u32) -> Option<&T> {
        let slot = match self.active {
            Some(slot) => slot,
            None => *self.redirect.get(id)?,
        };
        self.value(slot)
    }

    /// Mutation is visible to every owner of the value.
    #[inline]
    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let slot = match self.active {
            Some(slot) => slot,
            None => *self.redirect.get(id)?,
        };
        self.values.get_mut(slot as usize)?.as_mut()
    }

    fn create(&mut self, id: u32, value: T, _has: &Hbv) {
        let slot = self.intern(value);
        self.attach(id, slot);
    }

    fn remove(&mut self, id: u32, has: &Hbv) {
        let Some(slot) = self.redirect.take(id) else {
            return;
        };
        self.redirect.release_if_empty(id, has);

        let Some(owners) = self.owners.get_mut(slot as usize) else {
            return;
        };
        owners.set(id, false);
        if bits::is_empty(&*owners) {
            self.values[slot as usize] = None;
            // The slot may be reused by another value.
            if self.active == Some(slot) {
                self.active = None;
            }
        }
    }

    fn batch_create(&mut self, begin: u32, end: u32, value: &T, _has: &Hbv)
    where
        T: Clone,
    {
        let slot = match self.find(value) {
            Some(slot) => slot,
            None => self.intern(value.clone()),
        };
        let owners = &mut self.owners[slot as usize];
        owners.grow_to(end);
        owners.range_set(begin, end, true);
        for id in begin..end {
            self.redirect.insert(id, slot);
        }
    }

    /// The new owner shares the prototype's slot; nothing is cloned.
    fn instantiate(&mut self, id: u32, proto: u32, _has: &Hbv) {
        if let Some(slot) = self.redirect.get(proto).copied() {
            self.attach(id, slot);
        }
    }

    fn sweep(&mut self, has: &Hbv) {
        self.redirect.sweep(has);
    }

    fn filter_override(&self) -> Option<&Hbv> {
        self.owners.get(self.active? as usize)
    }
}
