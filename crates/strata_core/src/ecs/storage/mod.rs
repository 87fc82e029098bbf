//! # Component Storage
//!
//! One [`ComponentStorage`] per component type. It owns the presence set
//! (`has`) and delegates values to a [`Backend`]:
//!
//! | Backend            | Shape                               | Best for                        |
//! |--------------------|-------------------------------------|---------------------------------|
//! | [`SparseBackend`]  | 4096-slot blocks, allocated lazily  | clustered ids, medium values    |
//! | [`DenseBackend`]   | packed array + id redirect          | tight iteration, small values   |
//! | [`UniqueBackend`]  | each distinct value stored once     | large values shared by many ids |
//! | [`TagBackend`]     | nothing                             | marker components               |
//!
//! `has.test(id)` is true iff the backend holds a value for `id`. Dropping a
//! storage removes every present id through the backend first.

mod dense;
mod slots;
mod sparse;
mod tag;
mod unique;

use std::any::type_name;
use std::ops::{Index, IndexMut};

use tracing::debug;

pub use dense::DenseBackend;
pub use slots::{DisjointSlots, RawSlots};
pub use sparse::SparseBackend;
pub use tag::TagBackend;
pub use unique::UniqueBackend;

use crate::bits::{self, BitLayers, Hbv, Ones, MAX_BITS};
use crate::error::{StrataError, StrataResult};

/// Marker trait for component types.
///
/// Anything that can be shared across the parallel strategy's worker
/// threads qualifies.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Value store behind a [`ComponentStorage`].
///
/// Required: [`get`](Backend::get), [`get_mut`](Backend::get_mut),
/// [`create`](Backend::create), [`remove`](Backend::remove). The batch and
/// instantiate operations have per-id defaults that a backend overrides
/// when it has a cheaper bulk path.
///
/// Every method receives the storage's presence set. The storage updates
/// it before `create` (the id is present) and before `remove` (the id is
/// absent, except while overwriting). Batch removal runs while the ids are
/// still present and is followed by [`sweep`](Backend::sweep).
pub trait Backend<T>: Default {
    /// False for backends that only track presence.
    const STORES_VALUES: bool = true;

    /// Value for `id`, if stored.
    fn get(&self, id: u32) -> Option<&T>;

    /// Mutable value for `id`, if stored.
    fn get_mut(&mut self, id: u32) -> Option<&mut T>;

    /// Stores `value` for `id`. `id` holds no value yet.
    fn create(&mut self, id: u32, value: T, has: &Hbv);

    /// Drops the value of `id`.
    fn remove(&mut self, id: u32, has: &Hbv);

    /// Stores a clone of `value` for every id in `[begin, end)`.
    fn batch_create(&mut self, begin: u32, end: u32, value: &T, has: &Hbv)
    where
        T: Clone,
    {
        for id in begin..end {
            self.create(id, value.clone(), has);
        }
    }

    /// Drops the value of every id in `doomed`.
    fn batch_remove<V: BitLayers + ?Sized>(&mut self, doomed: &V, has: &Hbv) {
        bits::for_each(doomed, |id| self.remove(id, has));
    }

    /// Stores a copy of `proto`'s value for `id`.
    fn instantiate(&mut self, id: u32, proto: u32, has: &Hbv)
    where
        T: Clone,
    {
        if let Some(value) = self.get(proto).cloned() {
            self.create(id, value, has);
        }
    }

    /// [`Backend::instantiate`] for every id in `[begin, end)`.
    fn batch_instantiate(&mut self, begin: u32, end: u32, proto: u32, has: &Hbv)
    where
        T: Clone,
    {
        for id in begin..end {
            self.instantiate(id, proto, has);
        }
    }

    /// Releases memory no longer covered by `has`.
    fn sweep(&mut self, _has: &Hbv) {}

    /// Presence set to expose instead of `has`, if any.
    fn filter_override(&self) -> Option<&Hbv> {
        None
    }
}

/// Storage for one component type.
///
/// # Example
///
/// ```rust
/// use strata_core::{DenseStorage, SparseStorage};
///
/// let mut health: SparseStorage<u32> = SparseStorage::new();
/// health.create(7, 100);
/// health.create(7, 90); // overwrite
/// assert_eq!(health[7], 90);
/// assert!(health.remove(7));
/// assert!(!health.contains(7));
///
/// let mut names: DenseStorage<&str> = DenseStorage::new();
/// names.batch_create(0, 3, "anon");
/// assert_eq!(names.len(), 3);
/// ```
pub struct ComponentStorage<T: Component, B: Backend<T> = SparseBackend<T>> {
    has: Hbv,
    backend: B,
    len: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

/// Blocked-array storage.
pub type SparseStorage<T> = ComponentStorage<T, SparseBackend<T>>;
/// Packed storage with an id redirect.
pub type DenseStorage<T> = ComponentStorage<T, DenseBackend<T>>;
/// Deduplicating storage.
pub type UniqueStorage<T> = ComponentStorage<T, UniqueBackend<T>>;
/// Presence-only storage.
pub type TagStorage<T> = ComponentStorage<T, TagBackend>;

impl<T: Component, B: Backend<T>> Default for ComponentStorage<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component, B: Backend<T>> ComponentStorage<T, B> {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            has: Hbv::new(),
            backend: B::default(),
            len: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Presence set driving queries. A unique storage in filter mode
    /// exposes the active value's owners instead.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &Hbv {
        self.backend.filter_override().unwrap_or(&self.has)
    }

    /// True when `id` is in [`ComponentStorage::filter`].
    #[inline]
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.filter().test(id)
    }

    /// Number of ids holding the component.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no id holds the component.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The value backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Value of `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        if !self.has.test(id) {
            return None;
        }
        self.backend.get(id)
    }

    /// Mutable value of `id`.
    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        if !self.has.test(id) {
            return None;
        }
        self.backend.get_mut(id)
    }

    /// Checked [`ComponentStorage::get`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Placeholder`] for a storage that keeps no
    /// values.
    pub fn try_get(&self, id: u32) -> StrataResult<Option<&T>> {
        if !B::STORES_VALUES {
            return Err(StrataError::Placeholder {
                component: type_name::<T>(),
            });
        }
        Ok(self.get(id))
    }

    /// Gives `id` the value `value`, replacing any previous one.
    ///
    /// `id` must be below `2^24`.
    pub fn create(&mut self, id: u32, value: T) {
        if self.claim(id) {
            self.backend.remove(id, &self.has);
        }
        self.backend.create(id, value, &self.has);
    }

    /// Checked [`ComponentStorage::create`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CapacityExceeded`] when `id` is not below
    /// `2^24`. The storage is left untouched.
    pub fn try_create(&mut self, id: u32, value: T) -> StrataResult<()> {
        if id >= MAX_BITS {
            return Err(StrataError::CapacityExceeded {
                id: u64::from(id),
                capacity: MAX_BITS,
            });
        }
        self.create(id, value);
        Ok(())
    }

    /// Removes `id`'s value. Returns false when it had none.
    pub fn remove(&mut self, id: u32) -> bool {
        if !self.has.test(id) {
            return false;
        }
        self.has.set(id, false);
        self.len -= 1;
        self.backend.remove(id, &self.has);
        true
    }

    /// Gives every id in `[begin, end)` a clone of `value`.
    pub fn batch_create(&mut self, begin: u32, end: u32, value: T)
    where
        T: Clone,
    {
        if begin >= end {
            return;
        }
        let replaced = self.release_range(begin, end);
        self.has.range_set(begin, end, true);
        self.len += (end - begin) as usize - replaced;
        self.backend.batch_create(begin, end, &value, &self.has);
    }

    /// Removes every id in `mask` that holds a value.
    pub fn batch_remove<V: BitLayers + ?Sized>(&mut self, mask: &V) {
        let doomed = bits::and((&self.has, mask));
        let removed = bits::count(&doomed);
        if removed == 0 {
            return;
        }
        self.backend.batch_remove(&doomed, &self.has);
        self.has.merge_sub(mask);
        self.backend.sweep(&self.has);
        self.len -= removed;
    }

    /// Copies `proto`'s value to `id`. Returns false when `proto` holds
    /// none.
    pub fn instantiate(&mut self, id: u32, proto: u32) -> bool
    where
        T: Clone,
    {
        if !self.has.test(proto) {
            return false;
        }
        if id == proto {
            return true;
        }
        if self.claim(id) {
            self.backend.remove(id, &self.has);
        }
        self.backend.instantiate(id, proto, &self.has);
        true
    }

    /// Copies `proto`'s value to every id in `[begin, end)`. Returns false
    /// when `proto` holds none.
    pub fn batch_instantiate(&mut self, begin: u32, end: u32, proto: u32) -> bool
    where
        T: Clone,
    {
        if !self.has.test(proto) {
            return false;
        }
        if begin >= end {
            return true;
        }
        if (begin..end).contains(&proto) {
            return self.batch_instantiate(begin, proto, proto)
                && self.batch_instantiate(proto + 1, end, proto);
        }
        let replaced = self.release_range(begin, end);
        self.has.range_set(begin, end, true);
        self.len += (end - begin) as usize - replaced;
        self.backend.batch_instantiate(begin, end, proto, &self.has);
        true
    }

    /// `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        let ones: Ones<'_, Hbv> = self.filter().iter();
        ones.filter_map(move |id| self.get(id).map(|value| (id, value)))
    }

    /// Presence set and backend, borrowed separately.
    pub(crate) fn split_mut(&mut self) -> (&Hbv, &mut B) {
        (&self.has, &mut self.backend)
    }

    /// Marks `id` present. Returns true when it already was.
    fn claim(&mut self, id: u32) -> bool {
        debug_assert!(id < MAX_BITS, "id {id} past the index capacity");
        self.reserve(id + 1);
        if self.has.test(id) {
            return true;
        }
        self.has.set(id, true);
        self.len += 1;
        false
    }

    fn reserve(&mut self, bits: u32) {
        let before = self.has.capacity();
        if bits <= before {
            return;
        }
        self.has.grow_to(bits);
        debug!(
            component = type_name::<T>(),
            from = before,
            to = self.has.capacity(),
            "storage presence set grown"
        );
    }

    /// Drops the values already present in `[begin, end)` ahead of an
    /// overwrite. Returns how many there were.
    fn release_range(&mut self, begin: u32, end: u32) -> usize {
        self.reserve(end);
        let Self { has, backend, .. } = self;
        let mut replaced = 0;
        has.for_each_in(begin, end, |id| {
            backend.remove(id, has);
            replaced += 1;
        });
        replaced
    }
}

impl<T: Component, B: Backend<T>> Drop for ComponentStorage<T, B> {
    fn drop(&mut self) {
        let Self { has, backend, .. } = self;
        backend.batch_remove(&*has, has);
    }
}

impl<T: Component, B: Backend<T>> Index<u32> for ComponentStorage<T, B> {
    type Output = T;

    /// # Panics
    ///
    /// Panics when `id` holds no value, or always for a tag storage.
    fn index(&self, id: u32) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => absent::<T, B>(id),
        }
    }
}

impl<T: Component, B: Backend<T>> IndexMut<u32> for ComponentStorage<T, B> {
    fn index_mut(&mut self, id: u32) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => absent::<T, B>(id),
        }
    }
}

#[cold]
#[track_caller]
fn absent<T, B: Backend<T>>(id: u32) -> ! {
    if B::STORES_VALUES {
        panic!("no `{}` value for id {id}", type_name::<T>());
    }
    panic!("placeholder storage for `{}` holds no values", type_name::<T>());
}

impl<T: Component + PartialEq> ComponentStorage<T, UniqueBackend<T>> {
    /// Number of distinct values held.
    #[must_use]
    pub fn unique_len(&self) -> usize {
        self.backend.unique_len()
    }

    /// Slot of the stored value equal to `value`.
    #[must_use]
    pub fn find_unique(&self, value: &T) -> Option<u32> {
        self.backend.find(value)
    }

    /// Restricts [`ComponentStorage::filter`] to the owners of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownUnique`] when no id holds `value`.
    pub fn use_unique_filter(&mut self, value: &T) -> StrataResult<()> {
        let slot = self.backend.find(value).ok_or(StrataError::UnknownUnique)?;
        self.backend.activate(slot);
        Ok(())
    }

    /// Restricts [`ComponentStorage::filter`] to the owners of slot `slot`.
    /// Returns false for an empty slot.
    pub fn use_unique_slot(&mut self, slot: u32) -> bool {
        self.backend.activate(slot)
    }

    /// Leaves filter mode.
    pub fn reset_filter(&mut self) {
        self.backend.deactivate();
    }
}
