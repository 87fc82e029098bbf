//! # Fetches
//!
//! A query is a tuple of fetches. Each fetch knows its descriptor entry,
//! the presence set it contributes and how to produce its argument for one
//! id.
//!
//! | Fetch                  | Argument     | Contributes          |
//! |------------------------|--------------|----------------------|
//! | `&ComponentStorage<T>` | `&T`         | the storage's filter |
//! | [`Write<T>`]           | `&mut T`     | the storage's filter |
//! | [`With<T>`]            | `()`         | the storage's filter |
//! | [`Res<T>`]             | `&T`         | nothing              |
//! | [`Index`]              | `u32`        | nothing              |
//! | `&Entities`            | [`Entity`]   | the alive set        |
//!
//! SAFETY: `Write` hands out `&mut T` through [`RawSlots`]; [`Query::fetch`]
//! is unsafe to carry that per-id uniqueness requirement to the strategies.
#![allow(unsafe_code)]

use std::any::type_name;
use std::marker::PhantomData;

use super::descriptor::{Access, ArgSpec};
use crate::bits::Hbv;
use crate::ecs::entity::{Entities, Entity};
use crate::ecs::storage::{Backend, Component, ComponentStorage, DisjointSlots, RawSlots};

/// A tuple of fetches, resolved per id.
pub trait Query {
    /// Callback argument for one id.
    type Item;

    /// Appends this query's arguments to `out`.
    fn describe(out: &mut Vec<ArgSpec>);

    /// Appends the presence sets this query requires to `out`.
    fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>);

    /// Produces the argument for `id`.
    ///
    /// # Safety
    ///
    /// `id` must be in every set reported by [`Query::filters`], and the
    /// same `id` must not be fetched again while a previous item for it is
    /// alive.
    unsafe fn fetch(&self, id: u32) -> Self::Item;
}

/// Exclusive per-id access to a storage, from
/// [`ComponentStorage::write`].
pub struct Write<'a, T> {
    has: &'a Hbv,
    slots: RawSlots<'a, T>,
}

/// Presence requirement without value access, from
/// [`ComponentStorage::with`].
pub struct With<'a, T> {
    has: &'a Hbv,
    _marker: PhantomData<fn() -> T>,
}

/// Shared value passed unchanged to every call.
#[derive(Debug)]
pub struct Res<'a, T>(pub &'a T);

/// The identifier being visited.
#[derive(Clone, Copy, Debug, Default)]
pub struct Index;

impl<T: Component, B: Backend<T>> ComponentStorage<T, B> {
    /// Presence-only fetch.
    #[must_use]
    pub fn with(&self) -> With<'_, T> {
        With {
            has: self.filter(),
            _marker: PhantomData,
        }
    }
}

impl<T: Component, B: DisjointSlots<T>> ComponentStorage<T, B> {
    /// Mutable fetch. Borrows the storage exclusively for as long as any
    /// fetched value lives.
    #[must_use]
    pub fn write(&mut self) -> Write<'_, T> {
        let (has, backend) = self.split_mut();
        Write {
            has,
            slots: backend.raw_slots(),
        }
    }
}

impl<'a, T: Component, B: Backend<T>> Query for &'a ComponentStorage<T, B> {
    type Item = &'a T;

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::element::<T>(Access::Read, B::STORES_VALUES));
    }

    fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>) {
        out.push(self.filter());
    }

    #[inline]
    unsafe fn fetch(&self, id: u32) -> &'a T {
        let storage: &'a ComponentStorage<T, B> = *self;
        &storage[id]
    }
}

impl<'a, T: Component> Query for Write<'a, T> {
    type Item = &'a mut T;

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::element::<T>(Access::Write, true));
    }

    fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>) {
        out.push(self.has);
    }

    #[inline]
    unsafe fn fetch(&self, id: u32) -> &'a mut T {
        // SAFETY: forwarded from the caller; `id` is fetched once.
        match unsafe { self.slots.get(id) } {
            Some(value) => value,
            None => panic!("no `{}` value for id {id}", type_name::<T>()),
        }
    }
}

impl<T: Component> Query for With<'_, T> {
    type Item = ();

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::filter::<T>());
    }

    fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>) {
        out.push(self.has);
    }

    #[inline]
    unsafe fn fetch(&self, _id: u32) {}
}

impl<'a, T: Component> Query for Res<'a, T> {
    type Item = &'a T;

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::constant::<T>(Access::Read));
    }

    fn filters<'s>(&'s self, _out: &mut Vec<&'s Hbv>) {}

    #[inline]
    unsafe fn fetch(&self, _id: u32) -> &'a T {
        self.0
    }
}

impl Query for Index {
    type Item = u32;

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::index());
    }

    fn filters<'s>(&'s self, _out: &mut Vec<&'s Hbv>) {}

    #[inline]
    unsafe fn fetch(&self, id: u32) -> u32 {
        id
    }
}

impl Query for &Entities {
    type Item = Entity;

    fn describe(out: &mut Vec<ArgSpec>) {
        out.push(ArgSpec::element::<Entities>(Access::Read, true));
    }

    fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>) {
        out.push(self.filter());
    }

    #[inline]
    unsafe fn fetch(&self, id: u32) -> Entity {
        self.get(id)
    }
}

macro_rules! impl_query_tuple {
    ($($name:ident),*) => {
        #[allow(non_snake_case, unused_variables, unused_unsafe, clippy::unused_unit)]
        impl<$($name: Query),*> Query for ($($name,)*) {
            type Item = ($($name::Item,)*);

            fn describe(out: &mut Vec<ArgSpec>) {
                $($name::describe(out);)*
            }

            fn filters<'s>(&'s self, out: &mut Vec<&'s Hbv>) {
                let ($($name,)*) = self;
                $($name.filters(out);)*
            }

            #[inline]
            unsafe fn fetch(&self, id: u32) -> Self::Item {
                let ($($name,)*) = self;
                // SAFETY: forwarded from the caller.
                unsafe { ($($name.fetch(id),)*) }
            }
        }
    };
}

impl_query_tuple!();
impl_query_tuple!(A);
impl_query_tuple!(A, B);
impl_query_tuple!(A, B, C);
impl_query_tuple!(A, B, C, D);
impl_query_tuple!(A, B, C, D, E);
impl_query_tuple!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::storage::{DenseStorage, SparseStorage, TagStorage};
    use crate::ecs::query::ViewDescriptor;
    use crate::error::StrataError;

    #[test]
    fn test_tuple_describe() {
        let args = ViewDescriptor::of::<(&SparseStorage<u8>, Write<'_, u16>, Index)>().unwrap();
        assert_eq!(args.args().len(), 3);
        assert_eq!(args.args()[1].access, Access::Write);
        assert_eq!(args.filter_count(), 2);
    }

    #[test]
    fn test_tag_read_rejected() {
        assert!(matches!(
            ViewDescriptor::of::<(&TagStorage<()>,)>(),
            Err(StrataError::Placeholder { .. })
        ));
        assert!(ViewDescriptor::of::<(With<'_, ()>,)>().is_ok());
    }

    #[test]
    fn test_filters_collected() {
        let mut a: SparseStorage<u8> = SparseStorage::new();
        let mut b: DenseStorage<u8> = DenseStorage::new();
        a.create(1, 1);
        b.create(2, 2);
        let gravity = 9.8f32;
        let query = (&a, b.write(), Res(&gravity));
        let mut filters = Vec::new();
        query.filters(&mut filters);
        assert_eq!(filters.len(), 2);
        assert!(filters[0].test(1));
        assert!(filters[1].test(2));
    }
}
