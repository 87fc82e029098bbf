//! Placeholder backend for marker components: only the presence set of the
//! owning storage carries information.

use super::Backend;
use crate::bits::Hbv;

/// Stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct TagBackend;

impl<T> Backend<T> for TagBackend {
    const STORES_VALUES: bool = false;

    #[inline]
    fn get(&self, _id: u32) -> Option<&T> {
        None
    }

    #[inline]
    fn get_mut(&mut self, _id: u32) -> Option<&mut T> {
        None
    }

    fn create(&mut self, _id: u32, value: T, _has: &Hbv) {
        drop(value);
    }

    fn remove(&mut self, _id: u32, _has: &Hbv) {}

    fn batch_create(&mut self, _begin: u32, _end: u32, _value: &T, _has: &Hbv)
    where
        T: Clone,
    {
    }

    fn batch_instantiate(&mut self, _begin: u32, _end: u32, _proto: u32, _has: &Hbv)
    where
        T: Clone,
    {
    }
}
