//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - A 24-bit index into component storages
//! - An 8-bit generation counter for safe reuse
//!
//! The [`Entities`] registry hands them out and retires them. Retirement is
//! deferred: [`Entities::kill`] only marks an entity, and the whole batch
//! leaves the alive set at the next [`Entities::die`].

use std::fmt;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace};

use crate::bits::{self, Hbv, MAX_BITS};
use crate::config::StrataConfig;
use crate::error::{StrataError, StrataResult};

const ID_BITS: u32 = 24;
const ID_MASK: u32 = (1 << ID_BITS) - 1;

/// Slots the registry may hand out. The last identifier is left unused so
/// that no live handle ever equals [`Entity::NULL`].
pub const MAX_ENTITIES: u32 = MAX_BITS - 1;

/// Unique identifier for an entity.
///
/// Packed into one word:
/// - Lower 24 bits: slot index
/// - Upper 8 bits: generation, bumped each time the slot is reused
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Null/invalid entity.
    pub const NULL: Self = Self(u32::MAX);

    /// Creates an entity from index and generation. Index bits above 24 are
    /// dropped.
    #[inline]
    #[must_use]
    pub const fn new(id: u32, generation: u8) -> Self {
        Self(((generation as u32) << ID_BITS) | (id & ID_MASK))
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0 & ID_MASK
    }

    /// Generation of the slot when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u8 {
        (self.0 >> ID_BITS) as u8
    }

    /// Checks if this is [`Entity::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// Raw packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a handle from [`Entity::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("Entity(NULL)");
        }
        write!(f, "Entity({}v{})", self.id(), self.generation())
    }
}

/// The entity registry.
///
/// Owns three sets over slot indices: `alive`, `dead` (free for reuse) and
/// `killed` (alive but marked for retirement). Every slot below
/// [`Entities::len`] is in exactly one of `alive` and `dead`, and `killed`
/// is a subset of `alive`.
///
/// # Example
///
/// ```rust
/// use strata_core::Entities;
///
/// let mut entities = Entities::new();
/// let e = entities.create();
/// entities.kill(e);
/// assert!(entities.alive(e)); // still visible this cycle
/// entities.die();
/// assert!(!entities.alive(e));
///
/// let reused = entities.create();
/// assert_eq!(reused.id(), e.id());
/// assert!(!entities.alive(e));
/// assert!(entities.alive(reused));
/// ```
#[derive(Debug)]
pub struct Entities {
    alive: Hbv,
    dead: Hbv,
    killed: Hbv,
    generation: Vec<u8>,
    /// Slots in `dead`.
    free_count: u32,
    /// Slots in `killed`.
    killed_count: u32,
    growth_base: u32,
    growth_factor: f64,
}

impl Default for Entities {
    fn default() -> Self {
        Self::new()
    }
}

impl Entities {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&StrataConfig::default())
    }

    /// Creates a registry reserving `config.initial_entities` slots.
    #[must_use]
    pub fn with_config(config: &StrataConfig) -> Self {
        let mut entities = Self {
            alive: Hbv::new(),
            dead: Hbv::new(),
            killed: Hbv::new(),
            generation: Vec::new(),
            free_count: 0,
            killed_count: 0,
            growth_base: config.growth_base,
            growth_factor: config.growth_factor,
        };
        entities.grow_slots(config.initial_entities.min(MAX_ENTITIES));
        entities
    }

    /// Number of slots, alive or free.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u32 {
        // Never exceeds MAX_ENTITIES.
        self.generation.len() as u32
    }

    /// True when the registry holds no slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }

    /// Slots available for reuse.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> u32 {
        self.free_count
    }

    /// Slots currently alive, killed ones included.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.len() - self.free_count
    }

    /// Presence set of alive slots.
    #[inline]
    #[must_use]
    pub const fn filter(&self) -> &Hbv {
        &self.alive
    }

    /// Slots marked by [`Entities::kill`] since the last [`Entities::die`].
    #[inline]
    #[must_use]
    pub const fn killed(&self) -> &Hbv {
        &self.killed
    }

    /// Current handle of slot `index`, or [`Entity::NULL`] past the end.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Entity {
        self.generation
            .get(index as usize)
            .map_or(Entity::NULL, |generation| Entity::new(index, *generation))
    }

    /// True only when `entity`'s slot is alive and still carries its
    /// generation.
    #[inline]
    #[must_use]
    pub fn alive(&self, entity: Entity) -> bool {
        !entity.is_null()
            && self
                .generation
                .get(entity.id() as usize)
                .is_some_and(|generation| *generation == entity.generation())
            && self.alive.test(entity.id())
    }

    /// Creates an entity in the lowest free slot, growing the registry when
    /// none is left.
    ///
    /// Returns [`Entity::NULL`] once all 2^24 - 1 slots are alive.
    pub fn create(&mut self) -> Entity {
        self.try_create().unwrap_or(Entity::NULL)
    }

    /// Checked [`Entities::create`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CapacityExceeded`] when every slot is alive.
    pub fn try_create(&mut self) -> StrataResult<Entity> {
        if self.free_count == 0 {
            let target = self.next_size();
            if target <= self.len() {
                return Err(self.exhausted(u64::from(self.len())));
            }
            self.grow_slots(target);
        }

        let id = bits::first(&self.dead).ok_or_else(|| self.exhausted(u64::from(self.len())))?;
        self.dead.set(id, false);
        self.alive.set(id, true);
        self.free_count -= 1;

        let generation = &mut self.generation[id as usize];
        *generation = generation.wrapping_add(1);
        Ok(Entity::new(id, *generation))
    }

    /// Creates `count` entities in contiguous slots placed after the highest
    /// alive slot. Free slots below it are not reused.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CapacityExceeded`] when the range would pass
    /// the last slot.
    pub fn batch_create(&mut self, count: u32) -> StrataResult<Range<u32>> {
        let begin = bits::last(&self.alive).map_or(0, |id| id + 1);
        let end = begin
            .checked_add(count)
            .filter(|end| *end <= MAX_ENTITIES)
            .ok_or_else(|| self.exhausted(u64::from(begin) + u64::from(count)))?;

        if end > self.len() {
            self.grow_slots(self.next_size().max(end));
        }

        // Every slot past the highest alive one is free.
        self.dead.range_set(begin, end, false);
        self.alive.range_set(begin, end, true);
        self.free_count -= count;
        for generation in &mut self.generation[begin as usize..end as usize] {
            *generation = generation.wrapping_add(1);
        }
        Ok(begin..end)
    }

    /// Marks `entity` for retirement at the next [`Entities::die`]. It stays
    /// alive, and visible to queries, until then. Stale handles and repeated
    /// kills are ignored.
    pub fn kill(&mut self, entity: Entity) {
        if self.alive(entity) {
            self.mark_killed(entity.id());
        }
    }

    /// Checked [`Entities::kill`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::StaleEntity`] when `entity` is not alive.
    pub fn try_kill(&mut self, entity: Entity) -> StrataResult<()> {
        if !self.alive(entity) {
            return Err(StrataError::StaleEntity {
                id: entity.id(),
                generation: entity.generation(),
            });
        }
        self.mark_killed(entity.id());
        Ok(())
    }

    fn mark_killed(&mut self, id: u32) {
        if !self.killed.test(id) {
            self.killed.set(id, true);
            self.killed_count += 1;
        }
    }

    /// Retires every killed entity in one pass: alive to dead, then clears
    /// the killed set. Call once per update cycle, after all queries ran.
    pub fn die(&mut self) {
        if self.killed_count == 0 {
            return;
        }
        self.dead.merge_add(&self.killed);
        self.alive.merge_sub(&self.killed);
        self.killed.clear();
        self.free_count += self.killed_count;
        trace!(retired = self.killed_count, "entities retired");
        self.killed_count = 0;
    }

    /// Slot count after one growth step: `len * factor + base`, capped.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn next_size(&self) -> u32 {
        let len = u64::from(self.len());
        let scaled = (f64::from(self.len()) * self.growth_factor) as u64;
        // Always at least one new slot, whatever the tunables say.
        scaled
            .saturating_add(u64::from(self.growth_base))
            .max(len + 1)
            .min(u64::from(MAX_ENTITIES)) as u32
    }

    fn grow_slots(&mut self, target: u32) {
        let old = self.len();
        if target <= old {
            return;
        }
        self.alive.grow_to(target);
        self.dead.grow_to(target);
        self.killed.grow_to(target);
        self.dead.range_set(old, target, true);
        self.generation.resize(target as usize, 0);
        self.free_count += target - old;
        debug!(from = old, to = target, "entity registry grown");
    }

    fn exhausted(&self, id: u64) -> StrataError {
        StrataError::CapacityExceeded {
            id,
            capacity: MAX_ENTITIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_roundtrip() {
        let e = Entity::new(12345, 67);
        assert_eq!(e.id(), 12345);
        assert_eq!(e.generation(), 67);
        assert_eq!(Entity::from_bits(e.to_bits()), e);
        assert!(Entity::default().is_null());
        assert_eq!(format!("{e:?}"), "Entity(12345v67)");
    }

    #[test]
    fn test_create_lowest_free_slot() {
        let mut entities = Entities::new();
        let a = entities.create();
        let b = entities.create();
        let c = entities.create();
        assert_eq!([a.id(), b.id(), c.id()], [0, 1, 2]);
        assert_eq!(a.generation(), 1);

        entities.kill(b);
        entities.die();
        let d = entities.create();
        assert_eq!(d.id(), 1);
        assert_eq!(d.generation(), 2);
    }

    #[test]
    fn test_growth_policy() {
        let mut entities = Entities::new();
        assert_eq!(entities.len(), 10);
        for _ in 0..11 {
            assert!(!entities.create().is_null());
        }
        // 10 * 1.5 + 50
        assert_eq!(entities.len(), 65);
        assert_eq!(entities.free_count(), 54);
        assert_eq!(entities.alive_count(), 11);
    }

    #[test]
    fn test_growth_without_base() {
        let config = StrataConfig {
            initial_entities: 1,
            growth_base: 0,
            growth_factor: 1.0,
            ..StrataConfig::default()
        };
        let mut entities = Entities::with_config(&config);
        for expected in 0..20 {
            assert_eq!(entities.try_create().map(Entity::id), Ok(expected));
        }
        assert_eq!(entities.alive_count(), 20);
    }

    #[test]
    fn test_kill_is_deferred() {
        let mut entities = Entities::new();
        let e = entities.create();
        entities.kill(e);
        entities.kill(e);
        assert!(entities.alive(e));
        assert!(entities.filter().test(e.id()));
        assert!(entities.killed().test(e.id()));

        entities.die();
        assert!(!entities.alive(e));
        assert!(!entities.killed().test(e.id()));
        assert_eq!(entities.free_count(), entities.len());
    }

    #[test]
    fn test_try_kill_rejects_stale() {
        let mut entities = Entities::new();
        let e = entities.create();
        entities.kill(e);
        entities.die();
        assert_eq!(
            entities.try_kill(e),
            Err(StrataError::StaleEntity {
                id: e.id(),
                generation: e.generation()
            })
        );
        assert!(entities.try_kill(Entity::NULL).is_err());
    }

    #[test]
    fn test_batch_create_appends() {
        let mut entities = Entities::new();
        let first = entities.create();
        let second = entities.create();
        entities.kill(first);
        entities.die();

        let range = entities.batch_create(100).unwrap();
        assert_eq!(range, 2..102);
        assert!(entities.alive(entities.get(50)));
        assert_eq!(entities.get(50).generation(), 1);
        assert!(entities.alive(second));
        // Slot 0 stays free for `create`.
        assert_eq!(entities.create().id(), 0);
        assert_eq!(entities.alive_count(), 102);
    }

    #[test]
    fn test_get_past_end_is_null() {
        let entities = Entities::new();
        assert!(entities.get(1000).is_null());
        assert!(!entities.alive(Entity::new(1000, 0)));
    }
}
