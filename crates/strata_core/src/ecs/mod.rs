//! # Entity Component System
//!
//! Entities, their components and the queries that join them, all keyed by
//! hierarchical bit vectors.
//!
//! ## Design Philosophy
//!
//! - Every storage exposes its presence set; a query is an intersection
//! - Entities retire in one batch per cycle, never mid-query
//! - Backends are chosen per component type, not per world
//! - No dynamic dispatch in hot paths

mod entity;
pub mod query;
pub mod storage;

pub use entity::{Entities, Entity, MAX_ENTITIES};
pub use storage::{
    Backend, Component, ComponentStorage, DenseBackend, DenseStorage, DisjointSlots, RawSlots,
    SparseBackend, SparseStorage, TagBackend, TagStorage, UniqueBackend, UniqueStorage,
};
