//! # STRATA Core
//!
//! Sparse integer-keyed index built on hierarchical bit vectors:
//! - Membership over `[0, 2^24)` with empty regions skipped 64, 4096 or
//!   262144 ids at a time
//! - Generation-tagged entities with deferred, batched retirement
//! - Per-component storages whose presence sets are intersected lazily
//!   to drive queries, sequentially or on the rayon pool
//!
//! ## Architecture Rules
//!
//! 1. **No allocation inside traversal** - walks use a fixed 4-level stack
//! 2. **Memory follows occupancy** - leaf bits and values live in blocks
//!    that are freed as soon as they empty
//! 3. **Fail fast on contract violations** - checked entry points return
//!    [`StrataError`], unchecked ones assume the caller validated
//!
//! ## Example
//!
//! ```rust
//! use strata_core::query::{for_view, Sequential};
//! use strata_core::{Entities, SparseStorage};
//!
//! let mut entities = Entities::new();
//! let mut a: SparseStorage<u32> = SparseStorage::new();
//! let mut b: SparseStorage<u32> = SparseStorage::new();
//!
//! let ids: Vec<u32> = (0..3).map(|_| entities.create().id()).collect();
//! a.create(ids[0], 10);
//! a.create(ids[1], 11);
//! b.create(ids[1], 21);
//! b.create(ids[2], 22);
//!
//! let mut both = Vec::new();
//! for_view(&Sequential, (&a, &b), |(x, y)| both.push(x + y)).unwrap();
//! assert_eq!(both, [32]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bits;
pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use bits::{BitLayers, Hbv};
pub use config::StrataConfig;
pub use ecs::{
    query, storage, Backend, Component, ComponentStorage, DenseStorage, Entities, Entity,
    SparseStorage, TagStorage, UniqueStorage,
};
pub use error::{StrataError, StrataResult};
