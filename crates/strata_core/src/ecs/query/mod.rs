//! # Query Dispatch
//!
//! [`for_view`] ties a query (a tuple of fetches) to a traversal strategy:
//! the presence sets of all fetches are intersected into one view and the
//! callback runs once per id in it. A query without presence sets runs the
//! callback exactly once.
//!
//! ```rust
//! use strata_core::query::{for_view, Index, Res, Sequential};
//! use strata_core::{DenseStorage, SparseStorage};
//!
//! let mut position: SparseStorage<f32> = SparseStorage::new();
//! let mut velocity: DenseStorage<f32> = DenseStorage::new();
//! position.batch_create(0, 4, 0.0);
//! velocity.batch_create(2, 6, 1.5);
//!
//! let dt = 2.0f32;
//! let query = (position.write(), &velocity, Res(&dt));
//! for_view(&Sequential, query, |(p, v, dt)| *p += v * dt).unwrap();
//!
//! assert_eq!(position[1], 0.0);
//! assert_eq!(position[3], 3.0);
//!
//! let mut moved = Vec::new();
//! for_view(&Sequential, (&velocity, Index), |(_, id)| moved.push(id)).unwrap();
//! assert_eq!(moved, [2, 3, 4, 5]);
//! ```

mod descriptor;
mod fetch;
mod strategy;

pub use descriptor::{Access, ArgKind, ArgSpec, ViewDescriptor, ViewDescriptorBuilder};
pub use fetch::{Index, Query, Res, With, Write};
pub use strategy::{Parallel, Sequential, Strategy};

use crate::bits::All;
use crate::error::StrataResult;

/// Runs `f` over `query` with `strategy`.
///
/// The query is consumed, so each fetched value is handed out once.
///
/// # Errors
///
/// Fails before any callback runs when the query's descriptor is invalid:
/// [`StrataError::UnfilteredIndex`](crate::StrataError::UnfilteredIndex)
/// for an identifier without any presence set, or
/// [`StrataError::Placeholder`](crate::StrataError::Placeholder) for a
/// value read from a tag storage.
pub fn for_view<Q, F, S>(strategy: &S, query: Q, f: F) -> StrataResult<()>
where
    Q: Query,
    S: Strategy<Q, F>,
{
    ViewDescriptor::of::<Q>()?;

    let mut filters = Vec::new();
    query.filters(&mut filters);
    if filters.is_empty() {
        strategy.run_once(&query, f);
    } else {
        strategy.traverse(&All(&filters), &query, f);
    }
    Ok(())
}
