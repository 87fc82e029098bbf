//! # Traversal Strategies
//!
//! How a query's intersection is walked:
//! - [`Sequential`]: ascending order on the calling thread
//! - [`Parallel`]: non-empty leaf words fanned out over the rayon pool,
//!   unordered, returning once every id was visited
//!
//! SAFETY: strategies call [`Query::fetch`], whose contract is met by
//! visiting each id of the view exactly once.
#![allow(unsafe_code)]

use rayon::prelude::*;

use super::fetch::Query;
use crate::bits::{self, BitLayers, BITS_PER_LAYER, EMPTY, LEAF};
use crate::config::StrataConfig;

/// A way to drive a callback over a query.
pub trait Strategy<Q: Query, F> {
    /// Calls `f` once for every id of `view`. Every id of `view` must be in
    /// all of `query`'s filters.
    fn traverse<V: BitLayers + Sync>(&self, view: &V, query: &Q, f: F);

    /// Calls `f` exactly once, for a query without filters.
    fn run_once(&self, query: &Q, f: F);
}

/// Depth-first, ascending, single-threaded.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl<Q, F> Strategy<Q, F> for Sequential
where
    Q: Query,
    F: FnMut(Q::Item),
{
    fn traverse<V: BitLayers + Sync>(&self, view: &V, query: &Q, mut f: F) {
        bits::for_each(view, |id| {
            // SAFETY: for_each yields each id of the view once.
            f(unsafe { query.fetch(id) });
        });
    }

    fn run_once(&self, query: &Q, mut f: F) {
        // SAFETY: a query without filters fetches nothing per id.
        f(unsafe { query.fetch(0) });
    }
}

/// Leaf-word fan-out on the rayon thread pool.
///
/// Layers 0 to 2 are walked on the calling thread to collect every
/// non-empty leaf word; each word is then expanded and visited by one
/// task. Views with fewer than `min_blocks` such words run inline.
#[derive(Clone, Copy, Debug, Default)]
pub struct Parallel {
    /// Non-empty leaf words below which no task is spawned.
    pub min_blocks: usize,
}

impl Parallel {
    /// Always fans out.
    #[must_use]
    pub const fn new() -> Self {
        Self { min_blocks: 0 }
    }

    /// Uses `config.parallel_min_blocks`.
    #[must_use]
    pub const fn with_config(config: &StrataConfig) -> Self {
        Self {
            min_blocks: config.parallel_min_blocks,
        }
    }
}

impl<Q, F> Strategy<Q, F> for Parallel
where
    Q: Query + Sync,
    F: Fn(Q::Item) + Sync + Send,
{
    fn traverse<V: BitLayers + Sync>(&self, view: &V, query: &Q, f: F) {
        let mut words = Vec::new();
        bits::for_each_at(view, LEAF - 1, |word| words.push(word));

        let visit = |word: u32| {
            let mut leaf = view.layer(LEAF, word);
            while leaf != EMPTY {
                let low = leaf.trailing_zeros();
                leaf &= leaf - 1;
                let id = (word << BITS_PER_LAYER) | low;
                // SAFETY: each leaf word is visited by exactly one task and
                // each of its bits once.
                f(unsafe { query.fetch(id) });
            }
        };

        if words.len() < self.min_blocks {
            words.iter().for_each(|word| visit(*word));
        } else {
            words.par_iter().for_each(|word| visit(*word));
        }
    }

    fn run_once(&self, query: &Q, f: F) {
        // SAFETY: a query without filters fetches nothing per id.
        f(unsafe { query.fetch(0) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Hbv;
    use crate::ecs::query::Index;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn sample() -> Hbv {
        let mut vec = Hbv::with_capacity(1 << 20, false);
        vec.range_set(100, 50_000, true);
        vec.set(900_000, true);
        vec
    }

    #[test]
    fn test_sequential_order() {
        let vec = sample();
        let mut seen = Vec::new();
        Sequential.traverse(&vec, &(Index,), |(id,)| seen.push(id));
        assert_eq!(seen.len(), 49_901);
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(seen.last(), Some(&900_000));
    }

    #[test]
    fn test_parallel_visits_all() {
        let vec = sample();
        let sum = AtomicU64::new(0);
        let visits = AtomicU64::new(0);
        Parallel::new().traverse(&vec, &(Index,), |(id,)| {
            sum.fetch_add(u64::from(id), Ordering::Relaxed);
            visits.fetch_add(1, Ordering::Relaxed);
        });
        let expected: u64 = (100..50_000u64).sum::<u64>() + 900_000;
        assert_eq!(sum.load(Ordering::Relaxed), expected);
        assert_eq!(visits.load(Ordering::Relaxed), 49_901);
    }

    #[test]
    fn test_parallel_inline_below_threshold() {
        let vec = sample();
        let visits = AtomicU64::new(0);
        let strategy = Parallel { min_blocks: usize::MAX };
        strategy.traverse(&vec, &(), |()| {
            visits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(visits.load(Ordering::Relaxed), 49_901);
    }
}
