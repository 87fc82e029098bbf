//! # Memory Management
//!
//! Leaf bit storage for the hierarchical bit vector.
//!
//! ## Design Philosophy
//!
//! Memory follows occupied regions, not identifier range:
//! - Leaf bits live in 64-word blocks allocated on first use
//! - A block is released as soon as its last bit clears
//! - Block slots are recycled through a free list

mod block_vec;
mod pool;

pub use block_vec::BlockVec;
pub use pool::{Block, BlockId, BlockPool, BLOCK_WORDS};
