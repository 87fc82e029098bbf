//! # Index Error Types
//!
//! Every failure in this crate is a caller contract violation. The hot path
//! (`test`, `set`, traversal, value access) never returns these; only the
//! checked entry points do.

use thiserror::Error;

/// Errors surfaced by the checked entry points of the index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrataError {
    /// An identifier beyond the 24-bit identifier space was requested.
    #[error("identifier {id} exceeds index capacity {capacity}")]
    CapacityExceeded {
        /// The offending identifier (or requested size).
        id: u64,
        /// The hard capacity of the index.
        capacity: u32,
    },

    /// A handle whose generation no longer matches its slot was used.
    #[error("stale entity handle: id {id}, generation {generation}")]
    StaleEntity {
        /// Slot index of the handle.
        id: u32,
        /// Generation carried by the handle.
        generation: u8,
    },

    /// A view asked for the identifier without any presence filter.
    #[error("index is not meaningful without a filter")]
    UnfilteredIndex,

    /// A value was read from a storage that only tracks presence.
    #[error("placeholder storage for `{component}` holds no values")]
    Placeholder {
        /// Type name of the component.
        component: &'static str,
    },

    /// Filter mode was requested for a value the unique storage does not hold.
    #[error("value is not held by the unique storage")]
    UnknownUnique,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for checked index operations.
pub type StrataResult<T> = Result<T, StrataError>;
