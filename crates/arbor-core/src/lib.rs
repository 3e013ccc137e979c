//! Object identity and associative storage for the arbor toolkit.
//!
//! Every algorithm in the toolkit refers to data-set objects through opaque
//! [`Id`] tokens issued by an [`IdRegistry`]. This crate provides:
//!
//! - **Identity**: [`Id`], contiguous [`IdRange`] blocks, and the registry
//!   that allocates and recycles them
//! - **Collections**: [`ArrayIds`] (ordered) and [`IdSet`] (unordered) with
//!   set algebra ([`union`], [`intersect`], [`minus`])
//! - **Stores**: unboxed [`DoubleStore`] / [`IntStore`] and the generic
//!   [`ValueStore`], all array-backed over an [`IdRange`]
//! - **Relations**: [`VectorRelation`], the read-only pairing of ids with
//!   their feature vectors that distance functions and indexes consume
//!
//! # Example
//!
//! ```
//! use arbor_core::{IdRegistry, DoubleStore};
//!
//! let mut registry = IdRegistry::new();
//! let range = registry.allocate(100).unwrap();
//!
//! let mut weights = DoubleStore::new(range, 0.0);
//! let id = range.id_at(42).unwrap();
//! weights.put(id, 1.5).unwrap();
//! assert_eq!(weights.get(id).unwrap(), 1.5);
//! ```

mod ids;
mod registry;
mod relation;
mod store;

pub use ids::{intersect, minus, union, ArrayIds, Id, IdCollection, IdRange, IdSet};
pub use registry::IdRegistry;
pub use relation::{RelationKey, VectorRelation};
pub use store::{DoubleStore, IntStore, ValueStore};

/// Error type for identity and storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("id space exhausted: cannot allocate {requested} more ids")]
    Exhausted { requested: usize },

    #[error("cannot allocate an empty id range")]
    EmptyAllocation,

    #[error("released range [{first}, +{len}) is not a live allocation")]
    InvalidRelease { first: u32, len: u32 },

    #[error("id {id} outside store domain [{first}, +{len})")]
    OutOfDomain { id: Id, first: u32, len: u32 },

    #[error("id {id} not present in relation")]
    UnknownId { id: Id },

    #[error("no feature stored for id {id}")]
    MissingFeature { id: Id },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("relation requires at least one id")]
    EmptyRelation,
}

/// Result type for identity and storage operations.
pub type Result<T> = std::result::Result<T, Error>;
