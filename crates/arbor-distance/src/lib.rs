//! Distance functions and distance queries for arbor relations.
//!
//! This crate provides:
//!
//! - **Distance kernels**: Euclidean (L2), squared Euclidean, Manhattan
//!   (L1), Chebyshev (L∞), Cosine, all written to auto-vectorize
//! - **The [`Distance`] trait and [`VectorDistance`] enum**: the closed set
//!   of built-in distance kinds, resolved at construction time
//! - **[`DistanceQuery`]**: one relation bound to one distance function,
//!   answering point-to-point and point-to-id evaluations
//! - **[`PrecomputedDistances`]**: the materialized pairwise matrix that
//!   trades `O(n²)` memory for `O(1)` lookups
//!
//! # Example
//!
//! ```
//! use arbor_core::{IdRegistry, VectorRelation};
//! use arbor_distance::{DistanceQuery, VectorDistance};
//! use std::sync::Arc;
//!
//! let mut registry = IdRegistry::new();
//! let relation = Arc::new(VectorRelation::from_rows(
//!     &mut registry,
//!     vec![vec![0.0, 0.0], vec![3.0, 4.0]],
//! ).unwrap());
//!
//! let query = DistanceQuery::new(relation.clone(), VectorDistance::Euclidean);
//! let a = relation.id_at(0).unwrap();
//! let b = relation.id_at(1).unwrap();
//! assert_eq!(query.between(a, b).unwrap(), 5.0);
//! ```

mod matrix;
mod query;
mod vector;

pub use matrix::PrecomputedDistances;
pub use query::{DistanceQuery, Neighbor};
pub use vector::{
    chebyshev_distance, cosine_distance, euclidean_distance, manhattan_distance,
    squared_euclidean_distance, Distance, VectorDistance,
};

/// Error type for distance operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] arbor_core::Error),

    #[error("dimension mismatch: query point has {actual} dimensions, relation has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("pairwise matrix for {n} objects needs {required} bytes, budget is {budget}")]
    BudgetExceeded {
        n: usize,
        required: u64,
        budget: u64,
    },
}

/// Result type for distance operations.
pub type Result<T> = std::result::Result<T, Error>;
