//! Balanced cluster-feature tree index.
//!
//! The tree partitions a relation's id space into a height-balanced
//! hierarchy of nodes. Each node carries a compact summary, a
//! [`ClusterFeature`] (count, linear sum, squared-norm sum) plus a routing
//! center and covering radius, sufficient to lower-bound the distance from
//! any query point to every object below the node without visiting them.
//!
//! Queries traverse best-first and prune a node as soon as its lower bound
//! exceeds the current threshold (the k-th best distance for kNN, the fixed
//! radius for range queries). Because the bound never overestimates the
//! true minimum member distance, results are exact, not approximate.
//!
//! # Example
//!
//! ```
//! use arbor_core::{IdRegistry, VectorRelation};
//! use arbor_cftree::{CfTree, TreeConfig};
//! use arbor_distance::VectorDistance;
//! use std::sync::Arc;
//!
//! let mut registry = IdRegistry::new();
//! let rows: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64, 0.0]).collect();
//! let relation = Arc::new(VectorRelation::from_rows(&mut registry, rows).unwrap());
//!
//! let tree = CfTree::bulk_load(
//!     relation.clone(),
//!     VectorDistance::Euclidean,
//!     TreeConfig::default(),
//! ).unwrap();
//!
//! let result = tree.knn(&[10.2, 0.0], 3).unwrap();
//! assert_eq!(result.neighbors.len(), 3);
//! assert_eq!(result.neighbors[0].id, relation.id_at(10).unwrap());
//! ```

mod feature;
mod node;
mod search;
mod tree;

pub use feature::ClusterFeature;
pub use search::{KnnResult, QueryStats, RangeResult};
pub use tree::{CfTree, TreeConfig};

use arbor_distance::VectorDistance;

/// Error type for tree construction and queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] arbor_core::Error),

    #[error(transparent)]
    Distance(#[from] arbor_distance::Error),

    #[error("distance kind {0:?} is not a metric; tree pruning needs the triangle inequality")]
    NonMetricDistance(VectorDistance),

    #[error("invalid tree configuration: {0}")]
    Config(String),

    #[error("dimension mismatch: query point has {actual} dimensions, tree has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query point contains a non-finite component at index {0}")]
    InvalidPoint(usize),

    #[error("id {0} is already indexed")]
    AlreadyIndexed(arbor_core::Id),
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;
