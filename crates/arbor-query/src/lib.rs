//! Query planning over arbor relations.
//!
//! Algorithms ask the [`QueryPlanner`] for a query over a relation and a
//! distance kind; the planner assembles the cheapest available execution
//! strategy (a registered or freshly built cluster-feature tree, the
//! precomputed pairwise matrix when it fits the memory budget, or a plain
//! linear scan) and returns a uniform [`Query`] object. Results are
//! identical across strategies, down to tie-breaking.
//!
//! # Example
//!
//! ```
//! use arbor_core::{IdRegistry, VectorRelation};
//! use arbor_distance::VectorDistance;
//! use arbor_query::{QueryKind, QueryPlanner};
//! use std::sync::Arc;
//!
//! let mut registry = IdRegistry::new();
//! let relation = Arc::new(VectorRelation::from_rows(
//!     &mut registry,
//!     (0..50).map(|i| vec![i as f64]).collect(),
//! ).unwrap());
//!
//! let planner = QueryPlanner::with_defaults();
//! let query = planner
//!     .build(relation.clone(), VectorDistance::Euclidean, QueryKind::Knn)
//!     .unwrap();
//!
//! let id = relation.id_at(10).unwrap();
//! let hits = query.knn(id, 3).unwrap();
//! assert_eq!(hits[0].id, id);
//! ```

mod planner;
mod query;

pub use planner::{BuildOptions, PlannerConfig, QueryKind, QueryPlanner, Strategy};
pub use query::Query;

/// Error type for query planning and execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] arbor_core::Error),

    #[error(transparent)]
    Distance(#[from] arbor_distance::Error),

    #[error(transparent)]
    Tree(#[from] arbor_cftree::Error),

    #[error("invalid planner configuration: {0}")]
    Config(String),

    #[error("index strategy unavailable: {0}")]
    IndexUnavailable(String),
}

/// Result type for query planning and execution.
pub type Result<T> = std::result::Result<T, Error>;
