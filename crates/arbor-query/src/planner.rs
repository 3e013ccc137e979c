//! Strategy selection and the index registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use arbor_cftree::{CfTree, TreeConfig};
use arbor_core::{RelationKey, VectorRelation};
use arbor_distance::{PrecomputedDistances, VectorDistance};

use crate::query::{Plan, Query};
use crate::{Error, Result};

/// What the caller intends to ask the query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// k-nearest-neighbor queries.
    Knn,
    /// Fixed-radius range queries.
    Range,
    /// Point-to-point distance lookups only.
    Pairwise,
}

/// The execution strategy a build resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Index-accelerated tree search.
    Index,
    /// O(1) lookups against the materialized pairwise matrix.
    Precomputed,
    /// Per-call recomputation over a linear scan.
    Linear,
}

/// Build options beyond the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Fail at build time unless the index strategy can be used.
    pub require_index: bool,
}

/// Planner parameters.
///
/// The decision policy is a pure function of relation size and index
/// availability; these knobs set the thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Byte budget for a precomputed pairwise matrix. Zero disables
    /// precomputation entirely.
    /// Default: 64 MiB (fits roughly 4k objects)
    pub precompute_max_bytes: u64,

    /// Automatically bulk-load a tree for metric relations holding at
    /// least this many objects when no index is registered and the
    /// matrix does not fit.
    /// Default: 4096
    pub auto_index_min_points: usize,

    /// Parameters for auto-built trees.
    pub tree: TreeConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            precompute_max_bytes: 64 * 1024 * 1024,
            auto_index_min_points: 4096,
            tree: TreeConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auto_index_min_points == 0 {
            return Err(Error::Config(
                "auto_index_min_points must be > 0".to_string(),
            ));
        }
        self.tree.validate()?;
        Ok(())
    }
}

/// Assembles query objects, preferring the cheapest available strategy.
///
/// Built trees are registered per `(relation, distance kind)`; repeated
/// builds over the same relation reuse them. The registry is the only
/// shared state and is safe to use from multiple threads.
pub struct QueryPlanner {
    config: PlannerConfig,
    indexes: RwLock<HashMap<(RelationKey, VectorDistance), Arc<CfTree>>>,
}

impl QueryPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            indexes: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: PlannerConfig::default(),
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Register an externally built tree for reuse by later builds.
    pub fn install_index(&self, tree: Arc<CfTree>) {
        let key = (tree.relation().key(), tree.distance_kind());
        self.indexes.write().insert(key, tree);
    }

    /// The registered tree for this relation and distance kind, if any.
    pub fn installed_index(
        &self,
        relation: &VectorRelation,
        distance: VectorDistance,
    ) -> Option<Arc<CfTree>> {
        self.indexes
            .read()
            .get(&(relation.key(), distance))
            .cloned()
    }

    /// Assemble a query with default options.
    pub fn build(
        &self,
        relation: Arc<VectorRelation>,
        distance: VectorDistance,
        kind: QueryKind,
    ) -> Result<Query> {
        self.build_with(relation, distance, kind, BuildOptions::default())
    }

    /// Assemble a query, resolving the strategy at build time.
    ///
    /// Preference order for kNN/range: a registered index, then the
    /// precomputed matrix within budget, then an auto-built index for
    /// large metric relations, then linear scan. Pairwise lookups skip
    /// the index (a tree does not answer point-to-point lookups faster
    /// than recomputation).
    ///
    /// # Errors
    ///
    /// With [`BuildOptions::require_index`], a non-metric distance kind
    /// or a pairwise request fails here, never later at query time.
    pub fn build_with(
        &self,
        relation: Arc<VectorRelation>,
        distance: VectorDistance,
        kind: QueryKind,
        options: BuildOptions,
    ) -> Result<Query> {
        let plan = self.plan(&relation, distance, kind, options)?;
        debug!(
            strategy = ?plan.strategy(),
            n = relation.len(),
            ?kind,
            "planned query"
        );
        Ok(Query::new(relation, distance, plan))
    }

    fn plan(
        &self,
        relation: &Arc<VectorRelation>,
        distance: VectorDistance,
        kind: QueryKind,
        options: BuildOptions,
    ) -> Result<Plan> {
        if options.require_index {
            return self.plan_index_only(relation, distance, kind);
        }

        // A registered index wins outright for search queries.
        if matches!(kind, QueryKind::Knn | QueryKind::Range) {
            if let Some(tree) = self.installed_index(relation, distance) {
                return Ok(Plan::Tree(tree));
            }
        }

        // Small enough to materialize every pairwise distance.
        let required = PrecomputedDistances::required_bytes(relation.len());
        if required <= self.config.precompute_max_bytes {
            let matrix = PrecomputedDistances::build(
                Arc::clone(relation),
                distance,
                self.config.precompute_max_bytes,
            )?;
            return Ok(Plan::Matrix(Arc::new(matrix)));
        }

        // Large search workloads on a metric distance: build the index
        // once and keep it for the next caller.
        if matches!(kind, QueryKind::Knn | QueryKind::Range)
            && distance.is_metric()
            && relation.len() >= self.config.auto_index_min_points
        {
            let tree = Arc::new(CfTree::bulk_load(
                Arc::clone(relation),
                distance,
                self.config.tree.clone(),
            )?);
            self.install_index(Arc::clone(&tree));
            return Ok(Plan::Tree(tree));
        }

        Ok(Plan::Scan)
    }

    fn plan_index_only(
        &self,
        relation: &Arc<VectorRelation>,
        distance: VectorDistance,
        kind: QueryKind,
    ) -> Result<Plan> {
        if kind == QueryKind::Pairwise {
            return Err(Error::IndexUnavailable(
                "pairwise queries do not use an index".to_string(),
            ));
        }
        if !distance.is_metric() {
            return Err(Error::IndexUnavailable(format!(
                "distance kind {distance:?} has no valid lower bound against node summaries"
            )));
        }
        if let Some(tree) = self.installed_index(relation, distance) {
            return Ok(Plan::Tree(tree));
        }
        let tree = Arc::new(CfTree::bulk_load(
            Arc::clone(relation),
            distance,
            self.config.tree.clone(),
        )?);
        self.install_index(Arc::clone(&tree));
        Ok(Plan::Tree(tree))
    }
}
