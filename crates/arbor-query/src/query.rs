//! The uniform query object handed back to algorithms.

use std::sync::Arc;

use arbor_cftree::{CfTree, QueryStats};
use arbor_core::{Id, VectorRelation};
use arbor_distance::{Neighbor, PrecomputedDistances, VectorDistance};

use crate::planner::Strategy;
use crate::Result;

/// Resolved execution plan.
pub(crate) enum Plan {
    Tree(Arc<CfTree>),
    Matrix(Arc<PrecomputedDistances>),
    Scan,
}

impl Plan {
    pub(crate) fn strategy(&self) -> Strategy {
        match self {
            Plan::Tree(_) => Strategy::Index,
            Plan::Matrix(_) => Strategy::Precomputed,
            Plan::Scan => Strategy::Linear,
        }
    }
}

/// A query bound to one relation and one distance kind.
///
/// All strategies return identical results for the same inputs: ascending
/// distance, ties broken by ascending id. The query object never outlives
/// its relation (both are shared `Arc`s) and holds no mutable state, so it
/// can be used concurrently.
pub struct Query {
    relation: Arc<VectorRelation>,
    distance: VectorDistance,
    plan: Plan,
}

impl Query {
    pub(crate) fn new(relation: Arc<VectorRelation>, distance: VectorDistance, plan: Plan) -> Self {
        Self {
            relation,
            distance,
            plan,
        }
    }

    /// The strategy this query resolved to at build time.
    pub fn strategy(&self) -> Strategy {
        self.plan.strategy()
    }

    pub fn relation(&self) -> &Arc<VectorRelation> {
        &self.relation
    }

    pub fn distance_kind(&self) -> VectorDistance {
        self.distance
    }

    /// The `k` nearest objects to the stored object `id`, itself included
    /// at distance zero.
    pub fn knn(&self, id: Id, k: usize) -> Result<Vec<Neighbor>> {
        Ok(self.knn_with_stats(id, k)?.0)
    }

    /// Like [`knn`](Self::knn), also returning traversal counters.
    pub fn knn_with_stats(&self, id: Id, k: usize) -> Result<(Vec<Neighbor>, QueryStats)> {
        let point = self.relation.get(id)?;
        match &self.plan {
            Plan::Tree(tree) => {
                let result = tree.knn(point, k)?;
                Ok((result.neighbors, result.stats))
            }
            Plan::Matrix(matrix) => {
                let offset = self
                    .relation
                    .offset_of(id)
                    .expect("id resolved by the relation above");
                let mut all: Vec<Neighbor> = (0..self.relation.len())
                    .map(|j| {
                        let other = self.relation.id_at(j).expect("offset in range");
                        Neighbor::new(other, matrix.by_offset(offset, j))
                    })
                    .collect();
                all.sort_unstable();
                all.truncate(k);
                let stats = QueryStats {
                    points_scanned: self.relation.len(),
                    ..QueryStats::default()
                };
                Ok((all, stats))
            }
            Plan::Scan => {
                let mut all: Vec<Neighbor> = self
                    .relation
                    .iter()
                    .map(|(other, v)| Neighbor::new(other, self.distance.distance(point, v)))
                    .collect();
                all.sort_unstable();
                all.truncate(k);
                let stats = QueryStats {
                    distance_calls: self.relation.len(),
                    points_scanned: self.relation.len(),
                    ..QueryStats::default()
                };
                Ok((all, stats))
            }
        }
    }

    /// Every object within `radius` of the stored object `id`.
    pub fn range(&self, id: Id, radius: f64) -> Result<Vec<Neighbor>> {
        Ok(self.range_with_stats(id, radius)?.0)
    }

    /// Like [`range`](Self::range), also returning traversal counters.
    pub fn range_with_stats(&self, id: Id, radius: f64) -> Result<(Vec<Neighbor>, QueryStats)> {
        let point = self.relation.get(id)?;
        if !radius.is_finite() || radius < 0.0 {
            return Ok((Vec::new(), QueryStats::default()));
        }
        match &self.plan {
            Plan::Tree(tree) => {
                let result = tree.range(point, radius)?;
                Ok((result.neighbors, result.stats))
            }
            Plan::Matrix(matrix) => {
                let offset = self
                    .relation
                    .offset_of(id)
                    .expect("id resolved by the relation above");
                let mut hits: Vec<Neighbor> = (0..self.relation.len())
                    .filter_map(|j| {
                        let d = matrix.by_offset(offset, j);
                        (d <= radius).then(|| {
                            Neighbor::new(
                                self.relation.id_at(j).expect("offset in range"),
                                d,
                            )
                        })
                    })
                    .collect();
                hits.sort_unstable();
                let stats = QueryStats {
                    points_scanned: self.relation.len(),
                    ..QueryStats::default()
                };
                Ok((hits, stats))
            }
            Plan::Scan => {
                let mut hits: Vec<Neighbor> = self
                    .relation
                    .iter()
                    .filter_map(|(other, v)| {
                        let d = self.distance.distance(point, v);
                        (d <= radius).then(|| Neighbor::new(other, d))
                    })
                    .collect();
                hits.sort_unstable();
                let stats = QueryStats {
                    distance_calls: self.relation.len(),
                    points_scanned: self.relation.len(),
                    ..QueryStats::default()
                };
                Ok((hits, stats))
            }
        }
    }

    /// Distance between two stored objects.
    pub fn distance(&self, a: Id, b: Id) -> Result<f64> {
        match &self.plan {
            Plan::Matrix(matrix) => Ok(matrix.between(a, b)?),
            Plan::Tree(_) | Plan::Scan => {
                let va = self.relation.get(a)?;
                let vb = self.relation.get(b)?;
                Ok(self.distance.distance(va, vb))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{PlannerConfig, QueryKind, QueryPlanner};
    use arbor_core::IdRegistry;

    fn relation(n: usize) -> Arc<VectorRelation> {
        let mut registry = IdRegistry::new();
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![(i % 17) as f64, (i / 17) as f64]).collect();
        Arc::new(VectorRelation::from_rows(&mut registry, rows).unwrap())
    }

    fn planner_for(strategy: Strategy) -> QueryPlanner {
        let config = match strategy {
            Strategy::Precomputed => PlannerConfig::default(),
            Strategy::Linear => PlannerConfig {
                precompute_max_bytes: 0,
                auto_index_min_points: 1_000_000,
                ..PlannerConfig::default()
            },
            Strategy::Index => PlannerConfig {
                precompute_max_bytes: 0,
                auto_index_min_points: 1,
                ..PlannerConfig::default()
            },
        };
        QueryPlanner::new(config).unwrap()
    }

    #[test]
    fn test_strategies_agree_on_knn() {
        let rel = relation(120);
        let id = rel.id_at(40).unwrap();

        let mut results = Vec::new();
        for strategy in [Strategy::Index, Strategy::Precomputed, Strategy::Linear] {
            let planner = planner_for(strategy);
            let query = planner
                .build(rel.clone(), VectorDistance::Euclidean, QueryKind::Knn)
                .unwrap();
            assert_eq!(query.strategy(), strategy);
            results.push(query.knn(id, 9).unwrap());
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
        assert_eq!(results[0][0].id, id);
        assert_eq!(results[0][0].distance, 0.0);
    }

    #[test]
    fn test_strategies_agree_on_range() {
        let rel = relation(120);
        let id = rel.id_at(60).unwrap();

        let mut results = Vec::new();
        for strategy in [Strategy::Index, Strategy::Precomputed, Strategy::Linear] {
            let planner = planner_for(strategy);
            let query = planner
                .build(rel.clone(), VectorDistance::Euclidean, QueryKind::Range)
                .unwrap();
            results.push(query.range(id, 2.5).unwrap());
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
        assert!(!results[0].is_empty());
    }

    #[test]
    fn test_distance_consistent_across_strategies() {
        let rel = relation(60);
        let a = rel.id_at(3).unwrap();
        let b = rel.id_at(44).unwrap();

        let expected = VectorDistance::Manhattan
            .distance(rel.get(a).unwrap(), rel.get(b).unwrap());

        for strategy in [Strategy::Precomputed, Strategy::Linear] {
            let planner = planner_for(strategy);
            let query = planner
                .build(rel.clone(), VectorDistance::Manhattan, QueryKind::Pairwise)
                .unwrap();
            assert_eq!(query.distance(a, b).unwrap(), expected);
            assert_eq!(query.distance(b, a).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_id_fails() {
        let rel = relation(10);
        let planner = QueryPlanner::with_defaults();
        let query = planner
            .build(rel.clone(), VectorDistance::Euclidean, QueryKind::Knn)
            .unwrap();

        let mut other = IdRegistry::new();
        let foreign_rel = VectorRelation::from_rows(&mut other, vec![vec![0.0, 0.0]; 20]).unwrap();
        let foreign = foreign_rel.id_at(19).unwrap();

        assert!(query.knn(foreign, 3).is_err());
        assert!(query.range(foreign, 1.0).is_err());
    }

    #[test]
    fn test_negative_radius_is_empty() {
        let rel = relation(10);
        let planner = QueryPlanner::with_defaults();
        let query = planner
            .build(rel.clone(), VectorDistance::Euclidean, QueryKind::Range)
            .unwrap();

        let id = rel.id_at(0).unwrap();
        assert!(query.range(id, -1.0).unwrap().is_empty());
    }

    #[test]
    fn test_knn_idempotent() {
        let rel = relation(80);
        let planner = planner_for(Strategy::Index);
        let query = planner
            .build(rel.clone(), VectorDistance::Euclidean, QueryKind::Knn)
            .unwrap();

        let id = rel.id_at(11).unwrap();
        let first = query.knn(id, 5).unwrap();
        let second = query.knn(id, 5).unwrap();
        assert_eq!(first, second);
    }
}
