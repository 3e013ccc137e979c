//! Exact kNN and range search over the tree.
//!
//! Both queries use the same lower bound against a node's summary:
//!
//! ```text
//! lb(q, node) = max(0, d(q, node.center) - node.radius)
//! ```
//!
//! By the triangle inequality, no object below the node can be closer to
//! `q` than `lb`, so a node whose bound exceeds the current threshold can
//! be skipped without losing results. kNN visits nodes best-first (smallest
//! bound first) so the threshold tightens as early as possible; range
//! queries use the fixed radius as threshold and need no visit order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use arbor_distance::Neighbor;

use crate::node::{Entries, NodeId};
use crate::tree::CfTree;
use crate::{Error, Result};

/// Counters from one traversal, returned alongside the results.
///
/// `points_scanned` against the relation size is the usual way to judge
/// how much of the data set pruning actually skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Distance evaluations, node centers and members combined.
    pub distance_calls: usize,
    /// Nodes whose entries were visited.
    pub nodes_expanded: usize,
    /// Nodes skipped because their lower bound exceeded the threshold.
    pub nodes_pruned: usize,
    /// Leaf members whose exact distance was computed.
    pub points_scanned: usize,
}

/// Result of a k-nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct KnnResult {
    /// Up to `k` neighbors, ascending by distance then id.
    pub neighbors: Vec<Neighbor>,
    pub stats: QueryStats,
}

/// Result of a range query.
#[derive(Debug, Clone)]
pub struct RangeResult {
    /// Every object within the radius, ascending by distance then id.
    pub neighbors: Vec<Neighbor>,
    pub stats: QueryStats,
}

/// Frontier entry for best-first traversal: ordered by lower bound, then
/// by handle for determinism.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrontierEntry {
    bound: f64,
    node: NodeId,
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then(self.node.cmp(&other.node))
    }
}

impl CfTree {
    /// The `k` nearest stored objects to `query`, exactly.
    ///
    /// Results are ordered ascending by distance with ties broken by
    /// ascending id, the same ordering a linear scan produces, so the
    /// two are interchangeable. If the query point is a stored object it
    /// appears in its own result at distance zero.
    pub fn knn(&self, query: &[f64], k: usize) -> Result<KnnResult> {
        self.validate_point(query)?;
        let mut stats = QueryStats::default();
        if k == 0 || self.is_empty() {
            return Ok(KnnResult {
                neighbors: Vec::new(),
                stats,
            });
        }

        // Max-heap of the k best so far; the root is the current worst.
        let mut best: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);
        let mut frontier: BinaryHeap<Reverse<FrontierEntry>> = BinaryHeap::new();
        frontier.push(Reverse(FrontierEntry {
            bound: self.node_bound(query, self.root, &mut stats),
            node: self.root,
        }));

        while let Some(Reverse(current)) = frontier.pop() {
            let threshold = if best.len() < k {
                f64::INFINITY
            } else {
                best.peek().expect("heap is full").distance
            };
            if current.bound > threshold {
                // The frontier is ordered by bound: everything left is
                // at least as far, so the whole remainder is pruned.
                stats.nodes_pruned += 1 + frontier.len();
                break;
            }

            stats.nodes_expanded += 1;
            match &self.nodes[current.node as usize].entries {
                Entries::Inner(children) => {
                    for &child in children {
                        let bound = self.node_bound(query, child, &mut stats);
                        if bound > threshold {
                            stats.nodes_pruned += 1;
                        } else {
                            frontier.push(Reverse(FrontierEntry { bound, node: child }));
                        }
                    }
                }
                Entries::Leaf(ids) => {
                    for &id in ids {
                        let v = self.relation.get(id)?;
                        stats.distance_calls += 1;
                        stats.points_scanned += 1;
                        let candidate = Neighbor::new(id, self.distance.distance(query, v));
                        if best.len() < k {
                            best.push(candidate);
                        } else if candidate < *best.peek().expect("heap is full") {
                            best.pop();
                            best.push(candidate);
                        }
                    }
                }
            }
        }

        Ok(KnnResult {
            neighbors: best.into_sorted_vec(),
            stats,
        })
    }

    /// Every stored object within `radius` of `query`, exactly.
    ///
    /// A non-finite radius yields an empty result; a zero radius returns
    /// objects at distance exactly zero.
    pub fn range(&self, query: &[f64], radius: f64) -> Result<RangeResult> {
        self.validate_point(query)?;
        let mut stats = QueryStats::default();
        let mut neighbors = Vec::new();

        if self.is_empty() || !radius.is_finite() || radius < 0.0 {
            return Ok(RangeResult { neighbors, stats });
        }

        let mut stack = vec![self.root];
        while let Some(nid) = stack.pop() {
            let bound = self.node_bound(query, nid, &mut stats);
            if bound > radius {
                stats.nodes_pruned += 1;
                continue;
            }

            stats.nodes_expanded += 1;
            match &self.nodes[nid as usize].entries {
                Entries::Inner(children) => stack.extend(children.iter().copied()),
                Entries::Leaf(ids) => {
                    for &id in ids {
                        let v = self.relation.get(id)?;
                        stats.distance_calls += 1;
                        stats.points_scanned += 1;
                        let d = self.distance.distance(query, v);
                        if d <= radius {
                            neighbors.push(Neighbor::new(id, d));
                        }
                    }
                }
            }
        }

        neighbors.sort_unstable();
        Ok(RangeResult { neighbors, stats })
    }

    fn node_bound(&self, query: &[f64], nid: NodeId, stats: &mut QueryStats) -> f64 {
        let node = &self.nodes[nid as usize];
        stats.distance_calls += 1;
        (self.distance.distance(query, &node.center) - node.radius).max(0.0)
    }

    fn validate_point(&self, query: &[f64]) -> Result<()> {
        if query.len() != self.relation.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.relation.dim(),
                actual: query.len(),
            });
        }
        for (i, &x) in query.iter().enumerate() {
            if !x.is_finite() {
                return Err(Error::InvalidPoint(i));
            }
        }
        Ok(())
    }
}
