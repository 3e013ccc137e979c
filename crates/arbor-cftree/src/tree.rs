//! Tree construction and maintenance.
//!
//! Two build paths produce the same invariants: [`CfTree::bulk_load`]
//! partitions the whole relation by balanced farthest-pair bisection, level
//! by level, into a tree of uniform height; [`CfTree::insert`] descends to
//! the cheapest leaf and splits overflowing nodes upward, growing the tree
//! at the root.
//!
//! Soundness of query pruning rests on one maintained bound: a node's
//! `radius` never undercuts the distance from its routing center to any
//! object below it. Bulk load computes it directly; insertion preserves it
//! under centroid drift by widening the radius with the drift amount.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use arbor_core::{Id, IdSet, VectorRelation};
use arbor_distance::VectorDistance;

use crate::feature::ClusterFeature;
use crate::node::{Entries, Node, NodeId};
use crate::{Error, Result};

/// Cluster-feature tree parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Branching factor `b`: the maximum number of entries per node.
    /// Nodes split past this; non-root nodes hold at least `ceil(b/2)`.
    /// Default: 32
    pub branching: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { branching: 32 }
    }
}

impl TreeConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.branching < 4 {
            return Err(Error::Config(format!(
                "branching must be >= 4, got {}",
                self.branching
            )));
        }
        Ok(())
    }

    /// Minimum entries per non-root node: `ceil(b/2)`.
    pub fn min_fill(&self) -> usize {
        (self.branching + 1) / 2
    }
}

/// Height-balanced cluster-feature tree over one relation.
///
/// The tree is bound to the relation and distance kind it was built with.
/// Queries are read-only (`&self`) and safe to run concurrently; any
/// structural mutation takes `&mut self` and therefore excludes readers.
pub struct CfTree {
    pub(crate) config: TreeConfig,
    pub(crate) distance: VectorDistance,
    pub(crate) relation: Arc<VectorRelation>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) members: IdSet,
}

impl CfTree {
    /// Create an empty tree; objects arrive through [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// [`Error::NonMetricDistance`] for a distance kind without the
    /// triangle inequality, [`Error::Config`] for invalid parameters.
    pub fn empty(
        relation: Arc<VectorRelation>,
        distance: VectorDistance,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if !distance.is_metric() {
            return Err(Error::NonMetricDistance(distance));
        }
        let nodes = vec![Node::empty_leaf(relation.dim())];
        Ok(Self {
            config,
            distance,
            relation,
            nodes,
            root: 0,
            members: IdSet::new(),
        })
    }

    /// One-shot construction over the complete relation.
    ///
    /// Objects are partitioned by balanced farthest-pair bisection into
    /// leaves of `ceil(b/2)..=b` members, then parent levels are formed
    /// the same way over node centers until a single root remains. All
    /// leaves end up at the same depth.
    pub fn bulk_load(
        relation: Arc<VectorRelation>,
        distance: VectorDistance,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if !distance.is_metric() {
            return Err(Error::NonMetricDistance(distance));
        }
        let b = config.branching;
        let ids: Vec<Id> = relation.ids().to_vec();
        let members: IdSet = ids.iter().copied().collect();

        let mut nodes: Vec<Node> = Vec::new();
        let mut level: Vec<NodeId> = Vec::new();
        for group in partition_ids(&relation, distance, ids, b)? {
            let node = leaf_node(&relation, distance, group)?;
            level.push(push_node(&mut nodes, node));
        }

        while level.len() > 1 {
            let mut next = Vec::new();
            for group in partition_level(&nodes, distance, level, b) {
                let parent = inner_node(&nodes, distance, group.clone());
                let pid = push_node(&mut nodes, parent);
                for child in group {
                    nodes[child as usize].parent = Some(pid);
                }
                next.push(pid);
            }
            level = next;
        }

        let root = level[0];
        let tree = Self {
            config,
            distance,
            relation,
            nodes,
            root,
            members,
        };
        debug!(
            points = tree.len(),
            nodes = tree.node_count(),
            height = tree.height(),
            "bulk-loaded cf-tree"
        );
        Ok(tree)
    }

    /// Insert one object from the bound relation.
    ///
    /// Descends to the child whose covering ball grows least when
    /// absorbing the object; overflowing nodes split by farthest-pair
    /// bisection and the split may cascade to the root.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyIndexed`] for a duplicate id; id lookups outside
    /// the relation propagate as core errors.
    pub fn insert(&mut self, id: Id) -> Result<()> {
        if self.members.contains(id) {
            return Err(Error::AlreadyIndexed(id));
        }
        let relation = Arc::clone(&self.relation);
        let v = relation.get(id)?.to_vec();

        // Pick the cheapest leaf: smallest required radius growth, then
        // smallest center distance, then lowest handle for determinism.
        let mut current = self.root;
        let mut path = vec![current];
        loop {
            match &self.nodes[current as usize].entries {
                Entries::Leaf(_) => break,
                Entries::Inner(children) => {
                    let mut best: Option<(f64, f64, NodeId)> = None;
                    for &child in children {
                        let node = &self.nodes[child as usize];
                        let d = self.distance.distance(&v, &node.center);
                        let growth = (d - node.radius).max(0.0);
                        let key = (growth, d, child);
                        let replace = match &best {
                            None => true,
                            Some(incumbent) => cmp_key(&key, incumbent) == Ordering::Less,
                        };
                        if replace {
                            best = Some(key);
                        }
                    }
                    current = best.expect("inner node has children").2;
                    path.push(current);
                }
            }
        }

        for &nid in &path {
            self.absorb_into(nid, &v);
        }

        let leaf = *path.last().expect("path contains at least the root");
        if let Entries::Leaf(ids) = &mut self.nodes[leaf as usize].entries {
            ids.push(id);
        }
        self.members.insert(id);

        if self.nodes[leaf as usize].entries.len() > self.config.branching {
            self.split(leaf)?;
        }
        Ok(())
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is indexed.
    pub fn contains(&self, id: Id) -> bool {
        self.members.contains(id)
    }

    /// Levels from root to leaves, inclusive.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        loop {
            match &self.nodes[current as usize].entries {
                Entries::Leaf(_) => return height,
                Entries::Inner(children) => {
                    current = children[0];
                    height += 1;
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn distance_kind(&self) -> VectorDistance {
        self.distance
    }

    pub fn relation(&self) -> &Arc<VectorRelation> {
        &self.relation
    }

    /// Absorb `v` into a node's summary, keeping the covering radius an
    /// upper bound while the centroid drifts.
    fn absorb_into(&mut self, nid: NodeId, v: &[f64]) {
        let dist = self.distance;
        let node = &mut self.nodes[nid as usize];

        if node.cf.n() == 0 {
            node.cf.absorb(v);
            node.center.copy_from_slice(v);
            node.radius = 0.0;
            return;
        }

        let old_center = node.center.clone();
        node.cf.absorb(v);
        node.cf.centroid_into(&mut node.center);

        // Members were within `radius` of the old center; after the
        // center moves by `drift` they are within `radius + drift`.
        let drift = dist.distance(&old_center, &node.center);
        node.radius = (node.radius + drift).max(dist.distance(&node.center, v));
    }

    /// Split an overflowing node into two balanced halves, cascading
    /// upward when the parent overflows in turn.
    fn split(&mut self, nid: NodeId) -> Result<()> {
        let dist = self.distance;
        let relation = Arc::clone(&self.relation);
        let parent = self.nodes[nid as usize].parent;

        let (mut left, mut right) = match self.nodes[nid as usize].entries.clone() {
            Entries::Leaf(ids) => {
                let (l, r) = bisect_ids(&relation, dist, ids)?;
                (
                    leaf_node(&relation, dist, l)?,
                    leaf_node(&relation, dist, r)?,
                )
            }
            Entries::Inner(children) => {
                let (l, r) = bisect_children(&self.nodes, dist, children);
                (
                    inner_node(&self.nodes, dist, l),
                    inner_node(&self.nodes, dist, r),
                )
            }
        };
        left.parent = parent;
        right.parent = parent;

        let right_children: Vec<NodeId> = match &right.entries {
            Entries::Inner(children) => children.clone(),
            Entries::Leaf(_) => Vec::new(),
        };

        let sibling = self.nodes.len() as NodeId;
        self.nodes[nid as usize] = left;
        self.nodes.push(right);
        for child in right_children {
            self.nodes[child as usize].parent = Some(sibling);
        }

        trace!(node = nid, sibling, "split overflowing node");

        match parent {
            Some(p) => {
                if let Entries::Inner(children) = &mut self.nodes[p as usize].entries {
                    children.push(sibling);
                }
                if self.nodes[p as usize].entries.len() > self.config.branching {
                    self.split(p)?;
                }
            }
            None => {
                let new_root = self.nodes.len() as NodeId;
                let root_node = inner_node(&self.nodes, dist, vec![nid, sibling]);
                self.nodes.push(root_node);
                self.nodes[nid as usize].parent = Some(new_root);
                self.nodes[sibling as usize].parent = Some(new_root);
                self.root = new_root;
                trace!(root = new_root, "tree grew at the root");
            }
        }
        Ok(())
    }

    /// Verify every structural invariant, returning a description of the
    /// first violation. Intended for tests and debug builds; violations
    /// indicate an implementation bug, not a caller error.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let b = self.config.branching;
        let min_fill = self.config.min_fill();
        let mut leaf_depths: Vec<usize> = Vec::new();
        let mut seen_ids = 0usize;
        let mut visited = 0usize;

        let mut stack: Vec<(NodeId, usize, Vec<NodeId>)> = vec![(self.root, 1, Vec::new())];
        while let Some((nid, depth, ancestors)) = stack.pop() {
            visited += 1;
            let node = &self.nodes[nid as usize];
            let is_root = nid == self.root;

            if is_root && node.parent.is_some() {
                return Err(format!("root {nid} has a parent"));
            }

            let len = node.entries.len();
            match (&node.entries, is_root) {
                (Entries::Leaf(_), true) => {
                    if len > b {
                        return Err(format!("root leaf holds {len} > {b} entries"));
                    }
                }
                (Entries::Inner(_), true) => {
                    if !(2..=b).contains(&len) {
                        return Err(format!("inner root holds {len} entries, expected 2..={b}"));
                    }
                }
                (_, false) => {
                    if !(min_fill..=b).contains(&len) {
                        return Err(format!(
                            "node {nid} holds {len} entries, expected {min_fill}..={b}"
                        ));
                    }
                }
            }

            match &node.entries {
                Entries::Inner(children) => {
                    let mut combined = ClusterFeature::empty(node.cf.dim());
                    for &child in children {
                        let child_node = &self.nodes[child as usize];
                        if child_node.parent != Some(nid) {
                            return Err(format!(
                                "child {child} of node {nid} has parent {:?}",
                                child_node.parent
                            ));
                        }
                        combined.merge(&child_node.cf);
                    }
                    let tol = 1e-6 * (1.0 + node.cf.squared_norm_sum().abs());
                    if !node.cf.approx_eq(&combined, tol) {
                        return Err(format!(
                            "node {nid}: cluster feature does not equal the sum of its children"
                        ));
                    }
                    let mut path = ancestors.clone();
                    path.push(nid);
                    for &child in children {
                        stack.push((child, depth + 1, path.clone()));
                    }
                }
                Entries::Leaf(ids) => {
                    leaf_depths.push(depth);
                    seen_ids += ids.len();

                    let mut combined = ClusterFeature::empty(node.cf.dim());
                    for &id in ids {
                        let v = self
                            .relation
                            .get(id)
                            .map_err(|e| format!("leaf member {id}: {e}"))?;
                        combined.absorb(v);
                        if !self.members.contains(id) {
                            return Err(format!("leaf member {id} missing from member set"));
                        }
                        // Every ancestor ball must cover the member.
                        for &anc in ancestors.iter().chain([&nid]) {
                            let a = &self.nodes[anc as usize];
                            let d = self.distance.distance(&a.center, v);
                            let tol = 1e-9 * (1.0 + a.radius);
                            if d > a.radius + tol {
                                return Err(format!(
                                    "member {id} at distance {d} outside node {anc} radius {}",
                                    a.radius
                                ));
                            }
                        }
                    }
                    let tol = 1e-6 * (1.0 + node.cf.squared_norm_sum().abs());
                    if !node.cf.approx_eq(&combined, tol) {
                        return Err(format!(
                            "leaf {nid}: cluster feature does not equal the sum of its members"
                        ));
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            return Err(format!(
                "arena holds {} nodes but {visited} are reachable from the root",
                self.nodes.len()
            ));
        }
        if seen_ids != self.members.len() {
            return Err(format!(
                "leaves hold {seen_ids} ids, member set holds {}",
                self.members.len()
            ));
        }
        if let (Some(min), Some(max)) = (leaf_depths.iter().min(), leaf_depths.iter().max()) {
            if min != max {
                return Err(format!("leaf depths vary between {min} and {max}"));
            }
        }
        Ok(())
    }
}

fn cmp_key(a: &(f64, f64, NodeId), b: &(f64, f64, NodeId)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.total_cmp(&b.1))
        .then(a.2.cmp(&b.2))
}

fn push_node(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    let id = nodes.len() as NodeId;
    nodes.push(node);
    id
}

/// Build a leaf over `ids` with exact summary and covering radius.
fn leaf_node(relation: &VectorRelation, dist: VectorDistance, ids: Vec<Id>) -> Result<Node> {
    debug_assert!(!ids.is_empty());
    let mut cf = ClusterFeature::empty(relation.dim());
    for &id in &ids {
        cf.absorb(relation.get(id)?);
    }
    let center = cf.centroid();
    let mut radius = 0.0f64;
    for &id in &ids {
        radius = radius.max(dist.distance(&center, relation.get(id)?));
    }
    Ok(Node {
        cf,
        center,
        radius,
        parent: None,
        entries: Entries::Leaf(ids),
    })
}

/// Build an inner node over `children`. The radius bound
/// `max(d(center, child_center) + child_radius)` covers every object
/// beneath by the triangle inequality.
fn inner_node(nodes: &[Node], dist: VectorDistance, children: Vec<NodeId>) -> Node {
    debug_assert!(!children.is_empty());
    let dim = nodes[children[0] as usize].cf.dim();
    let mut cf = ClusterFeature::empty(dim);
    for &child in &children {
        cf.merge(&nodes[child as usize].cf);
    }
    let center = cf.centroid();
    let mut radius = 0.0f64;
    for &child in &children {
        let node = &nodes[child as usize];
        radius = radius.max(dist.distance(&center, &node.center) + node.radius);
    }
    Node {
        cf,
        center,
        radius,
        parent: None,
        entries: Entries::Inner(children),
    }
}

/// Recursively bisect `ids` until every group fits in a leaf. Halving
/// keeps every group at `ceil(b/2)..=b` members whenever the input
/// exceeds `b`.
fn partition_ids(
    relation: &VectorRelation,
    dist: VectorDistance,
    ids: Vec<Id>,
    b: usize,
) -> Result<Vec<Vec<Id>>> {
    let mut out = Vec::new();
    let mut stack = vec![ids];
    while let Some(group) = stack.pop() {
        if group.len() <= b {
            out.push(group);
        } else {
            let (left, right) = bisect_ids(relation, dist, group)?;
            stack.push(left);
            stack.push(right);
        }
    }
    Ok(out)
}

/// Same bisection over node centers, used to form each parent level.
fn partition_level(
    nodes: &[Node],
    dist: VectorDistance,
    level: Vec<NodeId>,
    b: usize,
) -> Vec<Vec<NodeId>> {
    let mut out = Vec::new();
    let mut stack = vec![level];
    while let Some(group) = stack.pop() {
        if group.len() <= b {
            out.push(group);
        } else {
            let (left, right) = bisect_children(nodes, dist, group);
            stack.push(left);
            stack.push(right);
        }
    }
    out
}

/// Split `ids` into two equal halves around well-separated poles.
fn bisect_ids(
    relation: &VectorRelation,
    dist: VectorDistance,
    ids: Vec<Id>,
) -> Result<(Vec<Id>, Vec<Id>)> {
    let vectors: Vec<&[f64]> = ids
        .iter()
        .map(|&id| relation.get(id))
        .collect::<arbor_core::Result<_>>()?;
    let (left, right) = polarized_halves(&vectors, dist);
    Ok((
        left.into_iter().map(|i| ids[i]).collect(),
        right.into_iter().map(|i| ids[i]).collect(),
    ))
}

/// Split child handles into two equal halves by their centers.
fn bisect_children(
    nodes: &[Node],
    dist: VectorDistance,
    children: Vec<NodeId>,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let centers: Vec<&[f64]> = children
        .iter()
        .map(|&c| nodes[c as usize].center.as_slice())
        .collect();
    let (left, right) = polarized_halves(&centers, dist);
    (
        left.into_iter().map(|i| children[i]).collect(),
        right.into_iter().map(|i| children[i]).collect(),
    )
}

/// Partition indices `0..n` into two equal halves.
///
/// Seeds with an approximate farthest pair (two linear scans), cuts by
/// signed preference, then tightens with two rounds of balanced
/// two-means reassignment against the half centroids. The refinement
/// shrinks covering radii, which is what query pruning lives on. Every
/// sort is stable so ties cannot make the outcome depend on input
/// permutation quirks.
fn polarized_halves(vectors: &[&[f64]], dist: VectorDistance) -> (Vec<usize>, Vec<usize>) {
    debug_assert!(vectors.len() >= 2);

    let from_first: Vec<f64> = vectors.iter().map(|v| dist.distance(vectors[0], v)).collect();
    let left_seed = argmax(&from_first);
    let from_left: Vec<f64> = vectors
        .iter()
        .map(|v| dist.distance(vectors[left_seed], v))
        .collect();
    let right_seed = argmax(&from_left);
    let from_right: Vec<f64> = vectors
        .iter()
        .map(|v| dist.distance(vectors[right_seed], v))
        .collect();

    let scored: Vec<(f64, usize)> = (0..vectors.len())
        .map(|i| (from_left[i] - from_right[i], i))
        .collect();
    let (mut left, mut right) = cut_in_half(scored);

    for _ in 0..2 {
        let left_center = mean_of(vectors, &left);
        let right_center = mean_of(vectors, &right);
        let scored: Vec<(f64, usize)> = (0..vectors.len())
            .map(|i| {
                let dl = dist.distance(vectors[i], &left_center);
                let dr = dist.distance(vectors[i], &right_center);
                (dl - dr, i)
            })
            .collect();
        let next = cut_in_half(scored);
        if next.0 == left {
            break;
        }
        left = next.0;
        right = next.1;
    }

    (left, right)
}

/// Stable sort by signed preference, then cut in half.
fn cut_in_half(mut scored: Vec<(f64, usize)>) -> (Vec<usize>, Vec<usize>) {
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    let right = scored.split_off(scored.len() / 2);
    (
        scored.into_iter().map(|(_, i)| i).collect(),
        right.into_iter().map(|(_, i)| i).collect(),
    )
}

fn mean_of(vectors: &[&[f64]], indices: &[usize]) -> Vec<f64> {
    debug_assert!(!indices.is_empty());
    let dim = vectors[0].len();
    let mut mean = vec![0.0; dim];
    for &i in indices {
        for (m, &x) in mean.iter_mut().zip(vectors[i]) {
            *m += x;
        }
    }
    let inv = 1.0 / indices.len() as f64;
    for m in &mut mean {
        *m *= inv;
    }
    mean
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if v.total_cmp(&values[best]) == Ordering::Greater {
            best = i;
        }
    }
    best
}
