//! Brute-force search oracle.
//!
//! Linear scans with the shared [`Neighbor`] ordering (ascending distance,
//! ties by ascending id). Index results must match these exactly.

use arbor_core::VectorRelation;
use arbor_distance::{Neighbor, VectorDistance};

/// Top-k by exhaustive scan.
pub fn linear_knn(
    relation: &VectorRelation,
    distance: VectorDistance,
    query: &[f64],
    k: usize,
) -> Vec<Neighbor> {
    let mut all: Vec<Neighbor> = relation
        .iter()
        .map(|(id, v)| Neighbor::new(id, distance.distance(query, v)))
        .collect();
    all.sort_unstable();
    all.truncate(k);
    all
}

/// All objects within `radius` by exhaustive scan.
pub fn linear_range(
    relation: &VectorRelation,
    distance: VectorDistance,
    query: &[f64],
    radius: f64,
) -> Vec<Neighbor> {
    let mut hits: Vec<Neighbor> = relation
        .iter()
        .filter_map(|(id, v)| {
            let d = distance.distance(query, v);
            (d <= radius).then(|| Neighbor::new(id, d))
        })
        .collect();
    hits.sort_unstable();
    hits
}
