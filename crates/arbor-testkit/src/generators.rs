//! Seedable relation generators.

use arbor_core::{IdRegistry, VectorRelation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Relation of `n` points drawn uniformly from the unit cube.
pub fn random_relation(registry: &mut IdRegistry, n: usize, dim: usize, seed: u64) -> VectorRelation {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();
    VectorRelation::from_rows(registry, rows).expect("generated rows are well-formed")
}

/// Relation of `n` points grouped around `clusters` random centers, each
/// point offset uniformly by at most `spread` per dimension. Clustered
/// data is what tree indexes prune well on.
pub fn clustered_relation(
    registry: &mut IdRegistry,
    n: usize,
    dim: usize,
    clusters: usize,
    spread: f64,
    seed: u64,
) -> VectorRelation {
    assert!(clusters > 0, "need at least one cluster");
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f64>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..100.0)).collect())
        .collect();

    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let center = &centers[i % clusters];
            center
                .iter()
                .map(|&c| c + rng.gen_range(-spread..=spread))
                .collect()
        })
        .collect();
    VectorRelation::from_rows(registry, rows).expect("generated rows are well-formed")
}
