//! End-to-end scenario: exactness and pruning effectiveness on uniform
//! random data, index results checked query-by-query against brute force.

use arbor_cftree::{CfTree, TreeConfig};
use arbor_core::IdRegistry;
use arbor_distance::VectorDistance;
use arbor_testkit::{linear_knn, random_relation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Runs `queries` random k-NN queries, asserts exact agreement with the
/// linear-scan oracle, and returns the mean number of points scanned.
fn run_scenario(n: usize, dim: usize, branching: usize, queries: usize, k: usize) -> f64 {
    let mut registry = IdRegistry::new();
    let relation = Arc::new(random_relation(&mut registry, n, dim, 0xA5B0));
    let tree = CfTree::bulk_load(
        relation.clone(),
        VectorDistance::Euclidean,
        TreeConfig { branching },
    )
    .unwrap();
    tree.check_invariants().unwrap();

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut scanned_total = 0usize;
    for _ in 0..queries {
        let q: Vec<f64> = (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect();

        let result = tree.knn(&q, k).unwrap();
        let expected = linear_knn(&relation, VectorDistance::Euclidean, &q, k);
        assert_eq!(result.neighbors, expected, "index disagrees with brute force");

        scanned_total += result.stats.points_scanned;
    }
    scanned_total as f64 / queries as f64
}

#[test]
fn test_scenario_uniform_2k() {
    let mean_scanned = run_scenario(2_000, 8, 32, 200, 10);
    assert!(
        mean_scanned < 1_000.0,
        "expected pruning to skip most of the data, mean scanned {mean_scanned:.0}"
    );
}

#[test]
#[ignore = "expensive: 10k points, 1k queries against a full linear-scan oracle"]
fn test_scenario_uniform_10k() {
    let mean_scanned = run_scenario(10_000, 8, 32, 1_000, 10);
    assert!(
        mean_scanned < 2_000.0,
        "expected well under 2000 of 10000 points per query, mean scanned {mean_scanned:.0}"
    );
}
