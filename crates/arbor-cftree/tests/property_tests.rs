use arbor_cftree::{CfTree, TreeConfig};
use arbor_core::IdRegistry;
use arbor_distance::VectorDistance;
use arbor_testkit::{clustered_relation, linear_knn, linear_range, random_relation};
use proptest::prelude::*;
use std::sync::Arc;

fn build_tree(
    relation: &Arc<arbor_core::VectorRelation>,
    kind: VectorDistance,
    branching: usize,
    bulk: bool,
) -> CfTree {
    let config = TreeConfig { branching };
    if bulk {
        CfTree::bulk_load(relation.clone(), kind, config).unwrap()
    } else {
        let mut tree = CfTree::empty(relation.clone(), kind, config).unwrap();
        for &id in relation.ids() {
            tree.insert(id).unwrap();
        }
        tree
    }
}

/// Queries that exercise the inside, edge, and far outside of the data.
fn probe_points(relation: &arbor_core::VectorRelation) -> Vec<Vec<f64>> {
    let dim = relation.dim();
    let first = relation.get(relation.id_at(0).unwrap()).unwrap();
    vec![
        vec![0.5; dim],
        first.iter().map(|x| x + 0.13).collect(),
        vec![-3.0; dim],
    ]
}

#[test]
fn test_property_knn_matches_linear_scan() {
    proptest!(|(
        n in 1usize..150,
        dim in 1usize..5,
        branching in 4usize..12,
        seed in any::<u64>(),
        k in 1usize..20,
        bulk in any::<bool>(),
    )| {
        let mut registry = IdRegistry::new();
        let relation = Arc::new(random_relation(&mut registry, n, dim, seed));
        let tree = build_tree(&relation, VectorDistance::Euclidean, branching, bulk);
        tree.check_invariants().unwrap();

        for q in probe_points(&relation) {
            let expected = linear_knn(&relation, VectorDistance::Euclidean, &q, k);
            let got = tree.knn(&q, k).unwrap().neighbors;
            prop_assert_eq!(got, expected, "n={} k={} bulk={}", n, k, bulk);
        }
    });
}

#[test]
fn test_property_range_matches_linear_scan() {
    proptest!(|(
        n in 1usize..150,
        dim in 1usize..5,
        branching in 4usize..12,
        seed in any::<u64>(),
        radius in 0.0f64..2.0,
        bulk in any::<bool>(),
    )| {
        let mut registry = IdRegistry::new();
        let relation = Arc::new(random_relation(&mut registry, n, dim, seed));
        let tree = build_tree(&relation, VectorDistance::Euclidean, branching, bulk);

        for q in probe_points(&relation) {
            let expected = linear_range(&relation, VectorDistance::Euclidean, &q, radius);
            let got = tree.range(&q, radius).unwrap().neighbors;
            prop_assert_eq!(got, expected, "n={} radius={}", n, radius);
        }
    });
}

#[test]
fn test_property_exact_under_all_metric_kinds() {
    proptest!(|(
        n in 2usize..100,
        seed in any::<u64>(),
        k in 1usize..10,
    )| {
        let kinds = [
            VectorDistance::Euclidean,
            VectorDistance::Manhattan,
            VectorDistance::Chebyshev,
        ];
        for kind in kinds {
            let mut registry = IdRegistry::new();
            let relation = Arc::new(random_relation(&mut registry, n, 3, seed));
            let tree = build_tree(&relation, kind, 6, true);

            let q = vec![0.5, 0.5, 0.5];
            let expected = linear_knn(&relation, kind, &q, k);
            let got = tree.knn(&q, k).unwrap().neighbors;
            prop_assert_eq!(got, expected, "kind={:?}", kind);
        }
    });
}

#[test]
fn test_property_invariants_hold_under_incremental_growth() {
    proptest!(|(
        n in 1usize..200,
        branching in 4usize..10,
        seed in any::<u64>(),
    )| {
        let mut registry = IdRegistry::new();
        let relation = Arc::new(clustered_relation(&mut registry, n, 4, 5, 2.0, seed));
        let mut tree = CfTree::empty(
            relation.clone(),
            VectorDistance::Euclidean,
            TreeConfig { branching },
        )
        .unwrap();

        for &id in relation.ids() {
            tree.insert(id).unwrap();
        }
        tree.check_invariants().unwrap();
        prop_assert_eq!(tree.len(), n);
    });
}

#[test]
fn test_property_duplicated_points_are_all_found() {
    // Many coincident points stress tie-breaking: every copy is at the
    // same distance, so ordering falls back to ascending id.
    proptest!(|(copies in 2usize..40, k in 1usize..50)| {
        let mut registry = IdRegistry::new();
        let rows = vec![vec![1.0, 2.0]; copies];
        let relation = Arc::new(
            arbor_core::VectorRelation::from_rows(&mut registry, rows).unwrap(),
        );
        let tree = build_tree(&relation, VectorDistance::Euclidean, 4, true);

        let expected = linear_knn(&relation, VectorDistance::Euclidean, &[1.0, 2.0], k);
        let got = tree.knn(&[1.0, 2.0], k).unwrap().neighbors;
        prop_assert_eq!(got, expected);
    });
}
