//! Distance queries: one relation bound to one distance function.

use std::sync::Arc;

use arbor_core::{Id, VectorRelation};

use crate::vector::VectorDistance;
use crate::{Error, Result};

/// One search hit: an id and its distance from the query object.
///
/// The ordering is ascending distance with ties broken by ascending id;
/// every strategy in the stack (linear scan, precomputed matrix, tree
/// search) sorts with this same ordering so results are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: Id,
    pub distance: f64,
}

impl Neighbor {
    pub fn new(id: Id, distance: f64) -> Self {
        Self { id, distance }
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

/// Point-to-point and point-to-id distance evaluation over one relation.
///
/// Stateless: each call recomputes the distance. When the full pairwise
/// matrix is affordable, [`PrecomputedDistances`](crate::PrecomputedDistances)
/// answers the same questions in O(1).
#[derive(Debug, Clone)]
pub struct DistanceQuery {
    relation: Arc<VectorRelation>,
    distance: VectorDistance,
}

impl DistanceQuery {
    pub fn new(relation: Arc<VectorRelation>, distance: VectorDistance) -> Self {
        Self { relation, distance }
    }

    pub fn relation(&self) -> &Arc<VectorRelation> {
        &self.relation
    }

    pub fn kind(&self) -> VectorDistance {
        self.distance
    }

    /// Distance between two stored objects.
    pub fn between(&self, a: Id, b: Id) -> Result<f64> {
        let va = self.relation.get(a)?;
        let vb = self.relation.get(b)?;
        Ok(self.distance.distance(va, vb))
    }

    /// Distance from an arbitrary query point to a stored object.
    pub fn from_point(&self, point: &[f64], id: Id) -> Result<f64> {
        if point.len() != self.relation.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.relation.dim(),
                actual: point.len(),
            });
        }
        let v = self.relation.get(id)?;
        Ok(self.distance.distance(point, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::IdRegistry;

    fn relation() -> Arc<VectorRelation> {
        let mut registry = IdRegistry::new();
        Arc::new(
            VectorRelation::from_rows(
                &mut registry,
                vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![6.0, 8.0]],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_between_is_symmetric() {
        let rel = relation();
        let query = DistanceQuery::new(rel.clone(), VectorDistance::Euclidean);
        let a = rel.id_at(0).unwrap();
        let b = rel.id_at(1).unwrap();

        assert_eq!(query.between(a, b).unwrap(), 5.0);
        assert_eq!(query.between(b, a).unwrap(), 5.0);
        assert_eq!(query.between(a, a).unwrap(), 0.0);
    }

    #[test]
    fn test_from_point() {
        let rel = relation();
        let query = DistanceQuery::new(rel.clone(), VectorDistance::Euclidean);
        let b = rel.id_at(1).unwrap();

        assert_eq!(query.from_point(&[0.0, 0.0], b).unwrap(), 5.0);
    }

    #[test]
    fn test_from_point_dimension_check() {
        let rel = relation();
        let query = DistanceQuery::new(rel.clone(), VectorDistance::Euclidean);
        let b = rel.id_at(1).unwrap();

        assert!(matches!(
            query.from_point(&[0.0, 0.0, 0.0], b),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_id_propagates() {
        let rel = relation();
        let query = DistanceQuery::new(rel.clone(), VectorDistance::Euclidean);
        let a = rel.id_at(0).unwrap();

        let mut other_registry = IdRegistry::new();
        let foreign_rel =
            VectorRelation::from_rows(&mut other_registry, vec![vec![0.0, 0.0]; 5]).unwrap();
        let foreign = foreign_rel.id_at(4).unwrap();

        assert!(query.between(a, foreign).is_err());
    }

    #[test]
    fn test_neighbor_ordering_breaks_ties_by_id() {
        let rel = relation();
        let a = rel.id_at(0).unwrap();
        let b = rel.id_at(1).unwrap();
        let c = rel.id_at(2).unwrap();

        let mut hits = vec![
            Neighbor::new(c, 1.0),
            Neighbor::new(b, 1.0),
            Neighbor::new(a, 2.0),
        ];
        hits.sort();

        assert_eq!(hits[0].id, b);
        assert_eq!(hits[1].id, c);
        assert_eq!(hits[2].id, a);
    }
}
