//! Precomputed pairwise distances.
//!
//! Materializes the upper triangle of the `n × n` distance matrix once,
//! then answers every lookup in O(1). Worth it when the same pairs are
//! evaluated many times (silhouette scoring, medoid methods) and `n` is
//! small enough for `n·(n+1)/2` doubles to fit the caller's budget.

use std::sync::Arc;

use arbor_core::{Id, VectorRelation};

use crate::vector::VectorDistance;
use crate::{Error, Result};

/// Fully materialized pairwise distance matrix over one relation.
///
/// Symmetric distances are stored once; lookups normalize the index order,
/// so `get(a, b) == get(b, a)` holds structurally.
pub struct PrecomputedDistances {
    relation: Arc<VectorRelation>,
    distance: VectorDistance,
    n: usize,
    /// Packed upper triangle including the diagonal, row-major.
    data: Vec<f64>,
}

impl PrecomputedDistances {
    /// Bytes the packed triangle for `n` objects would occupy.
    pub fn required_bytes(n: usize) -> u64 {
        let entries = (n as u64) * (n as u64 + 1) / 2;
        entries * std::mem::size_of::<f64>() as u64
    }

    /// Compute the full matrix, `O(n²)` time and space.
    ///
    /// # Errors
    ///
    /// [`Error::BudgetExceeded`] when the packed triangle would not fit in
    /// `max_bytes`. The relation is untouched on failure.
    pub fn build(
        relation: Arc<VectorRelation>,
        distance: VectorDistance,
        max_bytes: u64,
    ) -> Result<Self> {
        let n = relation.len();
        let required = Self::required_bytes(n);
        if required > max_bytes {
            return Err(Error::BudgetExceeded {
                n,
                required,
                budget: max_bytes,
            });
        }

        let mut data = Vec::with_capacity((n * (n + 1)) / 2);
        for i in 0..n {
            let id_i = relation.id_at(i).expect("offset in range");
            let vi = relation.get(id_i)?;
            for j in i..n {
                let id_j = relation.id_at(j).expect("offset in range");
                let vj = relation.get(id_j)?;
                data.push(distance.distance(vi, vj));
            }
        }

        Ok(Self {
            relation,
            distance,
            n,
            data,
        })
    }

    pub fn relation(&self) -> &Arc<VectorRelation> {
        &self.relation
    }

    pub fn kind(&self) -> VectorDistance {
        self.distance
    }

    /// O(1) distance lookup between two stored objects.
    pub fn between(&self, a: Id, b: Id) -> Result<f64> {
        let i = self
            .relation
            .offset_of(a)
            .ok_or(arbor_core::Error::UnknownId { id: a })?;
        let j = self
            .relation
            .offset_of(b)
            .ok_or(arbor_core::Error::UnknownId { id: b })?;
        Ok(self.by_offset(i, j))
    }

    /// O(1) lookup by relation offsets. Offsets must be in range.
    pub fn by_offset(&self, i: usize, j: usize) -> f64 {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        self.data[self.index(lo, hi)]
    }

    /// Packed index of `(i, j)` with `i <= j`.
    fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i <= j && j < self.n);
        // Row i starts after i full rows of shrinking width.
        i * self.n - (i * (i + 1)) / 2 + j
    }
}
