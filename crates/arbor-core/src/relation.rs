//! Relations: the read-only view algorithms and indexes consume.
//!
//! A relation pairs an id collection with the store that maps each id to
//! its feature vector. It is immutable once constructed; distance queries
//! and index builds borrow or share it for their whole lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ids::{ArrayIds, Id};
use crate::registry::IdRegistry;
use crate::store::ValueStore;
use crate::{Error, Result};

static NEXT_RELATION_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one relation instance.
///
/// Lets downstream layers (index registries in particular) distinguish
/// "the same relation" from "a different relation of the same shape".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationKey(u64);

/// Immutable pairing of ids with fixed-dimensional `f64` feature vectors.
///
/// Construction validates the pairing once (every id has a feature of the
/// declared dimensionality), so accessors afterwards only fail for ids the
/// relation never contained.
///
/// Ids are kept ascending; positional access (`offset_of` / `id_at`) is the
/// contract the precomputed distance matrix builds on.
pub struct VectorRelation {
    key: RelationKey,
    ids: Vec<Id>,
    offsets: HashMap<Id, usize>,
    store: ValueStore<Vec<f64>>,
    dim: usize,
}

impl VectorRelation {
    /// Pair an id collection with its feature store.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyRelation`] for an empty id collection
    /// - [`Error::OutOfDomain`] if an id lies outside the store's range
    /// - [`Error::MissingFeature`] if an id has no stored vector
    /// - [`Error::DimensionMismatch`] if vectors disagree on dimensionality
    pub fn new(ids: ArrayIds, store: ValueStore<Vec<f64>>) -> Result<Self> {
        let mut sorted = ids;
        sorted.sort_dedup();
        if sorted.is_empty() {
            return Err(Error::EmptyRelation);
        }

        let mut dim = None;
        for id in sorted.iter() {
            let vector = store.get(id)?.ok_or(Error::MissingFeature { id })?;
            match dim {
                None => dim = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }
        }

        let ids: Vec<Id> = sorted.into_iter().collect();
        let offsets = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        Ok(Self {
            key: RelationKey(NEXT_RELATION_KEY.fetch_add(1, Ordering::Relaxed)),
            ids,
            offsets,
            store,
            dim: dim.unwrap_or(0),
        })
    }

    /// Allocate fresh ids for `rows` and build the relation in one step.
    ///
    /// This is the constructor data-loading code (and most tests) use.
    pub fn from_rows(registry: &mut IdRegistry, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyRelation);
        }
        let range = registry.allocate(rows.len())?;
        let mut store = ValueStore::new(range);
        let mut ids = ArrayIds::with_capacity(rows.len());
        for (offset, row) in rows.into_iter().enumerate() {
            let id = range.id_at(offset).expect("offset within allocated range");
            store.put(id, row)?;
            ids.push(id);
        }
        Self::new(ids, store)
    }

    pub fn key(&self) -> RelationKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimensionality shared by every feature vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// All member ids, ascending.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Feature vector for `id`.
    pub fn get(&self, id: Id) -> Result<&[f64]> {
        let &offset = self.offsets.get(&id).ok_or(Error::UnknownId { id })?;
        let id = self.ids[offset];
        let vector = self.store.get(id)?.ok_or(Error::MissingFeature { id })?;
        Ok(vector.as_slice())
    }

    /// Position of `id` in the ascending id order, if it is a member.
    pub fn offset_of(&self, id: Id) -> Option<usize> {
        self.offsets.get(&id).copied()
    }

    /// The id at `offset` in ascending order.
    pub fn id_at(&self, offset: usize) -> Option<Id> {
        self.ids.get(offset).copied()
    }

    /// Iterate `(id, feature)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &[f64])> + '_ {
        self.ids.iter().map(move |&id| {
            let vector = self
                .store
                .get(id)
                .ok()
                .flatten()
                .expect("validated at construction");
            (id, vector.as_slice())
        })
    }
}

impl std::fmt::Debug for VectorRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorRelation")
            .field("key", &self.key)
            .field("len", &self.ids.len())
            .field("dim", &self.dim)
            .finish()
    }
}
