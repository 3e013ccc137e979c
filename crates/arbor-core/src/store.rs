//! Array-backed associative stores keyed by object id.
//!
//! Stores are created over one [`IdRange`] and hold exactly one slot per id
//! in that range. The numeric kinds ([`DoubleStore`], [`IntStore`]) are
//! unboxed `Vec` storage with a caller-declared default sentinel; the
//! generic [`ValueStore`] distinguishes "never written" as `None`.
//!
//! Domain policy: `get`, `put` and `increment` on an id outside the store's
//! range always fail with [`Error::OutOfDomain`]. Stores never grow
//! implicitly.

use crate::ids::{Id, IdRange};
use crate::{Error, Result};

/// Unboxed `f64` store over an id range.
///
/// Reading a slot that was never written returns the default sentinel
/// declared at construction.
#[derive(Debug, Clone)]
pub struct DoubleStore {
    range: IdRange,
    data: Vec<f64>,
    default: f64,
}

impl DoubleStore {
    pub fn new(range: IdRange, default: f64) -> Self {
        Self {
            range,
            data: vec![default; range.len()],
            default,
        }
    }

    /// The id range this store is defined over.
    pub fn range(&self) -> IdRange {
        self.range
    }

    pub fn get(&self, id: Id) -> Result<f64> {
        Ok(self.data[self.slot(id)?])
    }

    /// Store `value`, returning the previous slot content.
    pub fn put(&mut self, id: Id, value: f64) -> Result<f64> {
        let slot = self.slot(id)?;
        Ok(std::mem::replace(&mut self.data[slot], value))
    }

    /// Fused read-modify-write: add `delta` and return the new value.
    pub fn increment(&mut self, id: Id, delta: f64) -> Result<f64> {
        let slot = self.slot(id)?;
        self.data[slot] += delta;
        Ok(self.data[slot])
    }

    /// Reset every slot to the default sentinel.
    pub fn reset(&mut self) {
        self.data.fill(self.default);
    }

    fn slot(&self, id: Id) -> Result<usize> {
        self.range.offset_of(id).ok_or(Error::OutOfDomain {
            id,
            first: self.range.first,
            len: self.range.len,
        })
    }
}

/// Unboxed `i64` store over an id range.
///
/// Same contract as [`DoubleStore`]; the common use is counters, so
/// [`increment`](Self::increment) is the hot path.
#[derive(Debug, Clone)]
pub struct IntStore {
    range: IdRange,
    data: Vec<i64>,
    default: i64,
}

impl IntStore {
    pub fn new(range: IdRange, default: i64) -> Self {
        Self {
            range,
            data: vec![default; range.len()],
            default,
        }
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    pub fn get(&self, id: Id) -> Result<i64> {
        Ok(self.data[self.slot(id)?])
    }

    /// Store `value`, returning the previous slot content.
    pub fn put(&mut self, id: Id, value: i64) -> Result<i64> {
        let slot = self.slot(id)?;
        Ok(std::mem::replace(&mut self.data[slot], value))
    }

    /// Fused read-modify-write: add `delta` and return the new value.
    pub fn increment(&mut self, id: Id, delta: i64) -> Result<i64> {
        let slot = self.slot(id)?;
        self.data[slot] += delta;
        Ok(self.data[slot])
    }

    pub fn reset(&mut self) {
        self.data.fill(self.default);
    }

    fn slot(&self, id: Id) -> Result<usize> {
        self.range.offset_of(id).ok_or(Error::OutOfDomain {
            id,
            first: self.range.first,
            len: self.range.len,
        })
    }
}

/// Generic reference store over an id range.
///
/// `get` on an in-domain id that was never written returns `Ok(None)`;
/// an out-of-domain id is an error like everywhere else.
#[derive(Debug, Clone)]
pub struct ValueStore<T> {
    range: IdRange,
    data: Vec<Option<T>>,
}

impl<T> ValueStore<T> {
    pub fn new(range: IdRange) -> Self {
        let mut data = Vec::with_capacity(range.len());
        data.resize_with(range.len(), || None);
        Self { range, data }
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    pub fn get(&self, id: Id) -> Result<Option<&T>> {
        Ok(self.data[self.slot(id)?].as_ref())
    }

    /// Store `value`, returning the previous content if any.
    pub fn put(&mut self, id: Id, value: T) -> Result<Option<T>> {
        let slot = self.slot(id)?;
        Ok(self.data[slot].replace(value))
    }

    /// Clear the slot, returning its previous content if any.
    pub fn remove(&mut self, id: Id) -> Result<Option<T>> {
        let slot = self.slot(id)?;
        Ok(self.data[slot].take())
    }

    fn slot(&self, id: Id) -> Result<usize> {
        self.range.offset_of(id).ok_or(Error::OutOfDomain {
            id,
            first: self.range.first,
            len: self.range.len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdRegistry;

    fn range(len: usize) -> IdRange {
        IdRegistry::new().allocate(len).unwrap()
    }

    #[test]
    fn test_double_store_round_trip() {
        let r = range(10);
        let mut store = DoubleStore::new(r, f64::NAN);

        let id = r.id_at(3).unwrap();
        store.put(id, 2.5).unwrap();
        assert_eq!(store.get(id).unwrap(), 2.5);

        // Unwritten slots read as the declared sentinel.
        assert!(store.get(r.id_at(4).unwrap()).unwrap().is_nan());
    }

    #[test]
    fn test_double_store_put_returns_previous() {
        let r = range(4);
        let mut store = DoubleStore::new(r, 0.0);
        let id = r.id_at(0).unwrap();

        assert_eq!(store.put(id, 1.0).unwrap(), 0.0);
        assert_eq!(store.put(id, 2.0).unwrap(), 1.0);
    }

    #[test]
    fn test_increment_is_fused() {
        let r = range(4);
        let mut store = DoubleStore::new(r, 0.0);
        let id = r.id_at(2).unwrap();

        assert_eq!(store.increment(id, 1.5).unwrap(), 1.5);
        assert_eq!(store.increment(id, -0.5).unwrap(), 1.0);
        assert_eq!(store.get(id).unwrap(), 1.0);
    }

    #[test]
    fn test_int_store_counters() {
        let r = range(4);
        let mut counts = IntStore::new(r, 0);
        let id = r.id_at(1).unwrap();

        counts.increment(id, 1).unwrap();
        counts.increment(id, 1).unwrap();
        counts.increment(id, -3).unwrap();
        assert_eq!(counts.get(id).unwrap(), -1);
    }

    #[test]
    fn test_out_of_domain_is_error() {
        let mut registry = IdRegistry::new();
        let r = registry.allocate(4).unwrap();
        let other = registry.allocate(4).unwrap();
        let foreign = other.id_at(0).unwrap();

        let mut store = DoubleStore::new(r, 0.0);
        assert!(matches!(
            store.get(foreign),
            Err(Error::OutOfDomain { .. })
        ));
        assert!(matches!(
            store.put(foreign, 1.0),
            Err(Error::OutOfDomain { .. })
        ));
        assert!(matches!(
            store.increment(foreign, 1.0),
            Err(Error::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_value_store_none_until_written() {
        let r = range(3);
        let mut store: ValueStore<String> = ValueStore::new(r);
        let id = r.id_at(1).unwrap();

        assert!(store.get(id).unwrap().is_none());
        store.put(id, "label".to_string()).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap(), "label");

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.as_deref(), Some("label"));
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn test_reset_restores_sentinel() {
        let r = range(3);
        let mut store = IntStore::new(r, 7);
        let id = r.id_at(0).unwrap();

        store.put(id, 99).unwrap();
        store.reset();
        assert_eq!(store.get(id).unwrap(), 7);
    }
}
