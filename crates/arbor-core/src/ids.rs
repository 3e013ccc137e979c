//! Opaque object ids and id collections.
//!
//! An [`Id`] identifies exactly one data-set object. Ids are totally ordered
//! and hashable but carry no other meaning; the only way to mint one is
//! through the [`IdRegistry`](crate::IdRegistry) or by iterating a range or
//! collection that already holds it.

use std::collections::HashSet;
use std::fmt;

/// Opaque identifier for one data-set object.
///
/// Two ids compare equal iff they denote the same logical object. The
/// ordering is stable and is used as the tie-breaker wherever results are
/// sorted by distance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub(crate) u32);

impl Id {
    /// Raw index backing this id. Crate-internal: stores use it for
    /// array addressing, nothing else should.
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A contiguous block of ids, as handed out by the registry.
///
/// Ranges support O(1) membership and O(1) translation between an id and
/// its position within the range, which is what makes array-backed stores
/// possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub(crate) first: u32,
    pub(crate) len: u32,
}

impl IdRange {
    /// Number of ids in the range.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the range is empty. Ranges returned by the registry never are.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// O(1) membership test.
    pub fn contains(&self, id: Id) -> bool {
        id.0 >= self.first && id.0 - self.first < self.len
    }

    /// Position of `id` within the range, or `None` if it lies outside.
    pub fn offset_of(&self, id: Id) -> Option<usize> {
        self.contains(id).then(|| (id.0 - self.first) as usize)
    }

    /// The id at position `offset`, or `None` past the end.
    pub fn id_at(&self, offset: usize) -> Option<Id> {
        (offset < self.len as usize).then(|| Id(self.first + offset as u32))
    }

    /// Iterate the range in ascending id order. Restartable: each call
    /// yields a fresh iterator over the full range.
    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        (self.first..self.first + self.len).map(Id)
    }
}

/// Common interface over the three id collection shapes.
///
/// [`IdRange`] and [`ArrayIds`] iterate in a defined order (ascending and
/// insertion order respectively); [`IdSet`] makes no ordering guarantee.
pub trait IdCollection {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: Id) -> bool;

    /// Finite, restartable iteration over the collection's ids.
    fn iter(&self) -> Box<dyn Iterator<Item = Id> + '_>;
}

impl IdCollection for IdRange {
    fn len(&self) -> usize {
        IdRange::len(self)
    }

    fn contains(&self, id: Id) -> bool {
        IdRange::contains(self, id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        Box::new(IdRange::iter(self))
    }
}

/// Ordered id list. Preserves insertion order until [`sort`](Self::sort)
/// is called. Membership is a linear scan while unsorted and a binary
/// search once the list is known to be ascending; the sortedness is
/// tracked across pushes, so appending in ascending order keeps the fast
/// path.
#[derive(Debug, Clone)]
pub struct ArrayIds {
    ids: Vec<Id>,
    sorted: bool,
}

impl ArrayIds {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            sorted: true,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            sorted: true,
        }
    }

    /// Append an id. Duplicates are not rejected; callers that need set
    /// semantics use [`IdSet`].
    pub fn push(&mut self, id: Id) {
        if let Some(&last) = self.ids.last() {
            if id < last {
                self.sorted = false;
            }
        }
        self.ids.push(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Id> {
        self.ids.get(index).copied()
    }

    /// O(log n) once sorted, O(n) otherwise.
    pub fn contains(&self, id: Id) -> bool {
        if self.sorted {
            self.ids.binary_search(&id).is_ok()
        } else {
            self.ids.contains(&id)
        }
    }

    /// Whether the list is currently ascending (and membership checks
    /// binary-search).
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Sort ascending by id.
    pub fn sort(&mut self) {
        self.ids.sort_unstable();
        self.sorted = true;
    }

    /// Sort ascending and drop duplicate ids.
    pub fn sort_dedup(&mut self) {
        self.ids.sort_unstable();
        self.ids.dedup();
        self.sorted = true;
    }

    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }
}

impl Default for ArrayIds {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ArrayIds {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for ArrayIds {}

impl IdCollection for ArrayIds {
    fn len(&self) -> usize {
        ArrayIds::len(self)
    }

    fn contains(&self, id: Id) -> bool {
        ArrayIds::contains(self, id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        Box::new(ArrayIds::iter(self))
    }
}

impl FromIterator<Id> for ArrayIds {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        let ids: Vec<Id> = iter.into_iter().collect();
        let sorted = ids.windows(2).all(|pair| pair[0] <= pair[1]);
        Self { ids, sorted }
    }
}

impl IntoIterator for ArrayIds {
    type Item = Id;
    type IntoIter = std::vec::IntoIter<Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

/// Unordered id set with O(1) membership.
#[derive(Debug, Clone, Default)]
pub struct IdSet {
    ids: HashSet<Id>,
}

impl IdSet {
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::with_capacity(capacity),
        }
    }

    /// Insert an id. Returns `false` if it was already present.
    pub fn insert(&mut self, id: Id) -> bool {
        self.ids.insert(id)
    }

    /// Remove an id. Returns `false` if it was not present.
    pub fn remove(&mut self, id: Id) -> bool {
        self.ids.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids.iter().copied()
    }
}

impl IdCollection for IdSet {
    fn len(&self) -> usize {
        IdSet::len(self)
    }

    fn contains(&self, id: Id) -> bool {
        IdSet::contains(self, id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        Box::new(IdSet::iter(self))
    }
}

impl FromIterator<Id> for IdSet {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Union of two collections, returned ascending by id.
pub fn union<A, B>(a: &A, b: &B) -> ArrayIds
where
    A: IdCollection + ?Sized,
    B: IdCollection + ?Sized,
{
    let mut out: Vec<Id> = Vec::with_capacity(a.len() + b.len());
    out.extend(a.iter());
    out.extend(b.iter());
    out.sort_unstable();
    out.dedup();
    ArrayIds {
        ids: out,
        sorted: true,
    }
}

/// Intersection of two collections, returned ascending by id.
pub fn intersect<A, B>(a: &A, b: &B) -> ArrayIds
where
    A: IdCollection + ?Sized,
    B: IdCollection + ?Sized,
{
    let mut out: Vec<Id> = a.iter().filter(|id| b.contains(*id)).collect();
    out.sort_unstable();
    out.dedup();
    ArrayIds {
        ids: out,
        sorted: true,
    }
}

/// Ids in `a` but not in `b`, returned ascending by id.
pub fn minus<A, B>(a: &A, b: &B) -> ArrayIds
where
    A: IdCollection + ?Sized,
    B: IdCollection + ?Sized,
{
    let mut out: Vec<Id> = a.iter().filter(|id| !b.contains(*id)).collect();
    out.sort_unstable();
    out.dedup();
    ArrayIds {
        ids: out,
        sorted: true,
    }
}
