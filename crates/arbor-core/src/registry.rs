//! Id allocation and recycling.
//!
//! The registry hands out contiguous [`IdRange`] blocks. A range stays
//! reserved until it is released; released blocks are recycled first-fit,
//! so ids from a still-live range are never handed out twice.

use crate::ids::{Id, IdRange};
use crate::{Error, Result};

/// Allocator for contiguous id ranges.
///
/// Allocation never blocks. The failure mode is exhaustion of the 32-bit
/// id space, reported as [`Error::Exhausted`].
///
/// # Example
///
/// ```
/// use arbor_core::IdRegistry;
///
/// let mut registry = IdRegistry::new();
/// let a = registry.allocate(100).unwrap();
/// let b = registry.allocate(50).unwrap();
/// assert!(a.iter().all(|id| !b.contains(id)));
///
/// registry.release(a).unwrap();
/// // The block is recycled for later allocations of fitting size.
/// let c = registry.allocate(100).unwrap();
/// assert_eq!(c.len(), 100);
/// ```
#[derive(Debug, Default)]
pub struct IdRegistry {
    /// First id never handed out.
    next: u32,
    /// Released blocks as (first, len), ascending by first, coalesced.
    free: Vec<(u32, u32)>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a contiguous range of `count` fresh or recycled ids.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyAllocation`] for `count == 0`
    /// - [`Error::Exhausted`] when the id space cannot satisfy the request
    pub fn allocate(&mut self, count: usize) -> Result<IdRange> {
        if count == 0 {
            return Err(Error::EmptyAllocation);
        }
        let requested: u32 = count
            .try_into()
            .map_err(|_| Error::Exhausted { requested: count })?;

        // First fit from the free list.
        if let Some(pos) = self.free.iter().position(|&(_, len)| len >= requested) {
            let (first, len) = self.free[pos];
            if len == requested {
                self.free.remove(pos);
            } else {
                self.free[pos] = (first + requested, len - requested);
            }
            return Ok(IdRange {
                first,
                len: requested,
            });
        }

        // Fresh block past the high-water mark.
        let first = self.next;
        let end = (first as u64) + (requested as u64);
        if end > u32::MAX as u64 {
            return Err(Error::Exhausted { requested: count });
        }
        self.next = end as u32;
        Ok(IdRange {
            first,
            len: requested,
        })
    }

    /// Return a range to the registry for recycling.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRelease`] if the range was never allocated or has
    /// already been released (an overlap with the free list or with
    /// untouched id space).
    pub fn release(&mut self, range: IdRange) -> Result<()> {
        let invalid = || Error::InvalidRelease {
            first: range.first,
            len: range.len,
        };

        if range.len == 0 || (range.first as u64) + (range.len as u64) > self.next as u64 {
            return Err(invalid());
        }

        // Insertion point in the sorted free list.
        let pos = self
            .free
            .partition_point(|&(first, _)| first < range.first);

        // Reject double release: overlap with either neighbor.
        if let Some(&(prev_first, prev_len)) = pos.checked_sub(1).and_then(|p| self.free.get(p)) {
            if prev_first + prev_len > range.first {
                return Err(invalid());
            }
        }
        if let Some(&(next_first, _)) = self.free.get(pos) {
            if range.first + range.len > next_first {
                return Err(invalid());
            }
        }

        self.free.insert(pos, (range.first, range.len));
        self.coalesce_around(pos);
        self.reclaim_tail();
        Ok(())
    }

    /// Whether `id` belongs to a currently live allocation.
    pub fn is_live(&self, id: Id) -> bool {
        id.raw() < self.next
            && !self
                .free
                .iter()
                .any(|&(first, len)| id.raw() >= first && id.raw() - first < len)
    }

    /// Total number of currently live ids.
    pub fn live_count(&self) -> u64 {
        let freed: u64 = self.free.iter().map(|&(_, len)| len as u64).sum();
        self.next as u64 - freed
    }

    fn coalesce_around(&mut self, pos: usize) {
        // Merge with successor first so `pos` stays valid.
        if pos + 1 < self.free.len() {
            let (first, len) = self.free[pos];
            let (next_first, next_len) = self.free[pos + 1];
            if first + len == next_first {
                self.free[pos] = (first, len + next_len);
                self.free.remove(pos + 1);
            }
        }
        if pos > 0 {
            let (prev_first, prev_len) = self.free[pos - 1];
            let (first, len) = self.free[pos];
            if prev_first + prev_len == first {
                self.free[pos - 1] = (prev_first, prev_len + len);
                self.free.remove(pos);
            }
        }
    }

    fn reclaim_tail(&mut self) {
        while let Some(&(first, len)) = self.free.last() {
            if first + len == self.next {
                self.free.pop();
                self.next = first;
            } else {
                break;
            }
        }
    }
}
