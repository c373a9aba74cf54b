//! DynArray: contiguous growable array with a cleanup hook and cursor iteration.

use crate::cleanup::{Cleanup, NoCleanup};
use crate::error::ContainerError;
use crate::owner::OwnerId;
use core::cmp::Ordering;
use core::fmt;

/// Capacity used when a zero capacity hint is given.
pub const DEFAULT_CAPACITY: usize = 16;

/// Position of a live element, as handed out by `first`/`next`.
///
/// A cursor is tied to the array that produced it and to the array's
/// layout at that moment: any insert, push, remove, take, sort or clear
/// invalidates it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ArrayCursor {
    owner: OwnerId,
    epoch: u64,
    index: usize,
}

impl ArrayCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value<'a, T, C>(&self, array: &'a DynArray<T, C>) -> Option<&'a T>
    where
        C: Cleanup<T>,
    {
        array.resolve(*self).ok()
    }
}

/// Growable array of `T`. Live elements always occupy `[0, len)` in order.
///
/// Capacity starts at the hint (or `DEFAULT_CAPACITY`) and doubles when
/// an insert finds the buffer full. It never shrinks.
pub struct DynArray<T, C: Cleanup<T> = NoCleanup> {
    buf: Vec<T>,
    capacity: usize,
    cleanup: C,
    owner: OwnerId,
    epoch: u64,
}

impl<T> DynArray<T> {
    pub fn new() -> Result<Self, ContainerError> {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity_hint: usize) -> Result<Self, ContainerError> {
        Self::with_cleanup(capacity_hint, NoCleanup)
    }
}

impl<T, C: Cleanup<T>> DynArray<T, C> {
    /// Create an array whose elements are passed to `cleanup` before they
    /// are overwritten, removed, cleared or dropped with the array.
    ///
    /// Fails with `InvalidElementSize` for zero-sized `T` and with
    /// `AllocationFailed` if the initial buffer cannot be reserved.
    pub fn with_cleanup(capacity_hint: usize, cleanup: C) -> Result<Self, ContainerError> {
        if core::mem::size_of::<T>() == 0 {
            return Err(ContainerError::InvalidElementSize);
        }
        let capacity = if capacity_hint == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity_hint
        };
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| ContainerError::AllocationFailed {
                requested: capacity,
            })?;
        Ok(Self {
            buf,
            capacity,
            cleanup,
            owner: OwnerId::fresh(),
            epoch: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.buf.iter()
    }

    pub fn get(&self, index: usize) -> Result<&T, ContainerError> {
        let len = self.buf.len();
        self.buf
            .get(index)
            .ok_or(ContainerError::InvalidIndex { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, ContainerError> {
        let len = self.buf.len();
        self.buf
            .get_mut(index)
            .ok_or(ContainerError::InvalidIndex { index, len })
    }

    /// Insert `value` at `index`, shifting `[index, len)` one slot right.
    /// `index == len` appends.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), ContainerError> {
        let len = self.buf.len();
        if index > len {
            return Err(ContainerError::InvalidIndex { index, len });
        }
        self.reserve_one()?;
        self.buf.insert(index, value);
        self.bump_epoch();
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<(), ContainerError> {
        self.reserve_one()?;
        self.buf.push(value);
        self.bump_epoch();
        Ok(())
    }

    /// Overwrite the element at `index`. The old element goes through
    /// cleanup first; `len` is unchanged.
    pub fn replace(&mut self, index: usize, value: T) -> Result<(), ContainerError> {
        let len = self.buf.len();
        let slot = self
            .buf
            .get_mut(index)
            .ok_or(ContainerError::InvalidIndex { index, len })?;
        self.cleanup.cleanup(slot);
        *slot = value;
        Ok(())
    }

    /// Run cleanup on the element at `index`, then close the gap.
    pub fn remove(&mut self, index: usize) -> Result<(), ContainerError> {
        let len = self.buf.len();
        let slot = self
            .buf
            .get_mut(index)
            .ok_or(ContainerError::InvalidIndex { index, len })?;
        self.cleanup.cleanup(slot);
        self.buf.remove(index);
        self.bump_epoch();
        Ok(())
    }

    /// Move the element at `index` out to the caller. Cleanup does not run:
    /// whatever the element owns now belongs to the caller.
    pub fn take(&mut self, index: usize) -> Result<T, ContainerError> {
        let len = self.buf.len();
        if index >= len {
            return Err(ContainerError::InvalidIndex { index, len });
        }
        let value = self.buf.remove(index);
        self.bump_epoch();
        Ok(value)
    }

    /// Clean up and drop every element in index order. Capacity is kept.
    pub fn clear(&mut self) {
        self.release_all();
        self.buf.clear();
        self.bump_epoch();
    }

    /// Find an element comparing equal to `key` within `[start, len)`.
    ///
    /// With `sorted`, binary search is used and the caller guarantees the
    /// elements are ordered under `cmp`; which of several equal elements
    /// is reported is then unspecified. Otherwise the lowest matching
    /// index is returned. `cmp(key, elem)` follows the usual 3-way
    /// contract.
    pub fn search_by<K, F>(
        &self,
        key: &K,
        mut cmp: F,
        start: usize,
        sorted: bool,
    ) -> Result<Option<usize>, ContainerError>
    where
        K: ?Sized,
        F: FnMut(&K, &T) -> Ordering,
    {
        let len = self.buf.len();
        if start > len {
            return Err(ContainerError::InvalidIndex { index: start, len });
        }
        let region = &self.buf[start..];
        let found = if sorted {
            region
                .binary_search_by(|elem| cmp(key, elem).reverse())
                .ok()
        } else {
            region
                .iter()
                .position(|elem| cmp(key, elem) == Ordering::Equal)
        };
        Ok(found.map(|i| i + start))
    }

    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.buf.sort_unstable_by(cmp);
        self.bump_epoch();
    }

    pub fn first(&self) -> Option<ArrayCursor> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.cursor_at(0))
        }
    }

    /// Cursor to the element after `cursor`, or `None` past the end.
    pub fn next(&self, cursor: ArrayCursor) -> Result<Option<ArrayCursor>, ContainerError> {
        self.resolve(cursor)?;
        let index = cursor.index + 1;
        if index < self.buf.len() {
            Ok(Some(self.cursor_at(index)))
        } else {
            Ok(None)
        }
    }

    fn resolve(&self, cursor: ArrayCursor) -> Result<&T, ContainerError> {
        if cursor.owner != self.owner || cursor.epoch != self.epoch {
            return Err(ContainerError::InvalidCursor);
        }
        self.buf
            .get(cursor.index)
            .ok_or(ContainerError::InvalidCursor)
    }

    fn cursor_at(&self, index: usize) -> ArrayCursor {
        ArrayCursor {
            owner: self.owner,
            epoch: self.epoch,
            index,
        }
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn reserve_one(&mut self) -> Result<(), ContainerError> {
        if self.buf.len() < self.capacity {
            return Ok(());
        }
        let old = self.capacity;
        let new = old
            .checked_mul(2)
            .ok_or(ContainerError::AllocationFailed {
                requested: usize::MAX,
            })?;
        // try_reserve_exact leaves the buffer untouched on failure.
        if let Err(e) = self.buf.try_reserve_exact(new - self.buf.len()) {
            log::debug!("dyn_array: growth {old} -> {new} failed: {e}");
            return Err(ContainerError::AllocationFailed { requested: new });
        }
        log::trace!("dyn_array: grew capacity {old} -> {new}");
        self.capacity = new;
        Ok(())
    }

    fn release_all(&mut self) {
        for value in self.buf.iter_mut() {
            self.cleanup.cleanup(value);
        }
    }
}

impl<T: Ord, C: Cleanup<T>> DynArray<T, C> {
    pub fn search(
        &self,
        key: &T,
        start: usize,
        sorted: bool,
    ) -> Result<Option<usize>, ContainerError> {
        self.search_by(key, |k, e| k.cmp(e), start, sorted)
    }

    pub fn sort(&mut self) {
        self.sort_by(|a, b| a.cmp(b))
    }
}

impl<T, C: Cleanup<T>> Drop for DynArray<T, C> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<'a, T, C: Cleanup<T>> IntoIterator for &'a DynArray<T, C> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, C: Cleanup<T>> fmt::Debug for DynArray<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynArray")
            .field("len", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("elements", &self.buf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn from_slice(xs: &[i32]) -> DynArray<i32> {
        let mut a = DynArray::with_capacity(xs.len()).unwrap();
        for &x in xs {
            a.push(x).unwrap();
        }
        a
    }

    /// Invariant: a zero hint picks the default capacity; a non-zero hint is used as is.
    #[test]
    fn capacity_hint_and_default() {
        let a: DynArray<u32> = DynArray::new().unwrap();
        assert_eq!(a.capacity(), DEFAULT_CAPACITY);
        assert!(a.is_empty());
        let b: DynArray<u32> = DynArray::with_capacity(3).unwrap();
        assert_eq!(b.capacity(), 3);
    }

    /// Invariant: zero-sized element types are rejected at construction.
    #[test]
    fn zero_sized_elements_rejected() {
        match DynArray::<()>::new() {
            Err(ContainerError::InvalidElementSize) => {}
            other => panic!("unexpected result: {:?}", other.map(|a| a.len())),
        }
    }

    /// Invariant: an impossible initial reservation is an error, not an abort.
    #[test]
    fn oversized_hint_fails_allocation() {
        match DynArray::<u64>::with_capacity(usize::MAX) {
            Err(ContainerError::AllocationFailed { requested }) => {
                assert_eq!(requested, usize::MAX)
            }
            other => panic!("unexpected result: {:?}", other.map(|a| a.len())),
        }
    }

    /// Invariant: capacity doubles exactly when a push finds the buffer full.
    #[test]
    fn growth_doubles_from_hint() {
        let mut a: DynArray<u8> = DynArray::with_capacity(2).unwrap();
        let mut seen = vec![a.capacity()];
        for i in 0..9u8 {
            a.push(i).unwrap();
            if *seen.last().unwrap() != a.capacity() {
                seen.push(a.capacity());
            }
        }
        assert_eq!(seen, vec![2, 4, 8, 16]);
        assert_eq!(a.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    /// Invariant: insert shifts the tail right and keeps its order.
    #[test]
    fn insert_shifts_tail() {
        let mut a = from_slice(&[10, 20]);
        a.insert(1, 15).unwrap();
        assert_eq!(a.as_slice(), &[10, 15, 20]);
        a.insert(0, 5).unwrap();
        a.insert(4, 25).unwrap();
        assert_eq!(a.as_slice(), &[5, 10, 15, 20, 25]);
    }

    /// Invariant: out-of-range indices are reported with the current length
    /// and leave the array untouched.
    #[test]
    fn out_of_range_indices() {
        let mut a = from_slice(&[1, 2, 3]);
        assert_eq!(
            a.insert(4, 9),
            Err(ContainerError::InvalidIndex { index: 4, len: 3 })
        );
        assert_eq!(
            a.get(3).err(),
            Some(ContainerError::InvalidIndex { index: 3, len: 3 })
        );
        assert!(a.replace(3, 0).is_err());
        assert!(a.remove(3).is_err());
        assert!(a.take(3).is_err());
        assert_eq!(a.as_slice(), &[1, 2, 3]);
    }

    /// Invariant: remove closes the gap; re-inserting at the same index restores the sequence.
    #[test]
    fn remove_then_reinsert_round_trip() {
        let mut a = from_slice(&[1, 2, 3, 4]);
        let v = *a.get(1).unwrap();
        a.remove(1).unwrap();
        assert_eq!(a.as_slice(), &[1, 3, 4]);
        a.insert(1, v).unwrap();
        assert_eq!(a.as_slice(), &[1, 2, 3, 4]);
    }

    /// Invariant: replace and remove run cleanup once on the displaced element;
    /// take and reads never do.
    #[test]
    fn cleanup_runs_on_displaced_elements_only() {
        let log = RefCell::new(Vec::new());
        {
            let mut a = DynArray::with_cleanup(0, |v: &mut i32| log.borrow_mut().push(*v)).unwrap();
            for x in [1, 2, 3, 4] {
                a.push(x).unwrap();
            }
            let _ = a.get(0).unwrap();
            a.replace(0, 10).unwrap();
            a.remove(1).unwrap();
            assert_eq!(a.take(0).unwrap(), 10);
            assert_eq!(*log.borrow(), vec![1, 2]);
        }
        // Drop cleans up the survivors in index order.
        assert_eq!(*log.borrow(), vec![1, 2, 3, 4]);
    }

    /// Invariant: clear cleans up everything, keeps capacity, and the array stays usable.
    #[test]
    fn clear_keeps_capacity() {
        let count = RefCell::new(0);
        let mut a =
            DynArray::with_cleanup(2, |_: &mut u16| *count.borrow_mut() += 1).unwrap();
        for x in 0..5 {
            a.push(x).unwrap();
        }
        let cap = a.capacity();
        a.clear();
        assert_eq!(*count.borrow(), 5);
        assert!(a.is_empty());
        assert_eq!(a.capacity(), cap);
        a.push(7).unwrap();
        assert_eq!(a.as_slice(), &[7]);
    }

    /// Invariant: unsorted search reports the lowest match at or after `start`.
    #[test]
    fn linear_search_respects_start() {
        let a = from_slice(&[4, 7, 4, 9]);
        assert_eq!(a.search(&4, 0, false), Ok(Some(0)));
        assert_eq!(a.search(&4, 1, false), Ok(Some(2)));
        assert_eq!(a.search(&4, 3, false), Ok(None));
        assert_eq!(a.search(&5, 0, false), Ok(None));
        assert_eq!(a.search(&4, 4, false), Ok(None));
        assert_eq!(
            a.search(&4, 5, false),
            Err(ContainerError::InvalidIndex { index: 5, len: 4 })
        );
    }

    /// Invariant: sorted search finds present keys and reports absent ones.
    #[test]
    fn binary_search_after_sort() {
        let mut a = from_slice(&[9, 1, 7, 3, 5]);
        a.sort();
        assert_eq!(a.as_slice(), &[1, 3, 5, 7, 9]);
        for (i, x) in [1, 3, 5, 7, 9].iter().enumerate() {
            assert_eq!(a.search(x, 0, true), Ok(Some(i)));
        }
        assert_eq!(a.search(&4, 0, true), Ok(None));
        assert_eq!(a.search(&3, 2, true), Ok(None));
        assert_eq!(a.search(&7, 2, true), Ok(Some(3)));
    }

    /// Invariant: `search_by` may compare against a different key type.
    #[test]
    fn search_by_projected_key() {
        let mut a: DynArray<(u32, &str)> = DynArray::new().unwrap();
        a.push((3, "c")).unwrap();
        a.push((1, "a")).unwrap();
        a.push((2, "b")).unwrap();
        a.sort_by(|x, y| x.0.cmp(&y.0));
        let idx = a.search_by(&2u32, |k, e| k.cmp(&e.0), 0, true).unwrap();
        assert_eq!(idx, Some(1));
        assert_eq!(a.get(1).unwrap().1, "b");
    }

    /// Invariant: first/next visit every element once, in index order.
    #[test]
    fn cursor_walk_visits_in_order() {
        let a = from_slice(&[3, 1, 4, 1, 5]);
        let mut out = Vec::new();
        let mut cur = a.first();
        while let Some(c) = cur {
            out.push(*c.value(&a).unwrap());
            cur = a.next(c).unwrap();
        }
        assert_eq!(out, vec![3, 1, 4, 1, 5]);

        let empty: DynArray<i32> = DynArray::new().unwrap();
        assert!(empty.first().is_none());
    }

    /// Invariant: a cursor is rejected after a layout change or by another array.
    #[test]
    fn stale_and_foreign_cursors_rejected() {
        let mut a = from_slice(&[1, 2, 3]);
        let b = from_slice(&[1, 2, 3]);
        let c = a.first().unwrap();
        assert_eq!(b.next(c), Err(ContainerError::InvalidCursor));
        assert!(c.value(&b).is_none());

        // replace keeps positions, so the cursor survives it.
        a.replace(0, 7).unwrap();
        assert_eq!(c.value(&a), Some(&7));

        a.push(4).unwrap();
        assert_eq!(a.next(c), Err(ContainerError::InvalidCursor));
        assert!(c.value(&a).is_none());
    }
}
