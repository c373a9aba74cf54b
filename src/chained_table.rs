//! ChainedTable: string-keyed table with a fixed bucket array and chained collisions.

use crate::cleanup::{Cleanup, NoCleanup};
use crate::error::ContainerError;
use crate::owner::OwnerId;
use core::fmt;
use slotmap::{DefaultKey, SlotMap};

/// Bucket count used when a zero hint is given. Odd, to spread the
/// multiplicative hash below.
pub const DEFAULT_BUCKETS: usize = 1023;

const MULTIPLIER: u64 = 2_630_849_305;

fn hash_key(key: &str) -> u64 {
    key.bytes()
        .fold(0u64, |h, b| h.wrapping_mul(MULTIPLIER).wrapping_add(u64::from(b)))
}

/// Bucket that `key` lands in for a table with `bucket_count` buckets.
///
/// Polynomial rolling hash over the key's bytes with a wrapping `u64`
/// accumulator, reduced modulo the bucket count. A `bucket_count` of 0
/// is treated as 1.
pub fn bucket_index(key: &str, bucket_count: usize) -> usize {
    (hash_key(key) % bucket_count.max(1) as u64) as usize
}

/// Opaque position of a live entry, as returned by `put`, `first` and `next`.
///
/// Cursors are generational: once the entry is removed the cursor stops
/// resolving, even if the key is inserted again.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableCursor {
    owner: OwnerId,
    entry: DefaultKey,
}

impl TableCursor {
    pub fn key<'a, V, C>(&self, table: &'a ChainedTable<V, C>) -> Option<&'a str>
    where
        C: Cleanup<V>,
    {
        table.resolve(*self).map(|e| &*e.key)
    }

    pub fn value<'a, V, C>(&self, table: &'a ChainedTable<V, C>) -> Option<&'a V>
    where
        C: Cleanup<V>,
    {
        table.resolve(*self).map(|e| &e.value)
    }

    pub fn value_mut<'a, V, C>(&self, table: &'a mut ChainedTable<V, C>) -> Option<&'a mut V>
    where
        C: Cleanup<V>,
    {
        if self.owner != table.owner {
            return None;
        }
        table.slots.get_mut(self.entry).map(|e| &mut e.value)
    }
}

#[derive(Debug)]
struct Entry<V> {
    next: Option<DefaultKey>,
    hash: u64,
    key: Box<str>,
    value: V,
}

/// Hash table from string keys to `V`.
///
/// The bucket count is fixed at construction. Each bucket heads a singly
/// linked chain threaded through the entry store; a new key always
/// becomes the head of its chain.
pub struct ChainedTable<V, C: Cleanup<V> = NoCleanup> {
    buckets: Vec<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Entry<V>>, // entry storage, chains link by key
    cleanup: C,
    owner: OwnerId,
}

impl<V> ChainedTable<V> {
    pub fn new() -> Result<Self, ContainerError> {
        Self::with_buckets(0)
    }

    pub fn with_buckets(bucket_hint: usize) -> Result<Self, ContainerError> {
        Self::with_cleanup(bucket_hint, NoCleanup)
    }
}

/// Iterator over `(key, value)` pairs in bucket order, each chain head to tail.
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Option<DefaultKey>>,
    slots: &'a SlotMap<DefaultKey, Entry<V>>,
    chain: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.chain {
                let e = self.slots.get(k)?;
                self.chain = e.next;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((&*e.key, &e.value));
            }
            self.chain = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, C: Cleanup<V>> ChainedTable<V, C> {
    /// Create a table whose values are passed to `cleanup` before they are
    /// overwritten, removed, cleared or dropped with the table.
    pub fn with_cleanup(bucket_hint: usize, cleanup: C) -> Result<Self, ContainerError> {
        if core::mem::size_of::<V>() == 0 {
            return Err(ContainerError::InvalidElementSize);
        }
        let bucket_count = if bucket_hint == 0 {
            DEFAULT_BUCKETS
        } else {
            bucket_hint
        };
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|_| ContainerError::AllocationFailed {
                requested: bucket_count,
            })?;
        buckets.resize(bucket_count, None);
        log::trace!("chained_table: created with {bucket_count} buckets");
        Ok(Self {
            buckets,
            slots: SlotMap::with_key(),
            cleanup,
            owner: OwnerId::fresh(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries chained in `bucket`, or `None` if there is no such bucket.
    pub fn chain_len(&self, bucket: usize) -> Option<usize> {
        let mut cur = *self.buckets.get(bucket)?;
        let mut n = 0;
        while let Some(k) = cur {
            n += 1;
            cur = self.slots.get(k)?.next;
        }
        Some(n)
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn find_entry(&self, key: &str, hash: u64) -> Option<DefaultKey> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(k) = cur {
            let e = self.slots.get(k)?;
            if e.hash == hash && &*e.key == key {
                return Some(k);
            }
            cur = e.next;
        }
        None
    }

    /// Associate `value` with `key`.
    ///
    /// An existing entry keeps its identity: the old value goes through
    /// cleanup and is overwritten in place. A new key becomes the head of
    /// its bucket's chain.
    pub fn put(&mut self, key: &str, value: V) -> TableCursor {
        let hash = hash_key(key);
        if let Some(k) = self.find_entry(key, hash) {
            if let Some(e) = self.slots.get_mut(k) {
                self.cleanup.cleanup(&mut e.value);
                e.value = value;
            }
            return self.cursor(k);
        }

        let bucket = self.bucket_of(hash);
        let entry = Entry {
            next: self.buckets[bucket],
            hash,
            key: key.into(),
            value,
        };
        let k = self.slots.insert(entry);
        self.buckets[bucket] = Some(k);
        self.cursor(k)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let k = self.find_entry(key, hash_key(key))?;
        self.slots.get(k).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let k = self.find_entry(key, hash_key(key))?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_entry(key, hash_key(key)).is_some()
    }

    /// Cursor for the entry holding `key`, if present.
    pub fn find(&self, key: &str) -> Option<TableCursor> {
        self.find_entry(key, hash_key(key)).map(|k| self.cursor(k))
    }

    // Detach the entry for `key` from its chain and the store.
    fn unlink(&mut self, key: &str) -> Option<Entry<V>> {
        let hash = hash_key(key);
        let bucket = self.bucket_of(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let e = self.slots.get(k)?;
            let next = e.next;
            if e.hash == hash && &*e.key == key {
                match prev {
                    Some(p) => {
                        if let Some(pe) = self.slots.get_mut(p) {
                            pe.next = next;
                        }
                    }
                    None => self.buckets[bucket] = next,
                }
                return self.slots.remove(k);
            }
            prev = cur;
            cur = next;
        }
        None
    }

    /// Remove `key`, running cleanup on its value. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.unlink(key) {
            Some(mut entry) => {
                self.cleanup.cleanup(&mut entry.value);
                true
            }
            None => false,
        }
    }

    /// Remove `key` and hand its value to the caller without cleanup.
    pub fn take(&mut self, key: &str) -> Option<V> {
        self.unlink(key).map(|e| e.value)
    }

    /// Clean up and drop every entry. The bucket count is kept.
    pub fn clear(&mut self) {
        self.release_all();
        self.slots.clear();
        for head in self.buckets.iter_mut() {
            *head = None;
        }
    }

    /// Cursor to the head of the lowest-numbered non-empty bucket.
    pub fn first(&self) -> Option<TableCursor> {
        if self.slots.is_empty() {
            return None;
        }
        self.head_from(0)
    }

    /// Cursor to the entry after `cursor`: its chain successor, else the
    /// head of the next non-empty bucket. `None` once every entry has been
    /// visited.
    pub fn next(&self, cursor: TableCursor) -> Result<Option<TableCursor>, ContainerError> {
        let entry = self.resolve(cursor).ok_or(ContainerError::InvalidCursor)?;
        if let Some(n) = entry.next {
            return Ok(Some(self.cursor(n)));
        }
        Ok(self.head_from(self.bucket_of(entry.hash) + 1))
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            slots: &self.slots,
            chain: None,
            remaining: self.slots.len(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Mutable access to every value, in storage order rather than chain order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.slots.values_mut().map(|e| &mut e.value)
    }

    fn head_from(&self, start: usize) -> Option<TableCursor> {
        self.buckets
            .get(start..)?
            .iter()
            .find_map(|head| *head)
            .map(|k| self.cursor(k))
    }

    fn resolve(&self, cursor: TableCursor) -> Option<&Entry<V>> {
        if cursor.owner != self.owner {
            return None;
        }
        self.slots.get(cursor.entry)
    }

    fn cursor(&self, entry: DefaultKey) -> TableCursor {
        TableCursor {
            owner: self.owner,
            entry,
        }
    }

    fn release_all(&mut self) {
        for bucket in 0..self.buckets.len() {
            let mut cur = self.buckets[bucket];
            while let Some(k) = cur {
                match self.slots.get_mut(k) {
                    Some(e) => {
                        self.cleanup.cleanup(&mut e.value);
                        cur = e.next;
                    }
                    None => break,
                }
            }
        }
    }
}

impl<V, C: Cleanup<V>> Drop for ChainedTable<V, C> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<'a, V, C: Cleanup<V>> IntoIterator for &'a ChainedTable<V, C> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: fmt::Debug, C: Cleanup<V>> fmt::Debug for ChainedTable<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
