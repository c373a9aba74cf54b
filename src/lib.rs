//! chainmap-vec: a growable array and a chained-bucket string-keyed hash
//! table, both with an explicit cleanup hook for their elements and an
//! explicit cursor protocol for stepping through them.
//!
//! Internal Design:
//!
//! Summary
//! - Two independent leaf containers; neither uses the other.
//!   - DynArray<T, C>: one contiguous buffer, elements in `[0, len)`,
//!     capacity starts at a hint and doubles when full, never shrinks.
//!   - ChainedTable<V, C>: fixed bucket array, each bucket the head of a
//!     singly linked chain; entries live in a generational slot store and
//!     chains are threaded through the slot keys.
//! - `C: Cleanup<T>` is the per-container cleanup capability. It runs on
//!   an element right before the container overwrites, removes, clears
//!   or drops it, exactly once per occurrence.
//!
//! Constraints
//! - Single-threaded; no internal synchronization. Wrap a container in a
//!   lock if it must be shared.
//! - Zero-sized element/value types are rejected at construction.
//! - Contract violations (bad index, stale cursor) come back as
//!   `ContainerError`, never as a panic or abort.
//! - A failed growth leaves the array exactly as it was.
//!
//! Cursors
//! - `first`/`next` hand out small `Copy` cursors instead of references.
//!   A cursor carries the identity of the container that produced it.
//! - Array cursors also carry a layout epoch, bumped by any operation that
//!   moves elements (insert, push, remove, take, sort, clear).
//! - Table cursors wrap a generational slot key, so removing an entry
//!   invalidates its cursor even if the same key is inserted again.
//! - `next` on a cursor that no longer resolves returns
//!   `ContainerError::InvalidCursor`.
//!
//! Ownership
//! - Values are moved into container-owned storage. `take` moves one back
//!   out and skips cleanup; everything else that discards a value runs
//!   cleanup first.
//! - The cleanup hook sees only `&mut T`, so it cannot reach back into the
//!   container that is invoking it.
//!
//! Hashing
//! - One fixed hash: a wrapping `u64` polynomial over the key bytes
//!   (multiplier 2630849305), reduced modulo the bucket count. Each entry
//!   keeps its full hash so chain walks compare hashes before keys.
//! - The bucket count never changes after construction; there is no
//!   rehash. The default of 1023 buckets is odd to spread the hash.
//!
//! Notes and non-goals
//! - No shrinking, no persistence, no pluggable hashers.
//! - `log` is used for growth and construction tracing; install any
//!   logger to see it.

pub mod chained_table;
mod chained_table_proptest;
pub mod cleanup;
pub mod dyn_array;
mod error;
mod owner;

// Public surface
pub use chained_table::{bucket_index, ChainedTable, TableCursor, DEFAULT_BUCKETS};
pub use cleanup::{Cleanup, NoCleanup};
pub use dyn_array::{ArrayCursor, DynArray, DEFAULT_CAPACITY};
pub use error::ContainerError;
