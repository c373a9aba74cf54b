//! Process-unique container identities.
//!
//! Every container takes a fresh `OwnerId` at construction and stamps it
//! into the cursors it hands out, so a cursor presented to a different
//! container is rejected instead of resolving to an unrelated slot.

use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct OwnerId(u64);

impl OwnerId {
    pub(crate) fn fresh() -> Self {
        OwnerId(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }
}
