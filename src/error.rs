//! Error type shared by both containers.

use std::error::Error;
use std::fmt;

/// Errors surfaced by `DynArray` and `ChainedTable` operations.
///
/// Absent keys and search misses are not errors; those are reported as
/// `None`/`false` by the respective operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerError {
    /// The element or value type is zero-sized.
    InvalidElementSize,
    /// An index (or search start) is outside the valid range.
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// Number of live elements at the time of the call.
        len: usize,
    },
    /// A cursor does not refer to a live position of this container.
    InvalidCursor,
    /// Storage for `requested` slots could not be reserved.
    AllocationFailed {
        /// Slot count that was asked for.
        requested: usize,
    },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidElementSize => write!(f, "element size must be greater than zero"),
            Self::InvalidIndex { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::InvalidCursor => write!(f, "cursor does not refer to a live position"),
            Self::AllocationFailed { requested } => {
                write!(f, "allocation failed: could not reserve {requested} slots")
            }
        }
    }
}

impl Error for ContainerError {}
