//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use crate::handle::ArenaId;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The backing region could not be reserved.
    AllocationFailure {
        /// Number of bytes requested for the backing region.
        requested: usize,
    },
    /// The allocation would reach or exceed the arena's capacity.
    OutOfSpace {
        /// Rounded size of the rejected allocation, in bytes.
        requested: usize,
        /// Bytes already in use.
        used: usize,
        /// Total capacity in bytes.
        capacity: usize,
    },
    /// An [`Allocation`](crate::Allocation) from a generation that has been
    /// rolled back.
    StaleHandle {
        /// The generation encoded in the handle.
        handle_generation: u32,
        /// The arena's current generation.
        current: u32,
    },
    /// An [`Allocation`](crate::Allocation) made by a different arena.
    ForeignHandle {
        /// Arena recorded in the handle.
        handle_arena: ArenaId,
        /// Arena the handle was resolved against.
        arena: ArenaId,
    },
    /// An operation was given no arena.
    NullArena,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailure { requested } => {
                write!(f, "cannot reserve {requested} bytes for arena")
            }
            Self::OutOfSpace {
                requested,
                used,
                capacity,
            } => {
                write!(
                    f,
                    "arena out of space: requested {requested} bytes, used {used} of {capacity}"
                )
            }
            Self::StaleHandle {
                handle_generation,
                current,
            } => {
                write!(
                    f,
                    "stale handle: generation {handle_generation}, arena at {current}"
                )
            }
            Self::ForeignHandle {
                handle_arena,
                arena,
            } => {
                write!(f, "handle from arena {handle_arena} resolved against arena {arena}")
            }
            Self::NullArena => write!(f, "no arena given"),
        }
    }
}

impl Error for ArenaError {}
