//! Allocation handles and arena identity.
//!
//! An [`Allocation`] names a byte range inside one arena at one generation.
//! It never exposes a pointer: bytes are reached through
//! [`Arena::bytes`](crate::Arena::bytes), which validates the handle first.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for unique [`ArenaId`] allocation.
static ARENA_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Unique per-instance identifier for an [`Arena`](crate::Arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u32);

impl ArenaId {
    /// Allocate a fresh, process-unique arena id.
    pub(crate) fn next() -> Self {
        Self(ARENA_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A byte range handed out by an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub(crate) arena: ArenaId,
    pub(crate) generation: u32,
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

impl Allocation {
    /// The arena this range belongs to.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The arena generation when this range was handed out.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Byte offset from the start of the arena region.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Length in bytes (a multiple of four).
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Narrow to the sub-range `[start, start + len)` of this allocation.
    ///
    /// Returns `None` when the sub-range does not fit.
    pub fn slice(&self, start: u32, len: u32) -> Option<Self> {
        let end = start.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(Self {
            offset: self.offset + start,
            len,
            ..*self
        })
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation(arena={}, gen={}, off={}, len={})",
            self.arena, self.generation, self.offset, self.len
        )
    }
}
