//! The bump arena.
//!
//! Sizes are rounded up to [`ALIGNMENT`] before every capacity check, and an
//! allocation is refused when it would make `used` reach `capacity`: the
//! arena never hands out its final byte.

use std::fmt;
use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::config::Placement;
use crate::error::ArenaError;
use crate::handle::{Allocation, ArenaId};

/// Allocation granularity in bytes.
pub const ALIGNMENT: usize = 4;

fn align_up(size: usize) -> Option<usize> {
    Some(size.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1))
}

/// A fixed-capacity bump allocator with rollback.
///
/// # Example
///
/// ```
/// use plume_arena::{Arena, Placement};
///
/// let mut arena = Arena::open(64, Placement::Any).unwrap();
/// let a = arena.allocate(10, true).unwrap();
/// assert_eq!(a.len(), 12);
/// arena.bytes_mut(a).unwrap()[0] = 7;
///
/// arena.rollback();
/// assert_eq!(arena.space(), arena.size());
/// assert!(arena.bytes(a).is_err());
/// ```
pub struct Arena {
    id: ArenaId,
    /// Backing region, reserved in full at open.
    data: Vec<u8>,
    /// Bump cursor in bytes.
    used: usize,
    /// Bumped on every rollback.
    generation: u32,
    placement: Placement,
}

impl Arena {
    /// Reserve a region of `capacity` bytes (rounded up to [`ALIGNMENT`]).
    pub fn open(capacity: usize, placement: Placement) -> Result<Self, ArenaError> {
        let rounded = match align_up(capacity) {
            Some(c) if c <= u32::MAX as usize => c,
            _ => {
                warn!(capacity, %placement, "arena capacity not representable");
                return Err(ArenaError::AllocationFailure {
                    requested: capacity,
                });
            }
        };

        let mut data = Vec::new();
        if data.try_reserve_exact(rounded).is_err() {
            warn!(capacity = rounded, %placement, "cannot reserve arena region");
            return Err(ArenaError::AllocationFailure { requested: rounded });
        }
        data.resize(rounded, 0);

        let id = ArenaId::next();
        debug!(arena = %id, capacity = rounded, %placement, "arena opened");
        Ok(Self {
            id,
            data,
            used: 0,
            generation: 0,
            placement,
        })
    }

    /// Process-unique identity of this arena.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Total capacity in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes handed out since the last rollback.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Remaining bytes (`size - used`).
    pub fn space(&self) -> usize {
        self.data.len() - self.used
    }

    /// Current generation. Handles from earlier generations are stale.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Placement hint given at open.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Bump-allocate `size` bytes, rounded up to [`ALIGNMENT`].
    ///
    /// Fails with [`ArenaError::OutOfSpace`] when `used + size` would reach
    /// or exceed the capacity; `used` is left unchanged on failure. The
    /// returned bytes are zeroed only when `zero_fill` is set.
    pub fn allocate(&mut self, size: usize, zero_fill: bool) -> Result<Allocation, ArenaError> {
        let capacity = self.data.len();
        let fit = align_up(size).and_then(|rounded| {
            let end = self.used.checked_add(rounded)?;
            (end < capacity).then_some((rounded, end))
        });
        let Some((rounded, end)) = fit else {
            warn!(
                arena = %self.id,
                requested = size,
                used = self.used,
                capacity,
                "arena allocation too large"
            );
            return Err(ArenaError::OutOfSpace {
                requested: align_up(size).unwrap_or(size),
                used: self.used,
                capacity,
            });
        };

        let offset = self.used;
        self.used = end;
        if zero_fill {
            self.data[offset..end].fill(0);
        }

        Ok(Allocation {
            arena: self.id,
            generation: self.generation,
            offset: offset as u32,
            len: rounded as u32,
        })
    }

    /// Give back `alloc` if it is the most recent allocation.
    ///
    /// This undoes a single bump so a failed multi-step load leaves `used`
    /// where it was. Returns `false` (and changes nothing) when `alloc` is
    /// not live or something was allocated after it.
    pub fn release_last(&mut self, alloc: Allocation) -> bool {
        let Ok(range) = self.range(&alloc) else {
            return false;
        };
        if range.end != self.used {
            return false;
        }
        self.used = range.start;
        trace!(arena = %self.id, used = self.used, "last allocation released");
        true
    }

    /// Reset `used` to zero without releasing the region.
    ///
    /// Every handle handed out before the call becomes stale.
    pub fn rollback(&mut self) {
        trace!(arena = %self.id, used = self.used, generation = self.generation, "arena rollback");
        self.used = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Whether `alloc` was made by this arena in its current generation.
    pub fn is_live(&self, alloc: &Allocation) -> bool {
        self.range(alloc).is_ok()
    }

    /// Read the bytes behind a handle.
    pub fn bytes(&self, alloc: Allocation) -> Result<&[u8], ArenaError> {
        let range = self.range(&alloc)?;
        Ok(&self.data[range])
    }

    /// Write access to the bytes behind a handle.
    pub fn bytes_mut(&mut self, alloc: Allocation) -> Result<&mut [u8], ArenaError> {
        let range = self.range(&alloc)?;
        Ok(&mut self.data[range])
    }

    fn range(&self, alloc: &Allocation) -> Result<Range<usize>, ArenaError> {
        if alloc.arena != self.id {
            return Err(ArenaError::ForeignHandle {
                handle_arena: alloc.arena,
                arena: self.id,
            });
        }
        if alloc.generation != self.generation {
            return Err(ArenaError::StaleHandle {
                handle_generation: alloc.generation,
                current: self.generation,
            });
        }
        let start = alloc.offset as usize;
        let end = start + alloc.len as usize;
        // Beyond the cursor only after `release_last` gave the range back.
        if end > self.used {
            return Err(ArenaError::StaleHandle {
                handle_generation: alloc.generation,
                current: self.generation,
            });
        }
        Ok(start..end)
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("size", &self.data.len())
            .field("used", &self.used)
            .field("generation", &self.generation)
            .field("placement", &self.placement)
            .finish()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        trace!(arena = %self.id, "arena released");
    }
}

/// Release an arena's backing region.
///
/// Passing `None` is reported and returns [`ArenaError::NullArena`].
pub fn close(arena: Option<Arena>) -> Result<(), ArenaError> {
    match arena {
        Some(arena) => {
            debug!(arena = %arena.id, capacity = arena.size(), "arena closed");
            drop(arena);
            Ok(())
        }
        None => {
            warn!("cannot close arena: none given");
            Err(ArenaError::NullArena)
        }
    }
}

/// Remaining bytes, or `0` when no arena is given.
pub fn space_of(arena: Option<&Arena>) -> usize {
    arena.map_or(0, Arena::space)
}

/// Capacity in bytes, or `0` when no arena is given.
pub fn capacity_of(arena: Option<&Arena>) -> usize {
    arena.map_or(0, Arena::size)
}
