//! Arena configuration parameters.

use std::fmt;

use plume_core::ConfigError;

use crate::set::ArenaScope;

/// Memory placement hint for an arena's backing region.
///
/// Hosted targets have a single memory pool, so the hint is recorded and
/// reported but does not change where the region comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Placement {
    /// No preference.
    #[default]
    Any,
    /// Memory reachable by the display hardware.
    Chip,
    /// CPU-only memory.
    Fast,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Chip => write!(f, "chip"),
            Self::Fast => write!(f, "fast"),
        }
    }
}

/// Capacities for the three long-lived scoped arenas.
///
/// All values are immutable after [`ArenaSet::open`](crate::ArenaSet::open).
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Game-scoped arena capacity in bytes. Default: 256 KiB.
    pub game_capacity: usize,
    /// Chapter-scoped arena capacity in bytes. Default: 1 MiB.
    pub chapter_capacity: usize,
    /// Room-scoped arena capacity in bytes. Default: 2 MiB.
    pub room_capacity: usize,
    /// Placement hint applied to all three arenas.
    pub placement: Placement,
}

impl ArenaConfig {
    /// Default game arena capacity.
    pub const DEFAULT_GAME_CAPACITY: usize = 256 * 1024;

    /// Default chapter arena capacity.
    pub const DEFAULT_CHAPTER_CAPACITY: usize = 1024 * 1024;

    /// Default room arena capacity.
    pub const DEFAULT_ROOM_CAPACITY: usize = 2 * 1024 * 1024;

    /// Capacity configured for `scope`.
    pub fn capacity(&self, scope: ArenaScope) -> usize {
        match scope {
            ArenaScope::Game => self.game_capacity,
            ArenaScope::Chapter => self.chapter_capacity,
            ArenaScope::Room => self.room_capacity,
        }
    }

    /// Check that every scope has a non-zero capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for scope in ArenaScope::ALL {
            if self.capacity(scope) == 0 {
                return Err(ConfigError::ZeroCapacity {
                    scope: scope.name(),
                });
            }
        }
        Ok(())
    }

    /// Sum of all three capacities.
    pub fn total_bytes(&self) -> usize {
        self.game_capacity
            .saturating_add(self.chapter_capacity)
            .saturating_add(self.room_capacity)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            game_capacity: Self::DEFAULT_GAME_CAPACITY,
            chapter_capacity: Self::DEFAULT_CHAPTER_CAPACITY,
            room_capacity: Self::DEFAULT_ROOM_CAPACITY,
            placement: Placement::Any,
        }
    }
}
