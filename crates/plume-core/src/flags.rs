//! Capability / architecture bit flags carried by every content chunk.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitmask of the target variants a chunk payload is valid for.
///
/// A request matches a chunk when the two masks intersect, see
/// [`ArchFlags::intersects`]. [`ArchFlags::ANY`] matches every chunk that
/// carries at least one architecture bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArchFlags(pub u16);

impl ArchFlags {
    /// No bits set. Never matches.
    pub const NONE: Self = Self(0);
    /// Original chipset.
    pub const ECS: Self = Self(0x0001);
    /// Advanced chipset.
    pub const AGA: Self = Self(0x0002);
    /// Retargetable graphics.
    pub const RTG: Self = Self(0x0004);
    /// Every architecture bit.
    pub const ANY: Self = Self(0x0007);
    /// The chunk carries trailing data after its fixed payload.
    pub const HAS_DATA: Self = Self(0x0100);

    /// Raw bit value.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// `(self & mask) != 0`.
    pub const fn intersects(self, mask: Self) -> bool {
        self.0 & mask.0 != 0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ArchFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ArchFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ArchFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ArchFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl fmt::Debug for ArchFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchFlags({:#06x})", self.0)
    }
}
