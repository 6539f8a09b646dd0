//! Strongly-typed identifiers for assets and archives.

use std::fmt;

/// Identifies an asset within its class.
///
/// Ids are only unique per class type: palette 1 and room 1 are different
/// assets. `AssetId(0)` is reserved as the object-table terminator and is
/// never assigned to a real asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssetId(pub u16);

impl AssetId {
    /// The reserved terminator id.
    pub const TERMINATOR: Self = Self(0);

    /// Whether this is the reserved terminator id.
    pub fn is_terminator(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for AssetId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Identifies an archive file.
///
/// The numeric id doubles as the file stem: archive `3` lives at
/// `<base>/3.<extension>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ArchiveId(pub u16);

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for ArchiveId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}
