//! Error types for archive, table and asset operations.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use plume_arena::ArenaError;
use plume_container::ContainerError;
use plume_core::{ArchiveId, AssetId, Tag};

/// What a [`AssetError::NotFound`] could not find.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Missing {
    /// The archive's backing file does not exist or cannot be opened.
    Archive {
        /// Requested archive.
        archive: ArchiveId,
        /// Path that was tried.
        path: PathBuf,
    },
    /// No chunk (or table item) answers the request.
    Asset {
        /// Asset class.
        class: Tag,
        /// Requested asset id.
        id: AssetId,
        /// Archive that was scanned, if one was resolved.
        archive: Option<ArchiveId>,
    },
    /// No table chunk with the referenced id.
    Table {
        /// Archive that was scanned.
        archive: ArchiveId,
        /// Chunk header id of the table.
        chunk_id: AssetId,
    },
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive { archive, path } => {
                write!(f, "archive {archive} ({})", path.display())
            }
            Self::Asset {
                class,
                id,
                archive: Some(archive),
            } => write!(f, "{class} {id} in archive {archive}"),
            Self::Asset {
                class,
                id,
                archive: None,
            } => write!(f, "{class} {id}"),
            Self::Table { archive, chunk_id } => {
                write!(f, "table {chunk_id} in archive {archive}")
            }
        }
    }
}

/// Errors from the asset layer.
///
/// Arena and container errors convert into this type, so every public
/// operation of the crate returns `Result<_, AssetError>`.
#[derive(Debug)]
pub enum AssetError {
    /// An arena's backing region could not be reserved.
    AllocationFailure {
        /// Bytes requested.
        requested: usize,
    },
    /// The target arena has no room for the asset.
    OutOfSpace {
        /// Rounded size of the rejected allocation.
        requested: usize,
        /// Bytes already in use.
        used: usize,
        /// Arena capacity.
        capacity: usize,
    },
    /// An archive, asset or table is absent.
    NotFound(Missing),
    /// The container could not be parsed.
    MalformedContainer {
        /// Description of the parse failure.
        detail: String,
    },
    /// A persisted size disagrees with the expected in-memory size.
    SizeMismatch {
        /// Chunk or class concerned, when known.
        tag: Option<Tag>,
        /// Expected size in bytes.
        expected: u64,
        /// Size found.
        actual: u64,
    },
    /// No factory is registered for the class tag.
    UnknownClass {
        /// The unrecognised tag.
        tag: Tag,
    },
    /// An id-based lookup was requested for a class without an object table.
    NoTableForClass {
        /// The class.
        class: Tag,
    },
    /// The archive holding the asset could not be opened.
    ArchiveUnavailable {
        /// The archive.
        archive: ArchiveId,
        /// Why the open failed.
        reason: Box<AssetError>,
    },
    /// A handle was resolved after its arena was rolled back.
    StaleHandle {
        /// Generation recorded in the handle.
        handle_generation: u32,
        /// The arena's current generation.
        current: u32,
    },
    /// Any other arena-level failure (foreign handle, missing arena).
    Arena(ArenaError),
    /// `unload_asset` was given no asset.
    NullAsset,
    /// An object table already holds its maximum number of items.
    TableFull {
        /// The table's class.
        class: Tag,
        /// Maximum item count.
        capacity: usize,
    },
    /// Asset id 0 is the table terminator and cannot be stored.
    ReservedId {
        /// The table's class.
        class: Tag,
    },
    /// An I/O error from a stream.
    Io(io::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailure { requested } => {
                write!(f, "cannot reserve {requested} bytes")
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
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::MalformedContainer { detail } => write!(f, "malformed container: {detail}"),
            Self::SizeMismatch {
                tag: Some(tag),
                expected,
                actual,
            } => write!(f, "{tag} is {actual} bytes, expected {expected}"),
            Self::SizeMismatch {
                tag: None,
                expected,
                actual,
            } => write!(f, "size mismatch: {actual} bytes, expected {expected}"),
            Self::UnknownClass { tag } => write!(f, "no factory registered for {tag}"),
            Self::NoTableForClass { class } => write!(f, "class {class} has no object table"),
            Self::ArchiveUnavailable { archive, reason } => {
                write!(f, "archive {archive} unavailable: {reason}")
            }
            Self::StaleHandle {
                handle_generation,
                current,
            } => {
                write!(
                    f,
                    "stale asset handle: generation {handle_generation}, arena at {current}"
                )
            }
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::NullAsset => write!(f, "no asset given"),
            Self::TableFull { class, capacity } => {
                write!(f, "{class} table is full ({capacity} items)")
            }
            Self::ReservedId { class } => write!(f, "{class} id 0 is reserved"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ArchiveUnavailable { reason, .. } => Some(reason.as_ref()),
            Self::Arena(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for AssetError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::AllocationFailure { requested } => Self::AllocationFailure { requested },
            ArenaError::OutOfSpace {
                requested,
                used,
                capacity,
            } => Self::OutOfSpace {
                requested,
                used,
                capacity,
            },
            ArenaError::StaleHandle {
                handle_generation,
                current,
            } => Self::StaleHandle {
                handle_generation,
                current,
            },
            other => Self::Arena(other),
        }
    }
}

impl From<ContainerError> for AssetError {
    fn from(e: ContainerError) -> Self {
        match e {
            ContainerError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                Self::MalformedContainer {
                    detail: io.to_string(),
                }
            }
            ContainerError::Io(io) => Self::Io(io),
            ContainerError::Malformed { detail } => Self::MalformedContainer { detail },
            ContainerError::ChunkOverrun {
                requested,
                remaining,
            } => Self::SizeMismatch {
                tag: None,
                expected: remaining,
                actual: requested,
            },
            ContainerError::SizeMismatch {
                tag,
                declared,
                written,
            } => Self::SizeMismatch {
                tag: Some(tag),
                expected: u64::from(declared),
                actual: written,
            },
            other => Self::MalformedContainer {
                detail: other.to_string(),
            },
        }
    }
}

impl From<io::Error> for AssetError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_errors_keep_their_kind() {
        let e: AssetError = ArenaError::OutOfSpace {
            requested: 8,
            used: 4,
            capacity: 8,
        }
        .into();
        assert!(matches!(e, AssetError::OutOfSpace { requested: 8, .. }));

        let e: AssetError = ArenaError::NullArena.into();
        assert!(matches!(e, AssetError::Arena(ArenaError::NullArena)));
    }

    #[test]
    fn short_read_is_malformed() {
        let io = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        let e: AssetError = ContainerError::Io(io).into();
        assert!(matches!(e, AssetError::MalformedContainer { .. }));
    }

    #[test]
    fn overrun_is_size_mismatch() {
        let e: AssetError = ContainerError::ChunkOverrun {
            requested: 10,
            remaining: 4,
        }
        .into();
        assert!(matches!(
            e,
            AssetError::SizeMismatch {
                tag: None,
                expected: 4,
                actual: 10
            }
        ));
    }

    #[test]
    fn unavailable_archive_chains_its_reason() {
        let e = AssetError::ArchiveUnavailable {
            archive: ArchiveId(5),
            reason: Box::new(AssetError::NotFound(Missing::Archive {
                archive: ArchiveId(5),
                path: PathBuf::from("data/5.plume"),
            })),
        };
        assert!(e.source().is_some());
        assert_eq!(
            e.to_string(),
            "archive 5 unavailable: not found: archive 5 (data/5.plume)"
        );
    }
}
