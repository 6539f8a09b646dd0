//! Error types for the container codec.

use std::fmt;
use std::io;

use plume_core::Tag;

/// Errors that can occur while reading or writing a container.
#[derive(Debug)]
pub enum ContainerError {
    /// An I/O error from the underlying stream.
    Io(io::Error),
    /// The stream is not a well-formed container.
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A transfer would cross the end of the current chunk.
    ChunkOverrun {
        /// Bytes requested.
        requested: u64,
        /// Bytes left in the chunk.
        remaining: u64,
    },
    /// A chunk popped with a declared size different from what was written.
    SizeMismatch {
        /// The chunk's tag.
        tag: Tag,
        /// Size declared at push.
        declared: u32,
        /// Bytes actually written.
        written: u64,
    },
    /// A payload transfer was attempted outside any content chunk.
    NotInChunk,
    /// A tag that is not printable four-character ASCII.
    InvalidTag {
        /// The rejected tag.
        tag: Tag,
    },
    /// Push/pop calls did not balance.
    UnbalancedNesting {
        /// Chunks still open (0 when popping with nothing open).
        open: usize,
    },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { detail } => write!(f, "malformed container: {detail}"),
            Self::ChunkOverrun {
                requested,
                remaining,
            } => {
                write!(
                    f,
                    "chunk overrun: {requested} bytes requested, {remaining} remaining"
                )
            }
            Self::SizeMismatch {
                tag,
                declared,
                written,
            } => {
                write!(
                    f,
                    "chunk {tag} declared {declared} bytes but {written} were written"
                )
            }
            Self::NotInChunk => write!(f, "not inside a content chunk"),
            Self::InvalidTag { tag } => write!(f, "invalid chunk tag {tag}"),
            Self::UnbalancedNesting { open } => {
                write!(f, "unbalanced chunk nesting ({open} open)")
            }
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ContainerError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl ContainerError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}
