//! Configuration errors shared by the arena and catalog layers.

use std::error::Error;
use std::fmt;

/// Errors detected by a configuration's `validate()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// An arena was configured with zero capacity.
    ZeroCapacity {
        /// Which arena (`"game"`, `"chapter"`, `"room"`).
        scope: &'static str,
    },
    /// The archive file extension is empty.
    EmptyExtension,
    /// The archive file extension contains a path separator or a dot.
    InvalidExtension {
        /// The rejected extension.
        extension: String,
    },
    /// `max_open_archives` is zero.
    ZeroOpenLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity { scope } => write!(f, "{scope} arena capacity must be non-zero"),
            Self::EmptyExtension => write!(f, "archive extension must not be empty"),
            Self::InvalidExtension { extension } => {
                write!(f, "archive extension {extension:?} must be a bare suffix")
            }
            Self::ZeroOpenLimit => write!(f, "max_open_archives must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
