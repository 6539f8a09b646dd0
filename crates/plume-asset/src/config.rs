//! Catalog configuration: where archives live and how many stay open.

use std::path::{PathBuf, MAIN_SEPARATOR};

use plume_core::{ArchiveId, ConfigError};

/// Archive location and registry limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Directory holding the archive files.
    pub base_dir: PathBuf,
    /// File extension, without the dot. Default: `plume`.
    pub extension: String,
    /// Open archives kept before the oldest is closed. Default: 16.
    pub max_open_archives: usize,
}

impl CatalogConfig {
    /// Default archive file extension.
    pub const DEFAULT_EXTENSION: &'static str = "plume";

    /// Default open-archive limit.
    pub const DEFAULT_MAX_OPEN: usize = 16;

    /// Default settings rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Check the extension and open limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        if self
            .extension
            .chars()
            .any(|c| c == '.' || c == '/' || c == MAIN_SEPARATOR)
        {
            return Err(ConfigError::InvalidExtension {
                extension: self.extension.clone(),
            });
        }
        if self.max_open_archives == 0 {
            return Err(ConfigError::ZeroOpenLimit);
        }
        Ok(())
    }

    /// Path of archive `id`.
    ///
    /// The id is appended directly when `base_dir` already ends in a
    /// separator, and after an inserted separator otherwise.
    pub fn archive_path(&self, id: ArchiveId) -> PathBuf {
        let base = self.base_dir.to_string_lossy();
        let name = format!("{id}.{}", self.extension);
        if base.is_empty() {
            PathBuf::from(name)
        } else if base.ends_with('/') || base.ends_with(MAIN_SEPARATOR) {
            PathBuf::from(format!("{base}{name}"))
        } else {
            PathBuf::from(format!("{base}{MAIN_SEPARATOR}{name}"))
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::new(),
            extension: Self::DEFAULT_EXTENSION.to_owned(),
            max_open_archives: Self::DEFAULT_MAX_OPEN,
        }
    }
}
