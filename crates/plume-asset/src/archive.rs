//! The archive registry.
//!
//! An [`Archive`] is one open container file. The [`ArchiveRegistry`] keeps
//! at most one per [`ArchiveId`], opening the backing stream on first use
//! and reusing it afterwards. Every scan rewinds the stream and binds a
//! fresh [`ChunkReader`]; the reader is dropped when the scan ends, so no
//! parse state survives between loads.

use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use plume_container::ChunkReader;
use plume_core::{ArchiveId, ConfigError, ReadStream, StreamProvider};

use crate::config::CatalogConfig;
use crate::error::{AssetError, Missing};

/// A chunk reader borrowing an archive's stream for the length of one scan.
pub type ArchiveReader<'a> = ChunkReader<&'a mut dyn ReadStream>;

/// One open archive.
pub struct Archive {
    id: ArchiveId,
    path: PathBuf,
    stream: Box<dyn ReadStream>,
    usage: u32,
}

impl Archive {
    /// The archive's id.
    pub fn id(&self) -> ArchiveId {
        self.id
    }

    /// Path the backing stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of scans started on this archive since it was opened.
    pub fn usage(&self) -> u32 {
        self.usage
    }

    /// Rewind the stream and start a new scan from the first chunk.
    pub fn scan(&mut self) -> Result<ArchiveReader<'_>, AssetError> {
        self.stream.seek(SeekFrom::Start(0))?;
        self.usage = self.usage.saturating_add(1);
        trace!(archive = %self.id, usage = self.usage, "scan started");
        Ok(ChunkReader::open(&mut *self.stream as &mut dyn ReadStream)?)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Opens, caches and closes archives by id.
pub struct ArchiveRegistry {
    config: CatalogConfig,
    provider: Box<dyn StreamProvider>,
    open: IndexMap<ArchiveId, Archive>,
    opens: u64,
}

impl ArchiveRegistry {
    /// Create an empty registry reading archives through `provider`.
    pub fn new(
        config: CatalogConfig,
        provider: Box<dyn StreamProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            open: IndexMap::new(),
            opens: 0,
        })
    }

    /// The configuration the registry was built with.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Return the open archive `id`, opening it first if needed.
    ///
    /// A missing or locked file fails with [`AssetError::NotFound`]. When
    /// the open limit is reached the longest-open archive is closed to make
    /// room.
    pub fn open(&mut self, id: ArchiveId) -> Result<&mut Archive, AssetError> {
        if let Some(index) = self.open.get_index_of(&id) {
            trace!(archive = %id, "archive reused");
            return Ok(&mut self.open[index]);
        }

        let path = self.config.archive_path(id);
        let stream = match self.provider.open_read(&path) {
            Ok(stream) => stream,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                warn!(archive = %id, path = %path.display(), error = %e, "archive not found");
                return Err(AssetError::NotFound(Missing::Archive { archive: id, path }));
            }
            Err(e) => {
                warn!(archive = %id, path = %path.display(), error = %e, "cannot open archive");
                return Err(AssetError::Io(e));
            }
        };

        if self.open.len() >= self.config.max_open_archives {
            if let Some((evicted, _)) = self.open.shift_remove_index(0) {
                debug!(archive = %evicted, "archive closed to stay under the open limit");
            }
        }

        self.opens += 1;
        debug!(archive = %id, path = %path.display(), "archive opened");
        let (index, _) = self.open.insert_full(
            id,
            Archive {
                id,
                path,
                stream,
                usage: 0,
            },
        );
        Ok(&mut self.open[index])
    }

    /// Close archive `id`. Closing an archive that is not open does nothing.
    pub fn close(&mut self, id: ArchiveId) -> bool {
        match self.open.shift_remove(&id) {
            Some(archive) => {
                debug!(archive = %id, usage = archive.usage, "archive closed");
                true
            }
            None => false,
        }
    }

    /// Close every open archive.
    pub fn close_all(&mut self) {
        let count = self.open.len();
        self.open.clear();
        if count > 0 {
            debug!(count, "all archives closed");
        }
    }

    /// Whether archive `id` is open.
    pub fn contains(&self, id: ArchiveId) -> bool {
        self.open.contains_key(&id)
    }

    /// Number of open archives.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether no archive is open.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Ids of the open archives, longest-open first.
    pub fn ids(&self) -> impl Iterator<Item = ArchiveId> + '_ {
        self.open.keys().copied()
    }

    /// Backing streams opened over the registry's lifetime.
    pub fn opens(&self) -> u64 {
        self.opens
    }
}

impl std::fmt::Debug for ArchiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRegistry")
            .field("config", &self.config)
            .field("open", &self.open.keys().collect::<Vec<_>>())
            .field("opens", &self.opens)
            .finish_non_exhaustive()
    }
}
