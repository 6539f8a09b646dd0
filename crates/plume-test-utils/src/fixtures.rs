//! Sample containers and on-disk archive fixtures.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use plume_container::{ChunkSize, ChunkWriter, ContainerError, ARCHIVE_KIND, GROUP_FORM};
use plume_core::{ArchFlags, ArchiveId, AssetId, ChunkHeader, Tag};

/// Deterministic payload bytes: `seed, seed + 1, ...` wrapping.
pub fn sample_payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

/// One content chunk for [`build_container`].
#[derive(Clone, Debug)]
pub struct SampleChunk {
    pub tag: Tag,
    pub id: AssetId,
    pub flags: ArchFlags,
    pub payload: Vec<u8>,
}

impl SampleChunk {
    pub fn new(tag: Tag, id: u16, flags: ArchFlags, payload: Vec<u8>) -> Self {
        Self {
            tag,
            id: AssetId(id),
            flags,
            payload,
        }
    }
}

/// Encode `chunks` inside an outer archive group.
pub fn build_container(chunks: &[SampleChunk]) -> Result<Vec<u8>, ContainerError> {
    let mut w = ChunkWriter::open(Cursor::new(Vec::new()));
    w.push_group(GROUP_FORM, ARCHIVE_KIND, ChunkSize::Unknown)?;
    for c in chunks {
        w.write_chunk(c.tag, ChunkHeader::new(c.id, c.flags), &c.payload)?;
    }
    w.pop_chunk()?;
    Ok(w.close()?.into_inner())
}

/// A temporary directory of archive files, removed on drop.
pub struct TempArchives {
    dir: TempDir,
    extension: String,
}

impl TempArchives {
    /// Create an empty directory using the default `plume` extension.
    pub fn new() -> io::Result<Self> {
        Self::with_extension("plume")
    }

    pub fn with_extension(extension: &str) -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            extension: extension.to_owned(),
        })
    }

    /// Directory to use as the catalog's base.
    pub fn base_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path archive `id` is stored at.
    pub fn path(&self, id: ArchiveId) -> PathBuf {
        self.dir.path().join(format!("{id}.{}", self.extension))
    }

    /// Write archive `id`.
    pub fn write(&self, id: ArchiveId, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path(id);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Delete archive `id`.
    pub fn remove(&self, id: ArchiveId) -> io::Result<()> {
        fs::remove_file(self.path(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_container::{ChunkEvent, ChunkReader};

    #[test]
    fn sample_payload_wraps() {
        assert_eq!(sample_payload(3, 254), vec![254, 255, 0]);
    }

    #[test]
    fn built_container_reads_back() {
        let bytes = build_container(&[SampleChunk::new(
            Tag::new(b"PALT"),
            1,
            ArchFlags::ANY,
            sample_payload(5, 0),
        )])
        .unwrap();
        let mut r = ChunkReader::open(Cursor::new(bytes)).unwrap();
        assert!(matches!(r.next_chunk().unwrap(), ChunkEvent::Group { .. }));
        assert!(matches!(r.next_chunk().unwrap(), ChunkEvent::Chunk(info) if info.size == 9));
        assert_eq!(r.read_header().unwrap().id, AssetId(1));
    }

    #[test]
    fn temp_archives_round_trip_files() {
        let archives = TempArchives::new().unwrap();
        let path = archives.write(ArchiveId(3), &[1, 2]).unwrap();
        assert!(path.ends_with("3.plume"));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2]);
        archives.remove(ArchiveId(3)).unwrap();
        assert!(!path.exists());
    }
}
