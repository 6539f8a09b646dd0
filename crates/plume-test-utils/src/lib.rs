//! Test utilities for Plume development.
//!
//! Provides an in-memory [`StreamProvider`] that counts opens, a
//! temp-directory fixture for real archive files, and builders for sample
//! containers.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{build_container, sample_payload, SampleChunk, TempArchives};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use plume_core::{ReadStream, StreamProvider, WriteStream};

#[derive(Default)]
struct Files {
    data: HashMap<PathBuf, Vec<u8>>,
    denied: HashSet<PathBuf>,
    read_opens: usize,
}

/// In-memory [`StreamProvider`].
///
/// Clones share the same files, so a test can hand one clone to the code
/// under test and keep another to inspect [`open_count`](Self::open_count).
#[derive(Clone, Default)]
pub struct MemoryProvider {
    files: Rc<RefCell<Files>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `path`, replacing any previous contents.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.borrow_mut().data.insert(path.into(), bytes);
    }

    /// Delete `path`. Returns the old contents.
    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow_mut().data.remove(path)
    }

    /// Make opens of `path` fail with `PermissionDenied`, as a locked file
    /// would.
    pub fn deny(&self, path: impl Into<PathBuf>) {
        self.files.borrow_mut().denied.insert(path.into());
    }

    /// Current contents of `path`.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().data.get(path).cloned()
    }

    /// Successful read opens so far.
    pub fn open_count(&self) -> usize {
        self.files.borrow().read_opens
    }
}

impl StreamProvider for MemoryProvider {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadStream>> {
        let mut files = self.files.borrow_mut();
        if files.denied.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        let bytes = files
            .data
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        files.read_opens += 1;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteStream>> {
        if self.files.borrow().denied.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        Ok(Box::new(MemoryWriter {
            path: path.to_path_buf(),
            buf: Cursor::new(Vec::new()),
            files: Rc::clone(&self.files),
        }))
    }
}

/// Write stream that stores its bytes in the provider on flush and drop.
struct MemoryWriter {
    path: PathBuf,
    buf: Cursor<Vec<u8>>,
    files: Rc<RefCell<Files>>,
}

impl MemoryWriter {
    fn commit(&self) {
        self.files
            .borrow_mut()
            .data
            .insert(self.path.clone(), self.buf.get_ref().clone());
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn reads_count_and_share_state() {
        let provider = MemoryProvider::new();
        let clone = provider.clone();
        provider.insert("a.plume", vec![1, 2, 3]);

        let mut out = Vec::new();
        clone
            .open_read(Path::new("a.plume"))
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(provider.open_count(), 1);
    }

    #[test]
    fn missing_and_denied_paths_fail() {
        let provider = MemoryProvider::new();
        let err = provider.open_read(Path::new("x")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        provider.insert("y", vec![]);
        provider.deny("y");
        let err = provider.open_read(Path::new("y")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(provider.open_count(), 0);
    }

    #[test]
    fn written_bytes_land_on_drop() {
        let provider = MemoryProvider::new();
        {
            let mut w = provider.open_write(Path::new("out")).unwrap();
            w.write_all(&[9, 9]).unwrap();
        }
        assert_eq!(provider.get(Path::new("out")), Some(vec![9, 9]));
    }
}
