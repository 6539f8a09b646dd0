//! Byte-stream collaborator traits.
//!
//! Plume never touches the filesystem directly: archives are opened through
//! a [`StreamProvider`], which hands back seekable byte streams. All calls are
//! synchronous and fail discretely.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// A seekable, readable byte stream.
pub trait ReadStream: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadStream for T {}

/// A seekable, writable byte stream.
pub trait WriteStream: Write + Seek {}

impl<T: Write + Seek + ?Sized> WriteStream for T {}

/// Opens byte streams by path.
pub trait StreamProvider {
    /// Open an existing stream for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadStream>>;

    /// Create (or truncate) a stream for writing.
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteStream>>;
}

/// [`StreamProvider`] backed by the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsProvider;

impl StreamProvider for FsProvider {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadStream>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteStream>> {
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
