//! Container reader.
//!
//! [`ChunkReader`] walks a container one chunk at a time. Group chunks are
//! entered automatically; content chunks expose a bounded cursor through
//! [`ChunkReader::read_bytes`]. Moving to the next chunk skips whatever is
//! left of the current one, so callers only read what they need.

use std::io::{Read, Seek, SeekFrom};

use smallvec::SmallVec;
use tracing::trace;

use plume_core::{ChunkHeader, Tag};

use crate::codec::{is_group_tag, read_exact, read_tag, read_u32_be};
use crate::error::ContainerError;
use crate::MAX_DEPTH;

/// Tag and declared size of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    /// The chunk's tag.
    pub tag: Tag,
    /// Declared payload size in bytes (excluding the pad byte).
    pub size: u32,
}

/// One step of a container walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Entered a group chunk. Its children follow.
    Group {
        /// Group tag and size (the size includes the kind).
        info: ChunkInfo,
        /// Form kind stored after the group header.
        kind: Tag,
    },
    /// Entered a content chunk. Its payload can now be read.
    Chunk(ChunkInfo),
    /// Left a group chunk. A benign boundary; the walk continues.
    EndOfGroup {
        /// Tag of the group that ended.
        tag: Tag,
    },
    /// The outer group has been fully walked.
    EndOfContainer,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    tag: Tag,
    group: bool,
    size: u32,
    /// Absolute position of the end of the payload.
    end: u64,
    /// Whether a pad byte follows the payload.
    padded: bool,
}

impl Frame {
    fn padded_end(&self) -> u64 {
        self.end + u64::from(self.padded)
    }
}

/// Reads a container from a seekable byte stream.
///
/// Generic over `R: Read + Seek` so tests can use `Cursor<Vec<u8>>` and
/// archives can use a boxed file stream. The reader starts at the stream's
/// current position; callers rewind first when they want a full scan.
pub struct ChunkReader<R: Read + Seek> {
    stream: R,
    pos: u64,
    stack: SmallVec<[Frame; 4]>,
    started: bool,
    finished: bool,
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Bind a reader to `stream` at its current position.
    pub fn open(mut stream: R) -> Result<Self, ContainerError> {
        let pos = stream.stream_position()?;
        Ok(Self {
            stream,
            pos,
            stack: SmallVec::new(),
            started: false,
            finished: false,
        })
    }

    /// Advance to the next chunk boundary.
    ///
    /// Any unread payload of the current content chunk is skipped.
    pub fn next_chunk(&mut self) -> Result<ChunkEvent, ContainerError> {
        if self.finished {
            return Ok(ChunkEvent::EndOfContainer);
        }

        if let Some(top) = self.stack.last().copied() {
            if !top.group {
                self.stack.pop();
                self.seek_to(top.padded_end())?;
            }
        }

        let Some(parent) = self.stack.last().copied() else {
            if self.started {
                self.finished = true;
                return Ok(ChunkEvent::EndOfContainer);
            }
            self.started = true;
            return self.enter(None);
        };

        if self.pos >= parent.end {
            self.stack.pop();
            self.seek_to(parent.padded_end())?;
            trace!(tag = %parent.tag, depth = self.stack.len(), "left group");
            return Ok(ChunkEvent::EndOfGroup { tag: parent.tag });
        }

        self.enter(Some(parent))
    }

    fn enter(&mut self, parent: Option<Frame>) -> Result<ChunkEvent, ContainerError> {
        if let Some(parent) = parent {
            let left = parent.end - self.pos;
            if left < 8 {
                return Err(ContainerError::malformed(format!(
                    "{left} stray bytes at end of group {}",
                    parent.tag
                )));
            }
        }

        let tag = read_tag(&mut self.stream)?;
        let size = read_u32_be(&mut self.stream)?;
        self.pos += 8;

        if !tag.is_valid() {
            return Err(ContainerError::malformed(format!(
                "invalid chunk tag {tag} at offset {}",
                self.pos - 8
            )));
        }

        let frame = Frame {
            tag,
            group: is_group_tag(tag),
            size,
            end: self.pos + u64::from(size),
            padded: size % 2 == 1,
        };

        match parent {
            Some(parent) if frame.padded_end() > parent.end => {
                return Err(ContainerError::malformed(format!(
                    "chunk {tag} ({size} bytes) overruns group {}",
                    parent.tag
                )));
            }
            None if !frame.group => {
                return Err(ContainerError::malformed(format!(
                    "container starts with content chunk {tag}, not a group"
                )));
            }
            _ => {}
        }

        let info = ChunkInfo { tag, size };
        if !frame.group {
            self.stack.push(frame);
            return Ok(ChunkEvent::Chunk(info));
        }

        if self.stack.len() >= MAX_DEPTH {
            return Err(ContainerError::malformed(format!(
                "groups nested deeper than {MAX_DEPTH}"
            )));
        }
        if size < 4 {
            return Err(ContainerError::malformed(format!(
                "group {tag} too small for its kind ({size} bytes)"
            )));
        }
        let kind = read_tag(&mut self.stream)?;
        self.pos += 4;
        self.stack.push(frame);
        trace!(%tag, %kind, size, depth = self.stack.len(), "entered group");
        Ok(ChunkEvent::Group { info, kind })
    }

    /// The content chunk currently open, if any.
    pub fn current(&self) -> Option<ChunkInfo> {
        self.stack.last().filter(|f| !f.group).map(|f| ChunkInfo {
            tag: f.tag,
            size: f.size,
        })
    }

    /// Unread payload bytes in the current content chunk (0 outside one).
    pub fn remaining(&self) -> u64 {
        match self.stack.last() {
            Some(f) if !f.group => f.end - self.pos,
            _ => 0,
        }
    }

    /// Read exactly `buf.len()` payload bytes from the current content chunk.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), ContainerError> {
        let remaining = match self.stack.last() {
            Some(f) if !f.group => f.end - self.pos,
            _ => return Err(ContainerError::NotInChunk),
        };
        let requested = buf.len() as u64;
        if requested > remaining {
            return Err(ContainerError::ChunkOverrun {
                requested,
                remaining,
            });
        }
        read_exact(&mut self.stream, buf)?;
        self.pos += requested;
        Ok(())
    }

    /// Read the fixed [`ChunkHeader`] at the cursor.
    pub fn read_header(&mut self) -> Result<ChunkHeader, ContainerError> {
        let mut buf = [0u8; ChunkHeader::ENCODED_LEN];
        self.read_bytes(&mut buf)?;
        Ok(ChunkHeader::from_bytes(buf))
    }

    /// Read the rest of the current content chunk.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>, ContainerError> {
        let mut buf = vec![0u8; self.remaining() as usize];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// Current group nesting depth (content chunks not counted).
    pub fn depth(&self) -> usize {
        self.stack.iter().filter(|f| f.group).count()
    }

    /// Release the parse state and hand the stream back. The stream is
    /// not closed.
    pub fn close(self) -> R {
        self.stream
    }

    fn seek_to(&mut self, target: u64) -> Result<(), ContainerError> {
        if target != self.pos {
            self.stream.seek(SeekFrom::Start(target))?;
            self.pos = target;
        }
        Ok(())
    }
}
