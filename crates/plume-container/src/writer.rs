//! Container writer.
//!
//! [`ChunkWriter`] builds a container with push/pop calls. A chunk pushed
//! with [`ChunkSize::Unknown`] has its size patched in on pop, which needs
//! a seekable stream; a chunk pushed with a known size is checked against
//! what was actually written.

use std::io::{Seek, SeekFrom, Write};

use smallvec::SmallVec;
use tracing::trace;

use plume_core::{ChunkHeader, Tag};

use crate::codec::{is_group_tag, write_tag, write_u32_be};
use crate::error::ContainerError;
use crate::MAX_DEPTH;

/// Size declared when a chunk is pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSize {
    /// The payload size is known up front and verified on pop.
    Known(u32),
    /// The size is written as a placeholder and patched on pop.
    Unknown,
}

#[derive(Clone, Copy, Debug)]
struct OpenChunk {
    tag: Tag,
    group: bool,
    declared: Option<u32>,
    /// Absolute position of the chunk's size field.
    size_pos: u64,
    /// Payload bytes written so far (children include header and pad).
    written: u64,
}

/// Writes a container to a seekable byte stream.
pub struct ChunkWriter<W: Write + Seek> {
    stream: W,
    stack: SmallVec<[OpenChunk; 4]>,
    sealed: bool,
}

impl<W: Write + Seek> ChunkWriter<W> {
    /// Bind a writer to `stream` at its current position.
    pub fn open(stream: W) -> Self {
        Self {
            stream,
            stack: SmallVec::new(),
            sealed: false,
        }
    }

    /// Open a group chunk of form `kind`.
    ///
    /// A known `size` counts the four kind bytes and every child including
    /// its header and pad byte.
    pub fn push_group(
        &mut self,
        tag: Tag,
        kind: Tag,
        size: ChunkSize,
    ) -> Result<(), ContainerError> {
        if !tag.is_valid() || !is_group_tag(tag) {
            return Err(ContainerError::InvalidTag { tag });
        }
        if !kind.is_valid() {
            return Err(ContainerError::InvalidTag { tag: kind });
        }
        if self.stack.iter().filter(|c| c.group).count() >= MAX_DEPTH {
            return Err(ContainerError::malformed(format!(
                "groups nested deeper than {MAX_DEPTH}"
            )));
        }
        self.check_parent(tag)?;
        self.push(tag, true, size)?;
        write_tag(&mut self.stream, kind)?;
        if let Some(top) = self.stack.last_mut() {
            top.written = 4;
        }
        trace!(%tag, %kind, depth = self.stack.len(), "pushed group");
        Ok(())
    }

    /// Open a content chunk inside the current group.
    pub fn push_chunk(&mut self, tag: Tag, size: ChunkSize) -> Result<(), ContainerError> {
        if !tag.is_valid() || is_group_tag(tag) {
            return Err(ContainerError::InvalidTag { tag });
        }
        if self.stack.is_empty() {
            return Err(ContainerError::malformed(format!(
                "content chunk {tag} outside any group"
            )));
        }
        self.check_parent(tag)?;
        self.push(tag, false, size)
    }

    fn check_parent(&self, tag: Tag) -> Result<(), ContainerError> {
        match self.stack.last() {
            Some(parent) if !parent.group => Err(ContainerError::malformed(format!(
                "chunk {tag} opened inside content chunk {}",
                parent.tag
            ))),
            None if self.sealed => Err(ContainerError::malformed(format!(
                "chunk {tag} after the outer group was closed"
            ))),
            _ => Ok(()),
        }
    }

    fn push(&mut self, tag: Tag, group: bool, size: ChunkSize) -> Result<(), ContainerError> {
        let start = self.stream.stream_position()?;
        let declared = match size {
            ChunkSize::Known(n) => Some(n),
            ChunkSize::Unknown => None,
        };
        write_tag(&mut self.stream, tag)?;
        write_u32_be(&mut self.stream, declared.unwrap_or(0))?;
        self.stack.push(OpenChunk {
            tag,
            group,
            declared,
            size_pos: start + 4,
            written: 0,
        });
        Ok(())
    }

    /// Append payload bytes to the current content chunk.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ContainerError> {
        let top = match self.stack.last_mut() {
            Some(top) if !top.group => top,
            _ => return Err(ContainerError::NotInChunk),
        };
        let requested = bytes.len() as u64;
        if let Some(declared) = top.declared {
            let remaining = u64::from(declared).saturating_sub(top.written);
            if requested > remaining {
                return Err(ContainerError::ChunkOverrun {
                    requested,
                    remaining,
                });
            }
        }
        self.stream.write_all(bytes)?;
        top.written += requested;
        Ok(())
    }

    /// Write a [`ChunkHeader`] at the current position of the content chunk.
    pub fn write_header(&mut self, header: ChunkHeader) -> Result<(), ContainerError> {
        self.write_bytes(&header.to_bytes())
    }

    /// Close the innermost open chunk.
    ///
    /// Known sizes are verified; unknown sizes are patched. Odd-sized chunks
    /// get their pad byte here.
    pub fn pop_chunk(&mut self) -> Result<(), ContainerError> {
        let Some(chunk) = self.stack.pop() else {
            return Err(ContainerError::UnbalancedNesting { open: 0 });
        };

        let size = u32::try_from(chunk.written).map_err(|_| {
            ContainerError::malformed(format!(
                "chunk {} exceeds the 32-bit size limit",
                chunk.tag
            ))
        })?;

        match chunk.declared {
            Some(declared) if declared != size => {
                return Err(ContainerError::SizeMismatch {
                    tag: chunk.tag,
                    declared,
                    written: chunk.written,
                });
            }
            Some(_) => {}
            None => {
                let end = self.stream.stream_position()?;
                self.stream.seek(SeekFrom::Start(chunk.size_pos))?;
                write_u32_be(&mut self.stream, size)?;
                self.stream.seek(SeekFrom::Start(end))?;
            }
        }

        let pad = u64::from(size % 2);
        if pad == 1 {
            self.stream.write_all(&[0])?;
        }

        match self.stack.last_mut() {
            Some(parent) => parent.written += 8 + chunk.written + pad,
            None => self.sealed = true,
        }
        trace!(tag = %chunk.tag, size, depth = self.stack.len(), "popped chunk");
        Ok(())
    }

    /// Write a complete content chunk: header followed by `payload`.
    pub fn write_chunk(
        &mut self,
        tag: Tag,
        header: ChunkHeader,
        payload: &[u8],
    ) -> Result<(), ContainerError> {
        let size = ChunkHeader::ENCODED_LEN + payload.len();
        let size = u32::try_from(size).map_err(|_| {
            ContainerError::malformed(format!("chunk {tag} exceeds the 32-bit size limit"))
        })?;
        self.push_chunk(tag, ChunkSize::Known(size))?;
        self.write_header(header)?;
        self.write_bytes(payload)?;
        self.pop_chunk()
    }

    /// Number of chunks currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Flush and hand the stream back. Every pushed chunk must be popped.
    pub fn close(mut self) -> Result<W, ContainerError> {
        if !self.stack.is_empty() {
            return Err(ContainerError::UnbalancedNesting {
                open: self.stack.len(),
            });
        }
        self.stream.flush()?;
        Ok(self.stream)
    }
}
