//! Nested tagged-chunk container codec.
//!
//! A container is a stream of length-delimited chunks, each identified by a
//! four-character [`Tag`](plume_core::Tag). Group chunks (`FORM`, `LIST`,
//! `CAT `) wrap further chunks; every other chunk is a content chunk whose
//! payload is read or written through a bounded cursor.
//!
//! # Architecture
//!
//! - [`ChunkReader`] walks a `Read + Seek` stream one chunk at a time
//! - [`ChunkWriter`] builds a container on a `Write + Seek` stream, patching
//!   deferred sizes on pop
//! - [`codec`] holds the primitive big-endian encoders shared by both
//!
//! # Format
//!
//! ```text
//! "FORM" [size u32] [kind: 4 bytes]
//!     [tag: 4 bytes] [size u32] [payload: size bytes] [pad: 0|1 byte]
//!     ...
//! ```
//!
//! All integers are big-endian. Odd-sized chunks are followed by one pad
//! byte that is not counted in their size but is counted in the size of the
//! enclosing group.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{is_group_tag, ARCHIVE_KIND, GROUP_CAT, GROUP_FORM, GROUP_LIST};
pub use error::ContainerError;
pub use reader::{ChunkEvent, ChunkInfo, ChunkReader};
pub use writer::{ChunkSize, ChunkWriter};

/// Deepest group nesting either side will accept.
pub const MAX_DEPTH: usize = 16;
