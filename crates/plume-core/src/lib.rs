//! Core types and traits for the Plume asset streamer.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other Plume crate: asset and archive ids,
//! four-character chunk tags, capability flags, the fixed chunk header, and
//! the byte-stream traits through which archives are opened.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod chunk;
pub mod error;
pub mod flags;
pub mod id;
pub mod tag;
pub mod traits;

pub use chunk::ChunkHeader;
pub use error::ConfigError;
pub use flags::ArchFlags;
pub use id::{ArchiveId, AssetId};
pub use tag::Tag;
pub use traits::{FsProvider, ReadStream, StreamProvider, WriteStream};
