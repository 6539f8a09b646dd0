//! Archive registry, object tables and the arena-backed asset loader.
//!
//! This crate ties the arena and container layers together. A [`Catalog`]
//! resolves an asset id to its archive through the class's
//! [`ObjectTable`], opens the archive through the [`ArchiveRegistry`],
//! scans it for the matching chunk and copies the payload into the
//! caller's arena.
//!
//! # Architecture
//!
//! ```text
//! Catalog
//! ├── ArchiveRegistry        id → Archive (one stream each)
//! ├── ObjectTable per class  id → archive, flags, size, resident handle
//! └── hook data              AssetHandle → bytes made by construct hooks
//! ```
//!
//! [`AssetClass`] is the closed set of loadable classes; each variant
//! carries its payload size and optional construct/destruct hooks.
//! [`ArchiveBuilder`] is the write side used by tools and tests.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod asset;
pub mod builder;
pub mod catalog;
pub mod class;
pub mod config;
pub mod error;
pub mod payload;
pub mod table;

pub use archive::{Archive, ArchiveReader, ArchiveRegistry};
pub use asset::{AssetHandle, AssetHeader, ASSET_HEADER_LEN};
pub use builder::ArchiveBuilder;
pub use catalog::Catalog;
pub use class::{AssetClass, ConstructHook, DestructHook};
pub use config::CatalogConfig;
pub use error::{AssetError, Missing};
pub use payload::{
    chunky_to_planar, planar_to_chunky, GameInfo, ImageHeader, Palette, Payload, Room,
};
pub use table::{
    ObjectTable, TableItem, TableRef, MAX_ITEMS_PER_TABLE, TABLE_ENCODED_SIZE,
};
