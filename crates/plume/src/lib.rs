//! Plume: arena-backed asset streaming from chunked archives.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Plume sub-crates. For most users, adding `plume` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use plume::prelude::*;
//! use plume::types::tag::CT_ROOM;
//! use plume_test_utils::MemoryProvider;
//!
//! let config = CatalogConfig::new("data");
//! let provider = MemoryProvider::new();
//!
//! // Write one archive holding a single room.
//! let mut builder = ArchiveBuilder::new(ArchiveId(3));
//! let room = Room { width: 320, height: 200, ..Room::default() };
//! builder.add(AssetId(1), ArchFlags::ANY, &room).unwrap();
//! let (bytes, tables) = builder.finish().unwrap();
//! provider.insert(config.archive_path(ArchiveId(3)), bytes);
//!
//! let mut catalog = Catalog::new(config, Box::new(provider)).unwrap();
//! for table in tables {
//!     catalog.insert_table(table).unwrap();
//! }
//!
//! // Load it into the room arena.
//! let mut arenas = ArenaSet::open(&ArenaConfig::default()).unwrap();
//! let arena = arenas.get_mut(ArenaScope::Room);
//! let handle = catalog.load_asset(arena, None, CT_ROOM, AssetId(1), ArchFlags::AGA).unwrap();
//! assert_eq!(Catalog::read::<Room>(arena, handle).unwrap(), room);
//!
//! // Leaving the room drops everything loaded into it.
//! arenas.rollback(ArenaScope::Room);
//! catalog.forget_arena(arenas.get(ArenaScope::Room).id());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `plume-core` | Ids, tags, arch flags, chunk headers, stream traits |
//! | [`arena`] | `plume-arena` | Bump arenas and the game/chapter/room set |
//! | [`container`] | `plume-container` | Chunk container reader and writer |
//! | [`asset`] | `plume-asset` | Archive registry, object tables, asset loader |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`plume-core`).
///
/// Asset and archive ids, class [`types::Tag`]s, [`types::ArchFlags`] and
/// the [`types::StreamProvider`] seam archives are opened through.
pub use plume_core as types;

/// Bump arenas (`plume-arena`).
///
/// [`arena::Arena`] hands out generation-checked
/// [`arena::Allocation`]s; [`arena::ArenaSet`] holds one arena per
/// lifetime scope.
pub use plume_arena as arena;

/// Chunk container codec (`plume-container`).
///
/// Stream chunks out of an archive with [`container::ChunkReader`] and
/// write them with [`container::ChunkWriter`].
pub use plume_container as container;

/// Archives, object tables and the asset loader (`plume-asset`).
pub use plume_asset as asset;

/// Common imports for typical Plume usage.
///
/// ```rust
/// use plume::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use plume_core::{ArchFlags, ArchiveId, AssetId, FsProvider, StreamProvider, Tag};

    // Arenas
    pub use plume_arena::{Allocation, Arena, ArenaConfig, ArenaScope, ArenaSet, Placement};

    // Loader
    pub use plume_asset::{
        ArchiveBuilder, AssetHandle, Catalog, CatalogConfig, GameInfo, ImageHeader, Palette,
        Payload, Room, TableRef,
    };

    // Errors
    pub use plume_arena::ArenaError;
    pub use plume_asset::AssetError;
    pub use plume_container::ContainerError;
}
