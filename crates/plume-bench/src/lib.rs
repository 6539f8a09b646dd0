//! Benchmark profiles for the Plume asset streamer.
//!
//! - [`room_archive`]: one archive of `n` rooms with a palette per room
//! - [`profile_catalog`]: a catalog over an in-memory copy of that archive

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use plume_asset::{ArchiveBuilder, AssetError, Catalog, CatalogConfig, ObjectTable, Palette, Room};
use plume_core::{ArchFlags, ArchiveId, AssetId};
use plume_test_utils::MemoryProvider;

/// Archive every profile is built in.
pub const PROFILE_ARCHIVE: ArchiveId = ArchiveId(0);

/// Build an archive holding rooms `1..=n` and palettes `1001..=1000 + n`.
///
/// Rooms alternate between ECS and AGA variants so lookups exercise the
/// arch mask.
pub fn room_archive(n: u16) -> Result<(Vec<u8>, Vec<ObjectTable>), AssetError> {
    let mut builder = ArchiveBuilder::new(PROFILE_ARCHIVE);
    for i in 1..=n {
        let flags = if i % 2 == 0 { ArchFlags::AGA } else { ArchFlags::ECS };
        let room = Room {
            width: 320,
            height: 200,
            exits: [AssetId(i % n + 1)].into_iter().collect(),
            ..Room::default()
        };
        builder.add(AssetId(i), flags, &room)?;
        builder.add(AssetId(1000 + i), ArchFlags::ANY, &Palette::default())?;
    }
    builder.finish()
}

/// A catalog whose tables index [`room_archive`]`(n)`, read through a
/// [`MemoryProvider`].
pub fn profile_catalog(n: u16) -> Result<(MemoryProvider, Catalog), AssetError> {
    let config = CatalogConfig::new("bench");
    let (bytes, tables) = room_archive(n)?;
    let provider = MemoryProvider::new();
    provider.insert(config.archive_path(PROFILE_ARCHIVE), bytes);
    let mut catalog = Catalog::new(config, Box::new(provider.clone()))
        .map_err(|e| AssetError::MalformedContainer { detail: e.to_string() })?;
    for table in tables {
        catalog.insert_table(table)?;
    }
    Ok((provider, catalog))
}
