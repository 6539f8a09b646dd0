//! End-to-end loader tests over in-memory archives.

use plume_arena::{Arena, ArenaConfig, ArenaScope, ArenaSet, Placement};
use plume_asset::{
    ArchiveBuilder, AssetError, Catalog, CatalogConfig, ImageHeader, Missing, ObjectTable,
    Palette, Payload, Room, ASSET_HEADER_LEN,
};
use plume_core::tag::{CT_ENTITY, CT_GAME_INFO, CT_IMAGE, CT_PALETTE, CT_ROOM};
use plume_core::{ArchFlags, ArchiveId, AssetId, Tag};
use plume_test_utils::{build_container, sample_payload, MemoryProvider, SampleChunk};

fn config() -> CatalogConfig {
    CatalogConfig::new("data")
}

fn palette() -> Palette {
    let mut p = Palette {
        begin: 0,
        end: 15,
        ..Palette::default()
    };
    for (i, rgb) in p.colours.iter_mut().enumerate() {
        *rgb = [i as u8, (i * 2) as u8, (i * 3) as u8];
    }
    p
}

fn room() -> Room {
    Room {
        width: 320,
        height: 144,
        ..Room::default()
    }
}

/// Archive 0 with PALETTE 1 and ROOM 2, both `ANY`.
fn setup() -> (MemoryProvider, Catalog) {
    let provider = MemoryProvider::new();
    let mut builder = ArchiveBuilder::new(ArchiveId(0));
    builder.add(AssetId(1), ArchFlags::ANY, &palette()).unwrap();
    builder.add(AssetId(2), ArchFlags::ANY, &room()).unwrap();
    let (bytes, tables) = builder.finish().unwrap();
    provider.insert(config().archive_path(ArchiveId(0)), bytes);

    let mut catalog = Catalog::new(config(), Box::new(provider.clone())).unwrap();
    for table in tables {
        catalog.insert_table(table).unwrap();
    }
    (provider, catalog)
}

fn arena() -> Arena {
    Arena::open(16 * 1024, Placement::Any).unwrap()
}

#[test]
fn second_load_is_served_from_the_resident_cache() {
    let (provider, mut catalog) = setup();
    let mut room_arena = arena();

    let first = catalog
        .load_asset(&mut room_arena, Some(ArchiveId(0)), CT_PALETTE, AssetId(1), ArchFlags::ANY)
        .unwrap();
    let used = room_arena.used();
    let second = catalog
        .load_asset(&mut room_arena, Some(ArchiveId(0)), CT_PALETTE, AssetId(1), ArchFlags::ANY)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.open_count(), 1);
    assert_eq!(catalog.registry().opens(), 1);
    assert_eq!(room_arena.used(), used);
}

#[test]
fn unload_clears_the_resident_handle_and_zeroes_the_asset() {
    let (_provider, mut catalog) = setup();
    let mut room_arena = arena();

    let handle = catalog
        .load_asset(&mut room_arena, None, CT_PALETTE, AssetId(1), ArchFlags::ANY)
        .unwrap();
    let resident = catalog
        .table(CT_PALETTE)
        .unwrap()
        .lookup(AssetId(1), ArchFlags::ANY)
        .unwrap()
        .resident;
    assert_eq!(resident, Some(handle));

    catalog.unload_asset(&mut room_arena, Some(handle)).unwrap();

    let item = *catalog
        .table(CT_PALETTE)
        .unwrap()
        .lookup(AssetId(1), ArchFlags::ANY)
        .unwrap();
    assert_eq!(item.resident, None);
    assert_eq!(item.archive, ArchiveId(0));
    assert_eq!(item.id, AssetId(1));
    assert!(room_arena
        .bytes(handle.allocation())
        .unwrap()
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn loaded_payload_matches_the_source_bytes() {
    let (_provider, mut catalog) = setup();
    let mut a = arena();

    let handle = catalog
        .load_asset(&mut a, None, CT_ROOM, AssetId(2), ArchFlags::AGA)
        .unwrap();
    assert_eq!(
        Catalog::payload(&a, handle).unwrap(),
        room().encode().unwrap().as_slice()
    );
    let header = Catalog::asset_header(&a, handle).unwrap();
    assert_eq!(header.id, AssetId(2));
    assert_eq!(header.class, CT_ROOM);
    assert_eq!(header.arch, ArchFlags::AGA);
    assert_eq!(Catalog::read::<Room>(&a, handle).unwrap(), room());
    assert_eq!(handle.allocation().len() as usize, ASSET_HEADER_LEN + Room::SIZE);
}

#[test]
fn missing_archive_fails_without_touching_the_arena() {
    let provider = MemoryProvider::new();
    let mut catalog = Catalog::new(config(), Box::new(provider.clone())).unwrap();
    let mut rooms = ObjectTable::new(CT_ROOM);
    rooms
        .push(plume_asset::TableItem::new(AssetId(8), ArchiveId(5), ArchFlags::ANY, 96))
        .unwrap();
    catalog.insert_table(rooms).unwrap();

    let mut a = arena();
    a.allocate(12, false).unwrap();
    let used = a.used();

    let err = catalog
        .load_asset(&mut a, None, CT_ROOM, AssetId(8), ArchFlags::ANY)
        .unwrap_err();
    match err {
        AssetError::ArchiveUnavailable { archive, reason } => {
            assert_eq!(archive, ArchiveId(5));
            assert!(matches!(*reason, AssetError::NotFound(Missing::Archive { .. })));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(a.used(), used);
    assert_eq!(catalog.find_asset_archive(AssetId(8), CT_ROOM, ArchFlags::ANY), Some(ArchiveId(5)));
}

#[test]
fn failed_construct_hook_releases_the_allocation() {
    let provider = MemoryProvider::new();
    // Image header promising planes that are not there.
    let header = ImageHeader::new(16, 2, 3, AssetId(1)).encode().unwrap();
    let bytes = build_container(&[SampleChunk::new(
        CT_IMAGE,
        4,
        ArchFlags::ANY | ArchFlags::HAS_DATA,
        header,
    )])
    .unwrap();
    provider.insert(config().archive_path(ArchiveId(1)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let err = catalog
        .load_asset(&mut a, Some(ArchiveId(1)), CT_IMAGE, AssetId(4), ArchFlags::ANY)
        .unwrap_err();
    assert!(matches!(err, AssetError::SizeMismatch { .. }));
    assert_eq!(a.used(), 0);
}

#[test]
fn blank_image_with_bad_geometry_is_rejected() {
    let provider = MemoryProvider::new();
    let header = ImageHeader {
        width: u16::MAX,
        height: u16::MAX,
        depth: 99,
        bytes_per_row: 0,
        plane_size: 0,
        ..ImageHeader::new(8, 1, 1, AssetId(1))
    };
    let bytes = build_container(&[SampleChunk::new(
        CT_IMAGE,
        4,
        ArchFlags::ANY,
        header.encode().unwrap(),
    )])
    .unwrap();
    provider.insert(config().archive_path(ArchiveId(1)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let err = catalog
        .load_asset(&mut a, Some(ArchiveId(1)), CT_IMAGE, AssetId(4), ArchFlags::ANY)
        .unwrap_err();
    assert!(matches!(err, AssetError::MalformedContainer { .. }));
    assert_eq!(a.used(), 0);
}

#[test]
fn truncated_archive_is_malformed() {
    let provider = MemoryProvider::new();
    let mut builder = ArchiveBuilder::new(ArchiveId(0));
    builder.add(AssetId(1), ArchFlags::ANY, &palette()).unwrap();
    builder.add(AssetId(2), ArchFlags::ANY, &room()).unwrap();
    let (mut bytes, _) = builder.finish().unwrap();
    // Cut into the room payload, keeping its chunk header.
    bytes.truncate(bytes.len() - 40);
    provider.insert(config().archive_path(ArchiveId(0)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let err = catalog
        .load_asset(&mut a, Some(ArchiveId(0)), CT_ROOM, AssetId(2), ArchFlags::ANY)
        .unwrap_err();
    assert!(matches!(err, AssetError::MalformedContainer { .. }), "{err:?}");
    assert_eq!(a.used(), 0);
}

#[test]
fn matching_chunk_of_the_wrong_size_is_rejected() {
    let provider = MemoryProvider::new();
    let bytes = build_container(&[SampleChunk::new(
        CT_ROOM,
        2,
        ArchFlags::ANY,
        sample_payload(10, 1),
    )])
    .unwrap();
    provider.insert(config().archive_path(ArchiveId(1)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let err = catalog
        .load_asset(&mut a, Some(ArchiveId(1)), CT_ROOM, AssetId(2), ArchFlags::ANY)
        .unwrap_err();
    match err {
        AssetError::SizeMismatch { tag, expected, actual } => {
            assert_eq!(tag, Some(CT_ROOM));
            assert_eq!(expected, Room::SIZE as u64);
            assert_eq!(actual, 10);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(a.used(), 0);
}

#[test]
fn out_of_space_leaves_used_unchanged() {
    let (_provider, mut catalog) = setup();
    let mut small = Arena::open(64, Placement::Any).unwrap();
    let err = catalog
        .load_asset(&mut small, None, CT_PALETTE, AssetId(1), ArchFlags::ANY)
        .unwrap_err();
    assert!(matches!(err, AssetError::OutOfSpace { .. }));
    assert_eq!(small.used(), 0);
    let resident = catalog
        .table(CT_PALETTE)
        .unwrap()
        .lookup(AssetId(1), ArchFlags::ANY)
        .unwrap()
        .resident;
    assert_eq!(resident, None);
}

#[test]
fn images_are_unpacked_and_released() {
    let provider = MemoryProvider::new();
    let header = ImageHeader::new(12, 3, 4, AssetId(1));
    let pixels: Vec<u8> = (0..36).map(|i| (i % 16) as u8).collect();
    let mut builder = ArchiveBuilder::new(ArchiveId(2));
    builder.add_image(AssetId(6), ArchFlags::ANY, header, &pixels).unwrap();
    let (bytes, tables) = builder.finish().unwrap();
    provider.insert(config().archive_path(ArchiveId(2)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();
    for table in tables {
        catalog.insert_table(table).unwrap();
    }

    let mut a = arena();
    let handle = catalog
        .load_asset(&mut a, None, CT_IMAGE, AssetId(6), ArchFlags::ANY)
        .unwrap();
    assert_eq!(Catalog::read::<ImageHeader>(&a, handle).unwrap(), header);
    assert_eq!(catalog.image_pixels(handle), Some(pixels.as_slice()));

    catalog.unload_asset(&mut a, Some(handle)).unwrap();
    assert_eq!(catalog.image_pixels(handle), None);
}

#[test]
fn entities_take_the_whole_chunk() {
    let provider = MemoryProvider::new();
    let body = sample_payload(13, 7);
    let bytes = build_container(&[
        SampleChunk::new(CT_ENTITY, 1, ArchFlags::ECS, sample_payload(4, 0)),
        SampleChunk::new(CT_ENTITY, 1, ArchFlags::AGA, body.clone()),
    ])
    .unwrap();
    provider.insert(config().archive_path(ArchiveId(0)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let handle = catalog
        .load_asset(&mut a, Some(ArchiveId(0)), CT_ENTITY, AssetId(1), ArchFlags::AGA)
        .unwrap();
    assert_eq!(handle.payload_len(), 13);
    assert_eq!(Catalog::payload(&a, handle).unwrap(), body.as_slice());
}

#[test]
fn rollback_invalidates_the_resident_handle_and_forces_a_reload() {
    let (provider, mut catalog) = setup();
    let mut a = arena();

    let before = catalog
        .load_asset(&mut a, None, CT_ROOM, AssetId(2), ArchFlags::ANY)
        .unwrap();
    a.rollback();
    assert!(matches!(
        Catalog::payload(&a, before),
        Err(AssetError::StaleHandle { .. })
    ));

    let after = catalog
        .load_asset(&mut a, None, CT_ROOM, AssetId(2), ArchFlags::ANY)
        .unwrap();
    assert_ne!(before, after);
    assert_eq!(Catalog::read::<Room>(&a, after).unwrap(), room());
    // The archive stayed open; only the scan was repeated.
    assert_eq!(provider.open_count(), 1);
    assert_eq!(catalog.registry_mut().open(ArchiveId(0)).unwrap().usage(), 2);
}

#[test]
fn forget_arena_drops_its_residents() {
    let (_provider, mut catalog) = setup();
    let mut a = arena();
    catalog
        .load_asset(&mut a, None, CT_ROOM, AssetId(2), ArchFlags::ANY)
        .unwrap();
    catalog
        .load_asset(&mut a, None, CT_PALETTE, AssetId(1), ArchFlags::ANY)
        .unwrap();
    a.rollback();
    assert_eq!(catalog.forget_arena(a.id()), 2);
}

#[test]
fn chapter_rollback_then_forget_releases_image_pixels() {
    let provider = MemoryProvider::new();
    let header = ImageHeader::new(8, 2, 2, AssetId(1));
    let mut builder = ArchiveBuilder::new(ArchiveId(3));
    builder.add_image(AssetId(5), ArchFlags::ANY, header, &[1; 16]).unwrap();
    let tables = builder.store(&provider, &config()).unwrap();
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();
    for table in tables {
        catalog.insert_table(table).unwrap();
    }

    let mut arenas = ArenaSet::open(&ArenaConfig {
        game_capacity: 1024,
        chapter_capacity: 1024,
        room_capacity: 1024,
        ..ArenaConfig::default()
    })
    .unwrap();
    let handle = catalog
        .load_asset(
            arenas.get_mut(ArenaScope::Room),
            None,
            CT_IMAGE,
            AssetId(5),
            ArchFlags::ANY,
        )
        .unwrap();
    assert!(catalog.image_pixels(handle).is_some());

    // Rolling back the chapter takes the room with it.
    arenas.rollback(ArenaScope::Chapter);
    assert!(catalog.image_pixels(handle).is_some());
    for scope in [ArenaScope::Chapter, ArenaScope::Room] {
        catalog.forget_arena(arenas.get(scope).id());
    }
    assert_eq!(catalog.image_pixels(handle), None);
}

#[test]
fn request_errors_are_classified() {
    let (_provider, mut catalog) = setup();
    let mut a = arena();

    assert!(matches!(
        catalog.load_asset(&mut a, None, Tag::new(b"NOPE"), AssetId(1), ArchFlags::ANY),
        Err(AssetError::UnknownClass { .. })
    ));
    assert!(matches!(
        catalog.load_asset(&mut a, None, CT_GAME_INFO, AssetId(1), ArchFlags::ANY),
        Err(AssetError::NoTableForClass { .. })
    ));
    assert!(matches!(
        catalog.load_asset(&mut a, None, CT_ROOM, AssetId(3), ArchFlags::ANY),
        Err(AssetError::NotFound(Missing::Asset { archive: None, .. }))
    ));
    assert!(matches!(
        catalog.load_asset(&mut a, Some(ArchiveId(0)), CT_ROOM, AssetId(3), ArchFlags::ANY),
        Err(AssetError::NotFound(Missing::Asset {
            archive: Some(ArchiveId(0)),
            ..
        }))
    ));
    assert!(matches!(
        catalog.unload_asset(&mut a, None),
        Err(AssetError::NullAsset)
    ));
    assert_eq!(a.used(), 0);
}

#[test]
fn find_asset_archive_misses_are_none() {
    let (_provider, catalog) = setup();
    assert_eq!(
        catalog.find_asset_archive(AssetId(2), CT_ROOM, ArchFlags::ANY),
        Some(ArchiveId(0))
    );
    assert_eq!(catalog.find_asset_archive(AssetId(2), CT_ROOM, ArchFlags::NONE), None);
    assert_eq!(catalog.find_asset_archive(AssetId(9), CT_ROOM, ArchFlags::ANY), None);
    assert_eq!(catalog.find_asset_archive(AssetId(1), Tag::new(b"NOPE"), ArchFlags::ANY), None);
    assert_eq!(catalog.find_asset_archive(AssetId(1), CT_GAME_INFO, ArchFlags::ANY), None);
}

#[test]
fn arch_mask_selects_between_variants() {
    let provider = MemoryProvider::new();
    let bytes = build_container(&[
        SampleChunk::new(CT_ENTITY, 5, ArchFlags::ECS, vec![1; 6]),
        SampleChunk::new(CT_ENTITY, 5, ArchFlags::RTG, vec![2; 6]),
    ])
    .unwrap();
    provider.insert(config().archive_path(ArchiveId(0)), bytes);
    let mut catalog = Catalog::new(config(), Box::new(provider)).unwrap();

    let mut a = arena();
    let rtg = catalog
        .load_asset(&mut a, Some(ArchiveId(0)), CT_ENTITY, AssetId(5), ArchFlags::RTG)
        .unwrap();
    assert_eq!(Catalog::payload(&a, rtg).unwrap(), &[2; 6]);
    assert!(matches!(
        catalog.load_asset(&mut a, Some(ArchiveId(0)), CT_ENTITY, AssetId(5), ArchFlags::AGA),
        Err(AssetError::NotFound(_))
    ));
}
