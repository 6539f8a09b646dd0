//! Archive building.
//!
//! [`ArchiveBuilder`] writes a complete archive into memory: the outer
//! group, one content chunk per asset, and optionally the object tables
//! indexing them. Each added asset is recorded in an in-progress table for
//! its class so the tables can be persisted or installed directly.

use std::io::{Cursor, Write};

use indexmap::IndexMap;
use tracing::debug;

use plume_container::{ChunkSize, ChunkWriter, ARCHIVE_KIND, GROUP_FORM, GROUP_LIST};
use plume_core::tag::{CT_IMAGE, CT_TABLE};
use plume_core::{ArchFlags, ArchiveId, AssetId, ChunkHeader, StreamProvider, Tag};

use crate::class::AssetClass;
use crate::config::CatalogConfig;
use crate::error::AssetError;
use crate::payload::{chunky_to_planar, ImageHeader, Payload};
use crate::table::{ObjectTable, TableItem, TableRef};

/// Builds one archive in memory.
pub struct ArchiveBuilder {
    archive: ArchiveId,
    writer: ChunkWriter<Cursor<Vec<u8>>>,
    started: bool,
    tables: IndexMap<Tag, ObjectTable>,
}

impl ArchiveBuilder {
    /// Start an empty archive that will be stored as `archive`.
    pub fn new(archive: ArchiveId) -> Self {
        Self {
            archive,
            writer: ChunkWriter::open(Cursor::new(Vec::new())),
            started: false,
            tables: IndexMap::new(),
        }
    }

    /// The id the archive is built for.
    pub fn archive(&self) -> ArchiveId {
        self.archive
    }

    fn writer(&mut self) -> Result<&mut ChunkWriter<Cursor<Vec<u8>>>, AssetError> {
        if !self.started {
            self.writer
                .push_group(GROUP_FORM, ARCHIVE_KIND, ChunkSize::Unknown)?;
            self.started = true;
        }
        Ok(&mut self.writer)
    }

    fn record(
        &mut self,
        class: AssetClass,
        id: AssetId,
        flags: ArchFlags,
        size: usize,
    ) -> Result<(), AssetError> {
        if !class.has_table() {
            return Ok(());
        }
        let archive = self.archive;
        self.tables
            .entry(class.tag())
            .or_insert_with(|| ObjectTable::new(class.tag()))
            .push(TableItem::new(id, archive, flags, size as u32))
    }

    /// Add a fixed-layout asset.
    pub fn add<P: Payload>(
        &mut self,
        id: AssetId,
        flags: ArchFlags,
        payload: &P,
    ) -> Result<(), AssetError> {
        self.add_raw(P::CLASS, id, flags, &payload.encode()?)
    }

    /// Add an asset from its encoded payload bytes.
    pub fn add_raw(
        &mut self,
        class: Tag,
        id: AssetId,
        flags: ArchFlags,
        payload: &[u8],
    ) -> Result<(), AssetError> {
        let class = AssetClass::find(class)?;
        class.check_size(payload.len() as u64)?;
        self.writer()?
            .write_chunk(class.tag(), ChunkHeader::new(id, flags), payload)?;
        self.record(class, id, flags, payload.len())
    }

    /// Add an image from one byte per pixel. The pixels are stored as
    /// `depth` bit-planes after the image header, with the chunk size
    /// patched in once they are written.
    pub fn add_image(
        &mut self,
        id: AssetId,
        flags: ArchFlags,
        header: ImageHeader,
        pixels: &[u8],
    ) -> Result<(), AssetError> {
        let planes = chunky_to_planar(&header, pixels)?;
        let flags = flags | ArchFlags::HAS_DATA;
        let encoded = header.encode()?;
        let writer = self.writer()?;
        writer.push_chunk(CT_IMAGE, ChunkSize::Unknown)?;
        writer.write_header(ChunkHeader::new(id, flags))?;
        writer.write_bytes(&encoded)?;
        writer.write_bytes(&planes)?;
        writer.pop_chunk()?;
        self.record(AssetClass::Image, id, flags, encoded.len() + planes.len())
    }

    /// Open a `LIST` group of form `kind`. Assets added until
    /// [`end_list`](Self::end_list) are nested inside it.
    pub fn begin_list(&mut self, kind: Tag) -> Result<(), AssetError> {
        self.writer()?
            .push_group(GROUP_LIST, kind, ChunkSize::Unknown)?;
        Ok(())
    }

    /// Close the group opened by [`begin_list`](Self::begin_list).
    pub fn end_list(&mut self) -> Result<(), AssetError> {
        if self.writer.depth() <= 1 {
            return Err(AssetError::MalformedContainer {
                detail: "no list open".into(),
            });
        }
        self.writer.pop_chunk()?;
        Ok(())
    }

    /// Table recorded so far for `class`.
    pub fn table(&self, class: Tag) -> Option<&ObjectTable> {
        self.tables.get(&class)
    }

    /// Persist `table` as a table chunk with header id `chunk_id`.
    pub fn add_table(
        &mut self,
        chunk_id: AssetId,
        table: &ObjectTable,
    ) -> Result<TableRef, AssetError> {
        let archive = self.archive;
        self.writer()?.write_chunk(
            CT_TABLE,
            ChunkHeader::new(chunk_id, ArchFlags::ANY),
            &table.encode(),
        )?;
        Ok(TableRef {
            archive,
            chunk_id,
            class: table.class(),
        })
    }

    /// Close the archive. Returns its bytes and the tables recorded for
    /// the assets it holds.
    pub fn finish(mut self) -> Result<(Vec<u8>, Vec<ObjectTable>), AssetError> {
        self.writer()?;
        self.writer.pop_chunk()?;
        let bytes = self.writer.close()?.into_inner();
        debug!(
            archive = %self.archive,
            bytes = bytes.len(),
            tables = self.tables.len(),
            "archive built"
        );
        Ok((bytes, self.tables.into_values().collect()))
    }

    /// Close the archive and write it through `provider` to the path
    /// `config` assigns its id. Returns the recorded tables.
    pub fn store(
        self,
        provider: &dyn StreamProvider,
        config: &CatalogConfig,
    ) -> Result<Vec<ObjectTable>, AssetError> {
        let path = config.archive_path(self.archive);
        let (bytes, tables) = self.finish()?;
        let mut stream = provider.open_write(&path)?;
        stream.write_all(&bytes)?;
        stream.flush()?;
        debug!(path = %path.display(), bytes = bytes.len(), "archive stored");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Palette, Room};
    use plume_container::{ChunkEvent, ChunkReader};
    use plume_core::tag::{CT_ENTITY, CT_PALETTE, CT_ROOM};

    #[test]
    fn empty_archive_is_a_bare_form() {
        let (bytes, tables) = ArchiveBuilder::new(ArchiveId(0)).finish().unwrap();
        assert_eq!(&bytes[..4], b"FORM");
        assert_eq!(&bytes[8..12], b"PLUM");
        assert_eq!(bytes.len(), 12);
        assert!(tables.is_empty());
    }

    #[test]
    fn assets_are_recorded_per_class() {
        let mut b = ArchiveBuilder::new(ArchiveId(4));
        b.add(AssetId(1), ArchFlags::ANY, &Palette::default()).unwrap();
        b.add(AssetId(2), ArchFlags::AGA, &Room::default()).unwrap();
        b.add(AssetId(3), ArchFlags::ECS, &Room::default()).unwrap();
        b.add_raw(CT_ENTITY, AssetId(9), ArchFlags::ANY, &[1, 2, 3]).unwrap();

        let rooms = b.table(CT_ROOM).unwrap();
        assert_eq!(rooms.len(), 2);
        let item = rooms.lookup(AssetId(3), ArchFlags::ECS).unwrap();
        assert_eq!(item.archive, ArchiveId(4));
        assert_eq!(item.size as usize, Room::SIZE);

        let (_, tables) = b.finish().unwrap();
        let classes: Vec<_> = tables.iter().map(ObjectTable::class).collect();
        assert_eq!(classes, vec![CT_PALETTE, CT_ROOM, CT_ENTITY]);
    }

    #[test]
    fn wrong_payload_size_is_rejected() {
        let mut b = ArchiveBuilder::new(ArchiveId(0));
        assert!(matches!(
            b.add_raw(CT_PALETTE, AssetId(1), ArchFlags::ANY, &[0; 5]),
            Err(AssetError::SizeMismatch { .. })
        ));
        assert!(matches!(
            b.add_raw(Tag::new(b"NOPE"), AssetId(1), ArchFlags::ANY, &[]),
            Err(AssetError::UnknownClass { .. })
        ));
    }

    #[test]
    fn image_chunk_carries_planes() {
        let mut b = ArchiveBuilder::new(ArchiveId(0));
        let header = ImageHeader::new(16, 2, 3, AssetId(1));
        b.add_image(AssetId(7), ArchFlags::ANY, header, &[5; 32]).unwrap();
        let item = *b.table(CT_IMAGE).unwrap().lookup(AssetId(7), ArchFlags::ANY).unwrap();
        assert!(item.flags.contains(ArchFlags::HAS_DATA));
        assert_eq!(item.size as usize, ImageHeader::SIZE + 12);

        let (bytes, _) = b.finish().unwrap();
        let mut r = ChunkReader::open(Cursor::new(bytes)).unwrap();
        r.next_chunk().unwrap();
        match r.next_chunk().unwrap() {
            ChunkEvent::Chunk(info) => {
                assert_eq!(info.tag, CT_IMAGE);
                assert_eq!(info.size as usize, 4 + ImageHeader::SIZE + 12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lists_nest_and_must_balance() {
        let mut b = ArchiveBuilder::new(ArchiveId(0));
        assert!(b.end_list().is_err());
        b.begin_list(CT_ROOM).unwrap();
        b.add(AssetId(1), ArchFlags::ANY, &Room::default()).unwrap();
        b.end_list().unwrap();
        let (bytes, _) = b.finish().unwrap();

        let mut r = ChunkReader::open(Cursor::new(bytes)).unwrap();
        r.next_chunk().unwrap();
        assert!(matches!(
            r.next_chunk().unwrap(),
            ChunkEvent::Group { kind, .. } if kind == CT_ROOM
        ));
    }

    #[test]
    fn store_writes_through_the_provider() {
        let provider = plume_test_utils::MemoryProvider::new();
        let config = CatalogConfig::new("data");
        let mut b = ArchiveBuilder::new(ArchiveId(2));
        b.add(AssetId(1), ArchFlags::ANY, &Palette::default()).unwrap();
        let tables = b.store(&provider, &config).unwrap();
        assert_eq!(tables.len(), 1);

        let bytes = provider.get(&config.archive_path(ArchiveId(2))).unwrap();
        assert_eq!(&bytes[..4], b"FORM");
        assert_eq!(bytes.len(), 12 + 8 + 4 + Palette::SIZE);
    }

    #[test]
    fn store_reports_refused_writes() {
        let provider = plume_test_utils::MemoryProvider::new();
        let config = CatalogConfig::new("data");
        provider.deny(config.archive_path(ArchiveId(0)));
        let err = ArchiveBuilder::new(ArchiveId(0))
            .store(&provider, &config)
            .unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn table_ref_names_the_archive() {
        let mut b = ArchiveBuilder::new(ArchiveId(3));
        b.add(AssetId(1), ArchFlags::ANY, &Palette::default()).unwrap();
        let table = b.table(CT_PALETTE).unwrap().clone();
        let r = b.add_table(AssetId(40), &table).unwrap();
        assert_eq!(
            r,
            TableRef {
                archive: ArchiveId(3),
                chunk_id: AssetId(40),
                class: CT_PALETTE
            }
        );
    }
}
