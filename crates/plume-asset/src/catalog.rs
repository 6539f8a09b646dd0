//! The asset loader.
//!
//! A [`Catalog`] owns the archive registry and one object table per
//! tabled class, and loads assets into caller-chosen arenas. Loading an
//! asset that is already resident returns the cached handle without I/O.

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use plume_arena::{Arena, ArenaId};
use plume_container::ChunkEvent;
use plume_core::tag::{CT_GAME_INFO, CT_TABLE};
use plume_core::{ArchFlags, ArchiveId, AssetId, ChunkHeader, ConfigError, StreamProvider, Tag};

use crate::archive::{Archive, ArchiveReader, ArchiveRegistry};
use crate::asset::{AssetHandle, AssetHeader, ASSET_HEADER_LEN};
use crate::class::AssetClass;
use crate::config::CatalogConfig;
use crate::error::{AssetError, Missing};
use crate::payload::{GameInfo, Payload};
use crate::table::{ObjectTable, TableRef, TABLE_ENCODED_SIZE};

/// Archive registry, object tables and the data construct hooks keep
/// outside the arenas.
///
/// # Example
///
/// ```
/// use plume_arena::{Arena, Placement};
/// use plume_asset::{ArchiveBuilder, Catalog, CatalogConfig, Palette};
/// use plume_core::{ArchFlags, ArchiveId, AssetId};
/// use plume_core::tag::CT_PALETTE;
/// use plume_test_utils::MemoryProvider;
///
/// let provider = MemoryProvider::new();
/// let config = CatalogConfig::new("data");
///
/// let mut builder = ArchiveBuilder::new(ArchiveId(0));
/// builder.add(AssetId(1), ArchFlags::ANY, &Palette::default()).unwrap();
/// let (bytes, tables) = builder.finish().unwrap();
/// provider.insert(config.archive_path(ArchiveId(0)), bytes);
///
/// let mut catalog = Catalog::new(config, Box::new(provider.clone())).unwrap();
/// for table in tables {
///     catalog.insert_table(table).unwrap();
/// }
///
/// let mut arena = Arena::open(4096, Placement::Any).unwrap();
/// let a = catalog.load_asset(&mut arena, None, CT_PALETTE, AssetId(1), ArchFlags::ANY).unwrap();
/// let b = catalog.load_asset(&mut arena, None, CT_PALETTE, AssetId(1), ArchFlags::ANY).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(provider.open_count(), 1);
/// ```
pub struct Catalog {
    registry: ArchiveRegistry,
    tables: IndexMap<Tag, ObjectTable>,
    extensions: IndexMap<AssetHandle, Vec<u8>>,
}

impl Catalog {
    /// Create a catalog with an empty table for every tabled class.
    pub fn new(
        config: CatalogConfig,
        provider: Box<dyn StreamProvider>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_registry(ArchiveRegistry::new(config, provider)?))
    }

    /// Create a catalog around an existing registry.
    pub fn with_registry(registry: ArchiveRegistry) -> Self {
        let tables = AssetClass::ALL
            .iter()
            .filter(|class| class.has_table())
            .map(|class| (class.tag(), ObjectTable::new(class.tag())))
            .collect();
        Self {
            registry,
            tables,
            extensions: IndexMap::new(),
        }
    }

    /// The archive registry.
    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    /// Mutable access to the archive registry.
    pub fn registry_mut(&mut self) -> &mut ArchiveRegistry {
        &mut self.registry
    }

    /// The object table for `class`, if the class has one.
    pub fn table(&self, class: Tag) -> Option<&ObjectTable> {
        self.tables.get(&class)
    }

    /// Replace the table for the table's class. Returns the old table.
    pub fn insert_table(&mut self, table: ObjectTable) -> Result<ObjectTable, AssetError> {
        let class = AssetClass::find(table.class())?;
        let slot = self
            .tables
            .get_mut(&class.tag())
            .ok_or(AssetError::NoTableForClass { class: class.tag() })?;
        debug!(class = %class, items = table.len(), "object table installed");
        Ok(std::mem::replace(slot, table))
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Load asset `id` of class `class` into `arena`.
    ///
    /// With `archive` set to `None` the owning archive comes from the
    /// class's object table. A resident hit returns the cached handle
    /// without touching any archive. A resident handle from `arena` that
    /// was invalidated by a rollback is dropped and the asset reloaded.
    ///
    /// On failure nothing stays allocated in `arena`.
    pub fn load_asset(
        &mut self,
        arena: &mut Arena,
        archive: Option<ArchiveId>,
        class: Tag,
        id: AssetId,
        mask: ArchFlags,
    ) -> Result<AssetHandle, AssetError> {
        let class = AssetClass::find(class).inspect_err(|_| {
            warn!(class = %class, asset = %id, "no factory registered for class");
        })?;

        if let Some(handle) = self.resident(arena, class, archive, id, mask) {
            trace!(class = %class, asset = %id, "resident hit");
            return Ok(handle);
        }

        let archive_id = match archive {
            Some(archive) => archive,
            None => self.owning_archive(class, id, mask)?,
        };

        let result = match self.registry.open(archive_id) {
            Ok(archive) => load_from(archive, arena, class, id, mask),
            Err(e) => {
                warn!(
                    archive = %archive_id,
                    class = %class,
                    asset = %id,
                    error = %e,
                    "archive unavailable"
                );
                return Err(AssetError::ArchiveUnavailable {
                    archive: archive_id,
                    reason: Box::new(e),
                });
            }
        };
        let (handle, extension) = result.inspect_err(|e| {
            warn!(
                archive = %archive_id,
                class = %class,
                asset = %id,
                error = %e,
                "asset load failed"
            );
        })?;

        if let Some(item) = self
            .tables
            .get_mut(&class.tag())
            .and_then(|table| table.lookup_mut(id, mask))
            .filter(|item| item.archive == archive_id)
        {
            item.resident = Some(handle);
        }
        if let Some(extension) = extension {
            self.extensions.insert(handle, extension);
        }
        debug!(archive = %archive_id, class = %class, asset = %id, %handle, "asset loaded");
        Ok(handle)
    }

    /// Cached handle for the request, if one is still usable.
    fn resident(
        &mut self,
        arena: &Arena,
        class: AssetClass,
        archive: Option<ArchiveId>,
        id: AssetId,
        mask: ArchFlags,
    ) -> Option<AssetHandle> {
        let item = self.tables.get_mut(&class.tag())?.lookup_mut(id, mask)?;
        if archive.is_some_and(|a| a != item.archive) {
            return None;
        }
        let handle = item.resident?;
        let alloc = handle.allocation();
        if alloc.arena() == arena.id() && !arena.is_live(&alloc) {
            debug!(class = %class, asset = %id, "resident handle outlived its arena generation");
            item.resident = None;
            self.extensions.shift_remove(&handle);
            return None;
        }
        Some(handle)
    }

    fn owning_archive(
        &self,
        class: AssetClass,
        id: AssetId,
        mask: ArchFlags,
    ) -> Result<ArchiveId, AssetError> {
        let Some(table) = self.tables.get(&class.tag()) else {
            warn!(class = %class, asset = %id, "class has no object table");
            return Err(AssetError::NoTableForClass { class: class.tag() });
        };
        match table.lookup(id, mask) {
            Some(item) => Ok(item.archive),
            None => {
                warn!(class = %class, asset = %id, mask = %mask, "asset not in object table");
                Err(AssetError::NotFound(Missing::Asset {
                    class: class.tag(),
                    id,
                    archive: None,
                }))
            }
        }
    }

    /// Release a loaded asset's bookkeeping.
    ///
    /// Clears the table's resident handle if it still points at `asset`,
    /// runs the class's destruct hook and zero-fills the asset's bytes. The
    /// memory itself is only reclaimed by rolling back `arena`.
    pub fn unload_asset(
        &mut self,
        arena: &mut Arena,
        asset: Option<AssetHandle>,
    ) -> Result<(), AssetError> {
        let Some(handle) = asset else {
            warn!("cannot unload asset: none given");
            return Err(AssetError::NullAsset);
        };

        let header = Self::asset_header(arena, handle)?;
        let class = AssetClass::find(header.class).inspect_err(|_| {
            error!(
                class = %header.class,
                asset = %header.id,
                "loaded asset has no registered factory"
            );
        })?;

        if let Some(table) = self.tables.get_mut(&class.tag()) {
            table.clear_resident(handle);
        }

        if let Some(extension) = self.extensions.shift_remove(&handle) {
            if let Some(destruct) = class.destruct() {
                destruct(arena.bytes(handle.payload_allocation())?, extension);
            }
        }

        arena.bytes_mut(handle.allocation())?.fill(0);
        debug!(class = %class, asset = %header.id, "asset unloaded");
        Ok(())
    }

    /// Archive holding asset `id`, looked up through the class's table.
    ///
    /// `None` on any miss, including an unknown class.
    pub fn find_asset_archive(
        &self,
        id: AssetId,
        class: Tag,
        mask: ArchFlags,
    ) -> Option<ArchiveId> {
        let class = AssetClass::find(class).ok()?;
        self.tables
            .get(&class.tag())?
            .lookup(id, mask)
            .map(|item| item.archive)
    }

    /// Load the object table `table_ref` points at, replacing the class's
    /// current table.
    pub fn load_object_table(&mut self, table_ref: &TableRef) -> Result<(), AssetError> {
        let class = AssetClass::find(table_ref.class)?;
        if !class.has_table() {
            return Err(AssetError::NoTableForClass { class: class.tag() });
        }

        let archive = match self.registry.open(table_ref.archive) {
            Ok(archive) => archive,
            Err(e) => {
                warn!(
                    archive = %table_ref.archive,
                    class = %class,
                    error = %e,
                    "table archive unavailable"
                );
                return Err(AssetError::ArchiveUnavailable {
                    archive: table_ref.archive,
                    reason: Box::new(e),
                });
            }
        };
        let table = read_table(archive, table_ref).inspect_err(|e| {
            warn!(
                archive = %table_ref.archive,
                chunk = %table_ref.chunk_id,
                class = %class,
                error = %e,
                "object table load failed"
            );
        })?;
        if table.class() != class.tag() {
            return Err(AssetError::MalformedContainer {
                detail: format!(
                    "table {} indexes {}, expected {}",
                    table_ref.chunk_id,
                    table.class(),
                    class
                ),
            });
        }

        debug!(
            class = %class,
            items = table.len(),
            archive = %table_ref.archive,
            "object table loaded"
        );
        self.forget_extensions_of(class);
        self.tables.insert(class.tag(), table);
        Ok(())
    }

    /// Load the game metadata asset and every table it references.
    pub fn bootstrap(
        &mut self,
        arena: &mut Arena,
        archive: ArchiveId,
        id: AssetId,
    ) -> Result<(AssetHandle, GameInfo), AssetError> {
        let handle = self.load_asset(arena, Some(archive), CT_GAME_INFO, id, ArchFlags::ANY)?;
        let info = Self::read::<GameInfo>(arena, handle)?;
        for table_ref in &info.tables {
            self.load_object_table(table_ref)?;
        }
        debug!(title = %info.title, tables = info.tables.len(), "catalog bootstrapped");
        Ok((handle, info))
    }

    // ── Access ──────────────────────────────────────────────────

    /// Payload bytes of a loaded asset.
    pub fn payload(arena: &Arena, handle: AssetHandle) -> Result<&[u8], AssetError> {
        Ok(arena.bytes(handle.payload_allocation())?)
    }

    /// Header of a loaded asset.
    pub fn asset_header(arena: &Arena, handle: AssetHandle) -> Result<AssetHeader, AssetError> {
        let bytes = arena.bytes(handle.header_allocation())?;
        let mut raw = [0u8; ASSET_HEADER_LEN];
        raw.copy_from_slice(bytes);
        Ok(AssetHeader::from_bytes(&raw))
    }

    /// Decode a loaded asset's payload.
    pub fn read<P: Payload>(arena: &Arena, handle: AssetHandle) -> Result<P, AssetError> {
        P::decode(Self::payload(arena, handle)?)
    }

    /// Chunky pixels made when image `handle` was loaded.
    pub fn image_pixels(&self, handle: AssetHandle) -> Option<&[u8]> {
        self.extensions.get(&handle).map(Vec::as_slice)
    }

    /// Drop every resident handle allocated from `arena`, along with any
    /// data their construct hooks made. Call after rolling `arena` back.
    pub fn forget_arena(&mut self, arena: ArenaId) -> usize {
        let cleared: usize = self
            .tables
            .values_mut()
            .map(|table| table.forget_arena(arena))
            .sum();
        self.extensions
            .retain(|handle, _| handle.allocation().arena() != arena);
        if cleared > 0 {
            debug!(arena = %arena, cleared, "resident handles forgotten");
        }
        cleared
    }

    fn forget_extensions_of(&mut self, class: AssetClass) {
        if let Some(table) = self.tables.get(&class.tag()) {
            for item in table.items() {
                if let Some(handle) = item.resident {
                    self.extensions.shift_remove(&handle);
                }
            }
        }
    }

    /// Close every archive. Resident handles stay valid.
    pub fn close_archives(&mut self) {
        self.registry.close_all();
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("registry", &self.registry)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

// ── Scans ───────────────────────────────────────────────────────

/// Scan `archive` from the start for the first chunk answering the request
/// and copy it into `arena`. The reader is dropped on return.
fn load_from(
    archive: &mut Archive,
    arena: &mut Arena,
    class: AssetClass,
    id: AssetId,
    mask: ArchFlags,
) -> Result<(AssetHandle, Option<Vec<u8>>), AssetError> {
    let archive_id = archive.id();
    let mut reader = archive.scan()?;

    let (flags, declared) = loop {
        let info = match reader.next_chunk()? {
            ChunkEvent::EndOfContainer => {
                return Err(AssetError::NotFound(Missing::Asset {
                    class: class.tag(),
                    id,
                    archive: Some(archive_id),
                }));
            }
            ChunkEvent::Chunk(info) if info.tag == class.tag() => info,
            _ => continue,
        };
        let declared = u64::from(info.size)
            .checked_sub(ChunkHeader::ENCODED_LEN as u64)
            .ok_or_else(|| AssetError::MalformedContainer {
                detail: format!("{} chunk too small for its header", info.tag),
            })?;
        let header = reader.read_header()?;
        if header.matches(id, mask) {
            class.check_size(declared)?;
            break (header.flags, declared);
        }
    };

    let payload_len = class.payload_size().unwrap_or(declared as usize);
    let alloc = arena.allocate(ASSET_HEADER_LEN + payload_len, false)?;
    let handle = AssetHandle::new(alloc, payload_len as u32);

    match fill(&mut reader, arena, handle, class, id, mask, flags) {
        Ok(extension) => Ok((handle, extension)),
        Err(e) => {
            arena.release_last(alloc);
            Err(e)
        }
    }
}

/// Copy the payload behind `reader` into `handle`, write the asset header
/// and run the class's construct hook.
fn fill(
    reader: &mut ArchiveReader<'_>,
    arena: &mut Arena,
    handle: AssetHandle,
    class: AssetClass,
    id: AssetId,
    mask: ArchFlags,
    flags: ArchFlags,
) -> Result<Option<Vec<u8>>, AssetError> {
    reader.read_bytes(arena.bytes_mut(handle.payload_allocation())?)?;
    let header = AssetHeader {
        id,
        class: class.tag(),
        arch: mask,
    };
    arena
        .bytes_mut(handle.header_allocation())?
        .copy_from_slice(&header.to_bytes());
    match class.construct() {
        Some(construct) => {
            let payload = arena.bytes(handle.payload_allocation())?;
            construct(flags, payload, reader).map(Some)
        }
        None => Ok(None),
    }
}

/// Scan `archive` for the table chunk `table_ref` names.
fn read_table(archive: &mut Archive, table_ref: &TableRef) -> Result<ObjectTable, AssetError> {
    let mut reader = archive.scan()?;
    loop {
        let info = match reader.next_chunk()? {
            ChunkEvent::EndOfContainer => {
                return Err(AssetError::NotFound(Missing::Table {
                    archive: table_ref.archive,
                    chunk_id: table_ref.chunk_id,
                }));
            }
            ChunkEvent::Chunk(info) if info.tag == CT_TABLE => info,
            _ => continue,
        };
        let expected = (ChunkHeader::ENCODED_LEN + TABLE_ENCODED_SIZE) as u64;
        if u64::from(info.size) != expected {
            return Err(AssetError::SizeMismatch {
                tag: Some(CT_TABLE),
                expected,
                actual: u64::from(info.size),
            });
        }
        if reader.read_header()?.id != table_ref.chunk_id {
            continue;
        }
        let mut bytes = vec![0u8; TABLE_ENCODED_SIZE];
        reader.read_bytes(&mut bytes)?;
        return ObjectTable::decode(&bytes);
    }
}
