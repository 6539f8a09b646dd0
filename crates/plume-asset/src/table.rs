//! Object tables: per-class directories of asset id to owning archive.
//!
//! A table is filled once (by [`ArchiveBuilder`](crate::ArchiveBuilder) or
//! by decoding a persisted table chunk) and then only its resident handles
//! change. Ids outside `[id_min, id_max]` are rejected without a scan.

use tracing::trace;

use plume_arena::ArenaId;
use plume_core::{ArchFlags, ArchiveId, AssetId, Tag};

use crate::asset::AssetHandle;
use crate::error::AssetError;

/// Items one table can hold.
pub const MAX_ITEMS_PER_TABLE: usize = 256;

/// Encoded size of one [`TableItem`].
pub const TABLE_ITEM_ENCODED_LEN: usize = 12;

/// Encoded size of a whole [`ObjectTable`], independent of its item count.
pub const TABLE_ENCODED_SIZE: usize = 4 + 2 + 2 + MAX_ITEMS_PER_TABLE * TABLE_ITEM_ENCODED_LEN;

/// Locates a persisted table: the archive holding it, the id in its chunk
/// header, and the class it indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Archive holding the table chunk.
    pub archive: ArchiveId,
    /// Id in the table chunk's header.
    pub chunk_id: AssetId,
    /// Class the table indexes.
    pub class: Tag,
}

impl TableRef {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Encode as `archive u16, chunk_id u16, class tag`.
    pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..2].copy_from_slice(&self.archive.0.to_be_bytes());
        out[2..4].copy_from_slice(&self.chunk_id.0.to_be_bytes());
        out[4..8].copy_from_slice(&self.class.bytes());
        out
    }

    /// Decode from the first [`Self::ENCODED_LEN`] bytes of `b`.
    pub fn from_bytes(b: &[u8]) -> Self {
        Self {
            archive: ArchiveId(u16::from_be_bytes([b[0], b[1]])),
            chunk_id: AssetId(u16::from_be_bytes([b[2], b[3]])),
            class: Tag([b[4], b[5], b[6], b[7]]),
        }
    }
}

/// One table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableItem {
    /// Asset id.
    pub id: AssetId,
    /// Archive holding the asset's chunk.
    pub archive: ArchiveId,
    /// Arch flags of the chunk.
    pub flags: ArchFlags,
    /// Serialized payload size in bytes.
    pub size: u32,
    /// The loaded asset, if resident. Never persisted.
    pub resident: Option<AssetHandle>,
}

impl TableItem {
    /// A non-resident item.
    pub fn new(id: AssetId, archive: ArchiveId, flags: ArchFlags, size: u32) -> Self {
        Self {
            id,
            archive,
            flags,
            size,
            resident: None,
        }
    }

    fn matches(&self, id: AssetId, mask: ArchFlags) -> bool {
        self.id == id && self.flags.intersects(mask)
    }
}

/// Directory of one asset class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTable {
    class: Tag,
    id_min: AssetId,
    id_max: AssetId,
    items: Vec<TableItem>,
}

impl ObjectTable {
    /// An empty table for `class`. Its bounds are `[0, 0]`.
    pub fn new(class: Tag) -> Self {
        Self {
            class,
            id_min: AssetId::TERMINATOR,
            id_max: AssetId::TERMINATOR,
            items: Vec::new(),
        }
    }

    /// Class the table indexes.
    pub fn class(&self) -> Tag {
        self.class
    }

    /// Inclusive id bounds.
    pub fn bounds(&self) -> (AssetId, AssetId) {
        (self.id_min, self.id_max)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in insertion order.
    pub fn items(&self) -> &[TableItem] {
        &self.items
    }

    fn position(&self, id: AssetId, mask: ArchFlags) -> Option<usize> {
        if id < self.id_min || id > self.id_max {
            trace!(
                class = %self.class,
                asset = %id,
                min = %self.id_min,
                max = %self.id_max,
                "id outside table bounds"
            );
            return None;
        }
        self.items
            .iter()
            .take_while(|item| !item.id.is_terminator())
            .position(|item| item.matches(id, mask))
    }

    /// First item with `id` whose flags intersect `mask`.
    pub fn lookup(&self, id: AssetId, mask: ArchFlags) -> Option<&TableItem> {
        self.position(id, mask).map(|i| &self.items[i])
    }

    /// Mutable form of [`lookup`](Self::lookup).
    pub fn lookup_mut(&mut self, id: AssetId, mask: ArchFlags) -> Option<&mut TableItem> {
        self.position(id, mask).map(move |i| &mut self.items[i])
    }

    /// Append an item and widen the bounds to cover it.
    pub fn push(&mut self, item: TableItem) -> Result<(), AssetError> {
        if item.id.is_terminator() {
            return Err(AssetError::ReservedId { class: self.class });
        }
        if self.items.len() >= MAX_ITEMS_PER_TABLE {
            return Err(AssetError::TableFull {
                class: self.class,
                capacity: MAX_ITEMS_PER_TABLE,
            });
        }
        if self.items.is_empty() {
            self.id_min = item.id;
            self.id_max = item.id;
        } else {
            self.id_min = self.id_min.min(item.id);
            self.id_max = self.id_max.max(item.id);
        }
        self.items.push(TableItem {
            resident: None,
            ..item
        });
        Ok(())
    }

    /// Clear the item whose resident handle is `handle`.
    pub fn clear_resident(&mut self, handle: AssetHandle) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| item.resident == Some(handle))
        {
            Some(item) => {
                item.resident = None;
                true
            }
            None => false,
        }
    }

    /// Clear every resident handle allocated from `arena`. Returns how many
    /// were cleared.
    pub fn forget_arena(&mut self, arena: ArenaId) -> usize {
        let mut cleared = 0;
        for item in &mut self.items {
            if item.resident.is_some_and(|h| h.allocation().arena() == arena) {
                item.resident = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Encode to [`TABLE_ENCODED_SIZE`] bytes. Unused slots are zero.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TABLE_ENCODED_SIZE);
        out.extend_from_slice(&self.class.bytes());
        out.extend_from_slice(&self.id_min.0.to_be_bytes());
        out.extend_from_slice(&self.id_max.0.to_be_bytes());
        for item in &self.items {
            out.extend_from_slice(&item.id.0.to_be_bytes());
            out.extend_from_slice(&item.archive.0.to_be_bytes());
            out.extend_from_slice(&item.flags.bits().to_be_bytes());
            out.extend_from_slice(&[0, 0]);
            out.extend_from_slice(&item.size.to_be_bytes());
        }
        out.resize(TABLE_ENCODED_SIZE, 0);
        out
    }

    /// Decode a table encoded by [`encode`](Self::encode). Every item comes
    /// back non-resident.
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.len() != TABLE_ENCODED_SIZE {
            return Err(AssetError::SizeMismatch {
                tag: None,
                expected: TABLE_ENCODED_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }
        let be16 = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
        let class = Tag([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let items = bytes[8..]
            .chunks_exact(TABLE_ITEM_ENCODED_LEN)
            .map(|b| TableItem {
                id: AssetId(u16::from_be_bytes([b[0], b[1]])),
                archive: ArchiveId(u16::from_be_bytes([b[2], b[3]])),
                flags: ArchFlags(u16::from_be_bytes([b[4], b[5]])),
                size: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
                resident: None,
            })
            .take_while(|item| !item.id.is_terminator())
            .collect();
        Ok(Self {
            class,
            id_min: AssetId(be16(4)),
            id_max: AssetId(be16(6)),
            items,
        })
    }
}
