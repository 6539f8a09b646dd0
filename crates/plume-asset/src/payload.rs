//! Typed payload layouts.
//!
//! Each class with a fixed in-memory layout implements [`Payload`], which
//! converts between the typed value and the big-endian bytes stored in the
//! container and copied into the arena. Entities have no fixed layout and
//! are handled as raw bytes.

use smallvec::SmallVec;

use plume_core::tag::{CT_GAME_INFO, CT_IMAGE, CT_PALETTE, CT_ROOM};
use plume_core::{AssetId, Tag};

use crate::error::AssetError;
use crate::table::TableRef;

/// A fixed-layout payload.
pub trait Payload: Sized {
    /// Class type tag the payload belongs to.
    const CLASS: Tag;
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Encode to exactly [`Self::SIZE`] bytes.
    fn encode(&self) -> Result<Vec<u8>, AssetError>;

    /// Decode from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Result<Self, AssetError>;
}

fn check_len<P: Payload>(bytes: &[u8]) -> Result<(), AssetError> {
    if bytes.len() != P::SIZE {
        return Err(AssetError::SizeMismatch {
            tag: Some(P::CLASS),
            expected: P::SIZE as u64,
            actual: bytes.len() as u64,
        });
    }
    Ok(())
}

fn be16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

fn be32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

// ── GameInfo ────────────────────────────────────────────────────

/// Bytes reserved for the game title.
pub const TITLE_LEN: usize = 32;
/// Table references a [`GameInfo`] can carry.
pub const MAX_START_TABLES: usize = 16;

/// Game metadata, loaded once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameInfo {
    /// Title, at most [`TITLE_LEN`] bytes of UTF-8.
    pub title: String,
    /// Screen width in pixels.
    pub width: u16,
    /// Screen height in pixels.
    pub height: u16,
    /// Screen depth in bit-planes.
    pub depth: u16,
    /// Palette shown at start.
    pub start_palette: AssetId,
    /// Palette used by the pointer.
    pub start_cursor_palette: AssetId,
    /// First room.
    pub start_room: AssetId,
    /// Object tables to load at startup.
    pub tables: SmallVec<[TableRef; 4]>,
}

impl Payload for GameInfo {
    const CLASS: Tag = CT_GAME_INFO;
    const SIZE: usize = TITLE_LEN + 6 * 2 + MAX_START_TABLES * TableRef::ENCODED_LEN;

    fn encode(&self) -> Result<Vec<u8>, AssetError> {
        if self.tables.len() > MAX_START_TABLES {
            return Err(AssetError::SizeMismatch {
                tag: Some(Self::CLASS),
                expected: MAX_START_TABLES as u64,
                actual: self.tables.len() as u64,
            });
        }
        let mut out = Vec::with_capacity(Self::SIZE);
        let mut title = [0u8; TITLE_LEN];
        let bytes = self.title.as_bytes();
        let n = bytes.len().min(TITLE_LEN);
        title[..n].copy_from_slice(&bytes[..n]);
        out.extend_from_slice(&title);
        for v in [
            self.width,
            self.height,
            self.depth,
            self.start_palette.0,
            self.start_cursor_palette.0,
            self.start_room.0,
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        for r in &self.tables {
            out.extend_from_slice(&r.to_bytes());
        }
        out.resize(Self::SIZE, 0);
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        check_len::<Self>(bytes)?;
        let title = &bytes[..TITLE_LEN];
        let end = title.iter().position(|&b| b == 0).unwrap_or(TITLE_LEN);
        let mut tables = SmallVec::new();
        let refs = &bytes[TITLE_LEN + 12..];
        for raw in refs.chunks_exact(TableRef::ENCODED_LEN) {
            let r = TableRef::from_bytes(raw);
            // An all-zero class tag ends the list.
            if r.class == Tag([0; 4]) {
                break;
            }
            tables.push(r);
        }
        Ok(Self {
            title: String::from_utf8_lossy(&title[..end]).into_owned(),
            width: be16(bytes, TITLE_LEN),
            height: be16(bytes, TITLE_LEN + 2),
            depth: be16(bytes, TITLE_LEN + 4),
            start_palette: AssetId(be16(bytes, TITLE_LEN + 6)),
            start_cursor_palette: AssetId(be16(bytes, TITLE_LEN + 8)),
            start_room: AssetId(be16(bytes, TITLE_LEN + 10)),
            tables,
        })
    }
}

// ── Palette ─────────────────────────────────────────────────────

/// Colour registers in a palette.
pub const PALETTE_COLOURS: usize = 256;

/// A range of RGB colour registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    /// First register the palette applies to.
    pub begin: u16,
    /// Last register the palette applies to.
    pub end: u16,
    /// RGB triples for all registers.
    pub colours: Box<[[u8; 3]; PALETTE_COLOURS]>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            begin: 0,
            end: 0,
            colours: Box::new([[0; 3]; PALETTE_COLOURS]),
        }
    }
}

impl Payload for Palette {
    const CLASS: Tag = CT_PALETTE;
    const SIZE: usize = 4 + PALETTE_COLOURS * 3;

    fn encode(&self) -> Result<Vec<u8>, AssetError> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.begin.to_be_bytes());
        out.extend_from_slice(&self.end.to_be_bytes());
        for rgb in self.colours.iter() {
            out.extend_from_slice(rgb);
        }
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        check_len::<Self>(bytes)?;
        let mut colours = Box::new([[0u8; 3]; PALETTE_COLOURS]);
        for (slot, rgb) in colours.iter_mut().zip(bytes[4..].chunks_exact(3)) {
            slot.copy_from_slice(rgb);
        }
        Ok(Self {
            begin: be16(bytes, 0),
            end: be16(bytes, 2),
            colours,
        })
    }
}

// ── Room ────────────────────────────────────────────────────────

/// Backdrop image slots in a room.
pub const ROOM_BACKDROPS: usize = 4;
/// Exits a room can hold.
pub const MAX_ROOM_EXITS: usize = 8;
/// Entities a room can hold.
pub const MAX_ROOM_ENTITIES: usize = 32;

/// Room geometry and contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Room {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Backdrop image ids; unused slots are 0.
    pub backdrops: [AssetId; ROOM_BACKDROPS],
    /// Rooms reachable from this one.
    pub exits: SmallVec<[AssetId; MAX_ROOM_EXITS]>,
    /// Entities placed in the room.
    pub entities: Vec<AssetId>,
}

impl Payload for Room {
    const CLASS: Tag = CT_ROOM;
    const SIZE: usize = 2 * (4 + ROOM_BACKDROPS + MAX_ROOM_EXITS + MAX_ROOM_ENTITIES);

    fn encode(&self) -> Result<Vec<u8>, AssetError> {
        for (len, max) in [
            (self.exits.len(), MAX_ROOM_EXITS),
            (self.entities.len(), MAX_ROOM_ENTITIES),
        ] {
            if len > max {
                return Err(AssetError::SizeMismatch {
                    tag: Some(Self::CLASS),
                    expected: max as u64,
                    actual: len as u64,
                });
            }
        }
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        for id in &self.backdrops {
            out.extend_from_slice(&id.0.to_be_bytes());
        }
        out.extend_from_slice(&(self.exits.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.entities.len() as u16).to_be_bytes());
        let mut exits = [0u16; MAX_ROOM_EXITS];
        for (slot, id) in exits.iter_mut().zip(&self.exits) {
            *slot = id.0;
        }
        let mut entities = [0u16; MAX_ROOM_ENTITIES];
        for (slot, id) in entities.iter_mut().zip(&self.entities) {
            *slot = id.0;
        }
        for v in exits.iter().chain(entities.iter()) {
            out.extend_from_slice(&v.to_be_bytes());
        }
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        check_len::<Self>(bytes)?;
        let mut backdrops = [AssetId::TERMINATOR; ROOM_BACKDROPS];
        for (i, slot) in backdrops.iter_mut().enumerate() {
            *slot = AssetId(be16(bytes, 4 + 2 * i));
        }
        let counts = 4 + 2 * ROOM_BACKDROPS;
        let exit_count = usize::from(be16(bytes, counts)).min(MAX_ROOM_EXITS);
        let entity_count = usize::from(be16(bytes, counts + 2)).min(MAX_ROOM_ENTITIES);
        let exits_at = counts + 4;
        let entities_at = exits_at + 2 * MAX_ROOM_EXITS;
        Ok(Self {
            width: be16(bytes, 0),
            height: be16(bytes, 2),
            backdrops,
            exits: (0..exit_count)
                .map(|i| AssetId(be16(bytes, exits_at + 2 * i)))
                .collect(),
            entities: (0..entity_count)
                .map(|i| AssetId(be16(bytes, entities_at + 2 * i)))
                .collect(),
        })
    }
}

// ── Image ───────────────────────────────────────────────────────

/// Deepest image the planar converter handles.
pub const MAX_IMAGE_DEPTH: u16 = 8;

/// Fixed part of an image payload. The bit-planes follow it in the chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageHeader {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Number of bit-planes.
    pub depth: u16,
    /// Palette the image is drawn with.
    pub palette: AssetId,
    /// Bytes per row of one plane.
    pub bytes_per_row: u16,
    /// Bytes in one plane.
    pub plane_size: u32,
}

impl ImageHeader {
    /// Header for a `width` x `height` image of `depth` planes, with rows
    /// padded to whole bytes.
    pub fn new(width: u16, height: u16, depth: u16, palette: AssetId) -> Self {
        let bytes_per_row = width.div_ceil(8);
        Self {
            width,
            height,
            depth,
            palette,
            bytes_per_row,
            plane_size: u32::from(bytes_per_row) * u32::from(height),
        }
    }

    /// Total bytes of planar data following the header.
    pub fn planar_len(&self) -> u64 {
        u64::from(self.plane_size) * u64::from(self.depth)
    }

    /// Pixels in the image.
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Reject geometry whose rows or planes cannot hold the image.
    pub fn check(&self) -> Result<(), AssetError> {
        let row_bits = usize::from(self.bytes_per_row) * 8;
        let min_plane = u64::from(self.bytes_per_row) * u64::from(self.height);
        if self.depth > MAX_IMAGE_DEPTH
            || row_bits < usize::from(self.width)
            || u64::from(self.plane_size) < min_plane
        {
            return Err(AssetError::MalformedContainer {
                detail: format!(
                    "inconsistent image geometry {}x{}x{} ({} bytes/row, {} bytes/plane)",
                    self.width, self.height, self.depth, self.bytes_per_row, self.plane_size
                ),
            });
        }
        Ok(())
    }
}

impl Payload for ImageHeader {
    const CLASS: Tag = CT_IMAGE;
    const SIZE: usize = 5 * 2 + 4;

    fn encode(&self) -> Result<Vec<u8>, AssetError> {
        let mut out = Vec::with_capacity(Self::SIZE);
        for v in [
            self.width,
            self.height,
            self.depth,
            self.palette.0,
            self.bytes_per_row,
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&self.plane_size.to_be_bytes());
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        check_len::<Self>(bytes)?;
        Ok(Self {
            width: be16(bytes, 0),
            height: be16(bytes, 2),
            depth: be16(bytes, 4),
            palette: AssetId(be16(bytes, 6)),
            bytes_per_row: be16(bytes, 8),
            plane_size: be32(bytes, 10),
        })
    }
}

/// Convert bit-planes to one byte per pixel.
///
/// `planes` holds `depth` planes of `plane_size` bytes each; bit `p` of a
/// pixel comes from plane `p`, most significant bit leftmost.
pub fn planar_to_chunky(header: &ImageHeader, planes: &[u8]) -> Result<Vec<u8>, AssetError> {
    header.check()?;
    if (planes.len() as u64) < header.planar_len() {
        return Err(AssetError::SizeMismatch {
            tag: Some(CT_IMAGE),
            expected: header.planar_len(),
            actual: planes.len() as u64,
        });
    }
    let plane_size = header.plane_size as usize;
    let bpr = usize::from(header.bytes_per_row);
    let width = usize::from(header.width);
    let mut pixels = vec![0u8; header.pixel_count()];
    for plane in 0..usize::from(header.depth) {
        let data = &planes[plane * plane_size..(plane + 1) * plane_size];
        for (y, row) in pixels.chunks_exact_mut(width.max(1)).enumerate() {
            let src = &data[y * bpr..(y + 1) * bpr];
            for (x, px) in row.iter_mut().enumerate() {
                let bit = (src[x / 8] >> (7 - x % 8)) & 1;
                *px |= bit << plane;
            }
        }
    }
    Ok(pixels)
}

/// Convert one byte per pixel back to bit-planes. Bits above `depth` are
/// dropped.
pub fn chunky_to_planar(header: &ImageHeader, pixels: &[u8]) -> Result<Vec<u8>, AssetError> {
    header.check()?;
    if pixels.len() != header.pixel_count() {
        return Err(AssetError::SizeMismatch {
            tag: Some(CT_IMAGE),
            expected: header.pixel_count() as u64,
            actual: pixels.len() as u64,
        });
    }
    let plane_size = header.plane_size as usize;
    let bpr = usize::from(header.bytes_per_row);
    let width = usize::from(header.width);
    let mut planes = vec![0u8; plane_size * usize::from(header.depth)];
    for plane in 0..usize::from(header.depth) {
        let data = &mut planes[plane * plane_size..(plane + 1) * plane_size];
        for (y, row) in pixels.chunks_exact(width.max(1)).enumerate() {
            let dst = &mut data[y * bpr..(y + 1) * bpr];
            for (x, &px) in row.iter().enumerate() {
                if (px >> plane) & 1 == 1 {
                    dst[x / 8] |= 0x80 >> (x % 8);
                }
            }
        }
    }
    Ok(planes)
}
