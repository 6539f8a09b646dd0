//! Four-character chunk tags and the asset class constants.

use std::fmt;

/// A four-character code identifying a chunk or an asset class.
///
/// Tags compare byte-wise. A valid tag consists of printable ASCII
/// (`0x20..=0x7E`) and does not start with a space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Build a tag from a four-byte literal.
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// Raw bytes of the tag.
    pub const fn bytes(self) -> [u8; 4] {
        self.0
    }

    /// Whether the tag is well-formed.
    pub fn is_valid(self) -> bool {
        self.0[0] != b' ' && self.0.iter().all(|b| (0x20..=0x7E).contains(b))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| (0x20..=0x7E).contains(b)) {
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "{:#010x}", u32::from_be_bytes(self.0))
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl From<[u8; 4]> for Tag {
    fn from(v: [u8; 4]) -> Self {
        Self(v)
    }
}

// ── Class types ────────────────────────────────────────────────

/// Game metadata: title, geometry, start ids and the table references.
pub const CT_GAME_INFO: Tag = Tag::new(b"GAME");
/// Colour palette.
pub const CT_PALETTE: Tag = Tag::new(b"PALT");
/// Room description.
pub const CT_ROOM: Tag = Tag::new(b"ROOM");
/// Bitmap image with trailing plane data.
pub const CT_IMAGE: Tag = Tag::new(b"IMGE");
/// Variable-size room entity.
pub const CT_ENTITY: Tag = Tag::new(b"ENTY");
/// A persisted object table.
pub const CT_TABLE: Tag = Tag::new(b"TABL");
