//! The fixed header that prefixes every content chunk payload.

use crate::flags::ArchFlags;
use crate::id::AssetId;

/// In-class id and capability flags, stored big-endian at the start of
/// every content chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Id of the asset within its class.
    pub id: AssetId,
    /// Capability / architecture flags.
    pub flags: ArchFlags,
}

impl ChunkHeader {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 4;

    /// Create a header.
    pub fn new(id: AssetId, flags: ArchFlags) -> Self {
        Self { id, flags }
    }

    /// Encode to the on-disk representation.
    pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let id = self.id.0.to_be_bytes();
        let flags = self.flags.0.to_be_bytes();
        [id[0], id[1], flags[0], flags[1]]
    }

    /// Decode from the on-disk representation.
    pub fn from_bytes(b: [u8; Self::ENCODED_LEN]) -> Self {
        Self {
            id: AssetId(u16::from_be_bytes([b[0], b[1]])),
            flags: ArchFlags(u16::from_be_bytes([b[2], b[3]])),
        }
    }

    /// Whether this header answers a request for `id` under `mask`.
    pub fn matches(self, id: AssetId, mask: ArchFlags) -> bool {
        self.id == id && self.flags.intersects(mask)
    }
}
