//! Loaded assets: the in-arena header and the handle returned to callers.
//!
//! A loaded asset occupies one arena allocation laid out as
//!
//! ```text
//! [id u16] [class tag: 4 bytes] [arch mask u16] [payload ...]
//! ```
//!
//! with every integer big-endian. [`AssetHandle`] names the whole
//! allocation and knows where the payload starts.

use std::fmt;

use plume_arena::Allocation;
use plume_core::{ArchFlags, AssetId, Tag};

/// Size of the header written in front of every payload.
pub const ASSET_HEADER_LEN: usize = 8;

/// The header stored ahead of a payload in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetHeader {
    /// Asset id within its class.
    pub id: AssetId,
    /// Class type tag.
    pub class: Tag,
    /// Arch mask the asset was requested with.
    pub arch: ArchFlags,
}

impl AssetHeader {
    /// Encode to the in-arena representation.
    pub fn to_bytes(self) -> [u8; ASSET_HEADER_LEN] {
        let mut out = [0u8; ASSET_HEADER_LEN];
        out[0..2].copy_from_slice(&self.id.0.to_be_bytes());
        out[2..6].copy_from_slice(&self.class.bytes());
        out[6..8].copy_from_slice(&self.arch.bits().to_be_bytes());
        out
    }

    /// Decode from the in-arena representation.
    pub fn from_bytes(b: &[u8; ASSET_HEADER_LEN]) -> Self {
        Self {
            id: AssetId(u16::from_be_bytes([b[0], b[1]])),
            class: Tag([b[2], b[3], b[4], b[5]]),
            arch: ArchFlags(u16::from_be_bytes([b[6], b[7]])),
        }
    }
}

/// A loaded asset.
///
/// Valid until the owning arena is rolled back; resolving it afterwards
/// fails with [`AssetError::StaleHandle`](crate::AssetError::StaleHandle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    alloc: Allocation,
    payload_len: u32,
}

impl AssetHandle {
    pub(crate) fn new(alloc: Allocation, payload_len: u32) -> Self {
        Self { alloc, payload_len }
    }

    /// The full allocation: header, payload and alignment slack.
    pub fn allocation(&self) -> Allocation {
        self.alloc
    }

    /// Just the header bytes.
    pub fn header_allocation(&self) -> Allocation {
        self.alloc
            .slice(0, ASSET_HEADER_LEN as u32)
            .unwrap_or(self.alloc)
    }

    /// Just the payload bytes.
    pub fn payload_allocation(&self) -> Allocation {
        self.alloc
            .slice(ASSET_HEADER_LEN as u32, self.payload_len)
            .unwrap_or(self.alloc)
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset@{}+{}", self.alloc.offset(), self.payload_len)
    }
}
