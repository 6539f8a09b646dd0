//! The asset factory registry.
//!
//! Every loadable class is a variant of [`AssetClass`]. Each variant knows
//! its tag, its fixed payload size (if any), whether it has an object
//! table, and the optional construct/destruct hooks run on load and unload.

use std::fmt;

use tracing::trace;

use plume_core::tag::{CT_ENTITY, CT_GAME_INFO, CT_IMAGE, CT_PALETTE, CT_ROOM};
use plume_core::{ArchFlags, Tag};

use crate::archive::ArchiveReader;
use crate::error::AssetError;
use crate::payload::{planar_to_chunky, GameInfo, ImageHeader, Palette, Payload, Room};

/// Runs after the fixed payload has been copied into the arena.
///
/// Receives the chunk's flags, the payload bytes and the reader positioned
/// just past them. Whatever it returns is kept outside the arena until the
/// asset is unloaded.
pub type ConstructHook =
    fn(ArchFlags, &[u8], &mut ArchiveReader<'_>) -> Result<Vec<u8>, AssetError>;

/// Runs on unload with the payload and the data its construct hook made.
pub type DestructHook = fn(&[u8], Vec<u8>);

/// A loadable asset class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetClass {
    /// Game metadata. Singleton, no table.
    GameInfo,
    /// Colour palette.
    Palette,
    /// Room geometry.
    Room,
    /// Planar image, converted to chunky pixels on load.
    Image,
    /// Variable-size entity record.
    Entity,
}

impl AssetClass {
    /// Every registered class.
    pub const ALL: [Self; 5] = [
        Self::GameInfo,
        Self::Palette,
        Self::Room,
        Self::Image,
        Self::Entity,
    ];

    /// Resolve a class by tag.
    pub fn find(tag: Tag) -> Result<Self, AssetError> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.tag() == tag)
            .ok_or(AssetError::UnknownClass { tag })
    }

    /// The class's chunk tag.
    pub fn tag(self) -> Tag {
        match self {
            Self::GameInfo => CT_GAME_INFO,
            Self::Palette => CT_PALETTE,
            Self::Room => CT_ROOM,
            Self::Image => CT_IMAGE,
            Self::Entity => CT_ENTITY,
        }
    }

    /// Fixed payload size, or `None` when the whole chunk is the payload.
    pub fn payload_size(self) -> Option<usize> {
        match self {
            Self::GameInfo => Some(GameInfo::SIZE),
            Self::Palette => Some(Palette::SIZE),
            Self::Room => Some(Room::SIZE),
            Self::Image => Some(ImageHeader::SIZE),
            Self::Entity => None,
        }
    }

    /// Whether ids of this class are indexed by an object table.
    pub fn has_table(self) -> bool {
        !matches!(self, Self::GameInfo)
    }

    /// Hook run after load.
    pub fn construct(self) -> Option<ConstructHook> {
        match self {
            Self::Image => Some(unpack_image),
            _ => None,
        }
    }

    /// Hook run before unload.
    pub fn destruct(self) -> Option<DestructHook> {
        match self {
            Self::Image => Some(release_image),
            _ => None,
        }
    }

    /// Check a chunk's declared payload size (excluding its header)
    /// against the class.
    ///
    /// Without a construct hook a fixed-size class must match exactly; with
    /// one, trailing data after the fixed part is allowed.
    pub fn check_size(self, declared: u64) -> Result<(), AssetError> {
        let Some(fixed) = self.payload_size() else {
            return Ok(());
        };
        let fixed = fixed as u64;
        let ok = if self.construct().is_some() {
            declared >= fixed
        } else {
            declared == fixed
        };
        if ok {
            Ok(())
        } else {
            Err(AssetError::SizeMismatch {
                tag: Some(self.tag()),
                expected: fixed,
                actual: declared,
            })
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

fn unpack_image(
    flags: ArchFlags,
    payload: &[u8],
    reader: &mut ArchiveReader<'_>,
) -> Result<Vec<u8>, AssetError> {
    let header = ImageHeader::decode(payload)?;
    header.check()?;
    if !flags.contains(ArchFlags::HAS_DATA) {
        return Ok(vec![0; header.pixel_count()]);
    }
    let planar_len = header.planar_len();
    if reader.remaining() < planar_len {
        return Err(AssetError::SizeMismatch {
            tag: Some(CT_IMAGE),
            expected: planar_len,
            actual: reader.remaining(),
        });
    }
    let mut planes = vec![0u8; planar_len as usize];
    reader.read_bytes(&mut planes)?;
    planar_to_chunky(&header, &planes)
}

fn release_image(_payload: &[u8], pixels: Vec<u8>) {
    trace!(bytes = pixels.len(), "image pixels released");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_is_found_by_its_tag() {
        for class in AssetClass::ALL {
            assert_eq!(AssetClass::find(class.tag()).unwrap(), class);
        }
    }

    #[test]
    fn unknown_tag_is_unknown_class() {
        let err = AssetClass::find(Tag::new(b"NOPE")).unwrap_err();
        assert!(matches!(err, AssetError::UnknownClass { tag } if tag == Tag::new(b"NOPE")));
    }

    #[test]
    fn only_game_info_lacks_a_table() {
        let without: Vec<_> = AssetClass::ALL
            .iter()
            .filter(|c| !c.has_table())
            .collect();
        assert_eq!(without, vec![&AssetClass::GameInfo]);
    }

    #[test]
    fn only_images_have_hooks() {
        for class in AssetClass::ALL {
            let hooked = class == AssetClass::Image;
            assert_eq!(class.construct().is_some(), hooked);
            assert_eq!(class.destruct().is_some(), hooked);
        }
    }

    fn run_unpack(flags: ArchFlags, header: &ImageHeader) -> Result<Vec<u8>, AssetError> {
        let payload = header.encode().unwrap();
        let mut cursor = std::io::Cursor::new(Vec::new());
        let stream: &mut dyn plume_core::ReadStream = &mut cursor;
        let mut reader = ArchiveReader::open(stream).unwrap();
        unpack_image(flags, &payload, &mut reader)
    }

    #[test]
    fn image_without_data_gets_blank_pixels() {
        let header = ImageHeader::new(12, 3, 4, plume_core::AssetId(1));
        let pixels = run_unpack(ArchFlags::ANY, &header).unwrap();
        assert_eq!(pixels, vec![0; 36]);
    }

    #[test]
    fn inconsistent_geometry_is_rejected_without_data() {
        let header = ImageHeader {
            width: u16::MAX,
            height: u16::MAX,
            depth: 99,
            bytes_per_row: 0,
            plane_size: 0,
            ..ImageHeader::new(8, 1, 1, plume_core::AssetId(1))
        };
        assert!(matches!(
            run_unpack(ArchFlags::ANY, &header),
            Err(AssetError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn size_rules_per_class() {
        assert!(AssetClass::Palette.check_size(772).is_ok());
        assert!(matches!(
            AssetClass::Palette.check_size(770),
            Err(AssetError::SizeMismatch { expected: 772, actual: 770, .. })
        ));
        // Trailing planes are allowed after an image header.
        assert!(AssetClass::Image.check_size(14 + 40).is_ok());
        assert!(AssetClass::Image.check_size(10).is_err());
        assert!(AssetClass::Entity.check_size(3).is_ok());
    }
}
