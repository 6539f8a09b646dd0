//! Primitive big-endian encoders and the group tag set.

use std::io::{self, Read, Write};

use plume_core::Tag;

use crate::error::ContainerError;

/// Group chunk holding one typed form.
pub const GROUP_FORM: Tag = Tag::new(b"FORM");
/// Group chunk holding a list of forms.
pub const GROUP_LIST: Tag = Tag::new(b"LIST");
/// Group chunk holding an untyped concatenation.
pub const GROUP_CAT: Tag = Tag::new(b"CAT ");

/// Form kind of a Plume archive's outer group.
pub const ARCHIVE_KIND: Tag = Tag::new(b"PLUM");

/// Whether `tag` opens a group chunk.
pub fn is_group_tag(tag: Tag) -> bool {
    tag == GROUP_FORM || tag == GROUP_LIST || tag == GROUP_CAT
}

// ── Primitive writers ───────────────────────────────────────────

/// Write a four-character tag.
pub fn write_tag(w: &mut dyn Write, tag: Tag) -> Result<(), ContainerError> {
    w.write_all(&tag.bytes())?;
    Ok(())
}

/// Write a big-endian u32.
pub fn write_u32_be(w: &mut dyn Write, v: u32) -> Result<(), ContainerError> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

/// Write a big-endian u16.
pub fn write_u16_be(w: &mut dyn Write, v: u16) -> Result<(), ContainerError> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a four-character tag.
pub fn read_tag(r: &mut dyn Read) -> Result<Tag, ContainerError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(Tag(buf))
}

/// Read a big-endian u32.
pub fn read_u32_be(r: &mut dyn Read) -> Result<u32, ContainerError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read a big-endian u16.
pub fn read_u16_be(r: &mut dyn Read) -> Result<u16, ContainerError> {
    let mut buf = [0u8; 2];
    read_exact(r, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

/// `read_exact` that reports a short stream as a malformed container.
pub fn read_exact(r: &mut dyn Read, buf: &mut [u8]) -> Result<(), ContainerError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ContainerError::malformed(format!("stream ended {} bytes short", buf.len()))
        } else {
            ContainerError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_tags_are_recognised() {
        assert!(is_group_tag(GROUP_FORM));
        assert!(is_group_tag(GROUP_LIST));
        assert!(is_group_tag(GROUP_CAT));
        assert!(!is_group_tag(ARCHIVE_KIND));
    }

    #[test]
    fn integers_are_big_endian() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x0102_0304).unwrap();
        write_u16_be(&mut buf, 0x0506).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);

        let mut r = buf.as_slice();
        assert_eq!(read_u32_be(&mut r).unwrap(), 0x0102_0304);
        assert_eq!(read_u16_be(&mut r).unwrap(), 0x0506);
    }

    #[test]
    fn short_read_is_malformed() {
        let mut r: &[u8] = &[1, 2];
        assert!(matches!(
            read_u32_be(&mut r),
            Err(ContainerError::Malformed { .. })
        ));
    }
}
