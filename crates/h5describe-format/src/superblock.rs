//! Superblock parsing, versions 0 through 3.
//!
//! Only what a reader needs to find the root group is kept: the field
//! widths, the base and end-of-file addresses and the root object header.

use crate::bytes::{ensure_len, read_u16, read_u32, read_uint, verify_checksum};
use crate::error::FormatError;
use crate::signature::HDF5_SIGNATURE;

/// Parsed superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub version: u8,
    /// Width of file addresses in bytes.
    pub offset_size: u8,
    /// Width of length fields in bytes.
    pub length_size: u8,
    /// Absolute position that all other addresses are relative to.
    pub base_address: u64,
    pub eof_address: u64,
    /// Object header address of the root group.
    pub root_group_address: u64,
    pub consistency_flags: u32,
    /// Group B-tree leaf and internal node K (v0/v1 only).
    pub group_btree_k: Option<(u16, u16)>,
    /// Stored lookup3 checksum (v2/v3 only), already verified.
    pub checksum: Option<u32>,
}

/// Sequential reader over the superblock's variable-width fields.
struct Fields<'a> {
    data: &'a [u8],
    pos: usize,
    offset_size: u8,
}

impl Fields<'_> {
    fn address(&mut self) -> Result<u64, FormatError> {
        let v = read_uint(self.data, self.pos, self.offset_size)?;
        self.pos += self.offset_size as usize;
        Ok(v)
    }

    fn skip_address(&mut self) {
        self.pos += self.offset_size as usize;
    }
}

fn check_width(size: u8, err: fn(u8) -> FormatError) -> Result<u8, FormatError> {
    match size {
        2 | 4 | 8 => Ok(size),
        other => Err(err(other)),
    }
}

impl Superblock {
    /// Parse the superblock whose signature starts at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, signature_offset, HDF5_SIGNATURE.len() + 1)?;
        let d = &data[signature_offset..];
        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }
        match d[8] {
            v @ (0 | 1) => Self::parse_legacy(d, v),
            v @ (2 | 3) => Self::parse_compact(d, v),
            v => Err(FormatError::UnsupportedVersion(v)),
        }
    }

    /// Versions 0 and 1: free-space, root-group and shared-header version
    /// bytes, the sizes, the group K values, then four addresses and the
    /// root symbol table entry.
    fn parse_legacy(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        // v1 inserts the indexed storage K and two reserved bytes before the flags
        let prefix = if version == 0 { 24 } else { 28 };
        ensure_len(d, 0, prefix)?;
        let offset_size = check_width(d[13], FormatError::InvalidOffsetSize)?;
        let length_size = check_width(d[14], FormatError::InvalidLengthSize)?;
        let leaf_k = read_u16(d, 16)?;
        let internal_k = read_u16(d, 18)?;
        let consistency_flags = read_u32(d, prefix - 4)?;

        // base, free space, eof, driver + entry (name, header, cache, reserved, scratch)
        let os = offset_size as usize;
        ensure_len(d, prefix, 6 * os + 24)?;
        let mut f = Fields {
            data: d,
            pos: prefix,
            offset_size,
        };
        let base_address = f.address()?;
        f.skip_address();
        let eof_address = f.address()?;
        f.skip_address();
        f.skip_address();
        let root_group_address = f.address()?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            consistency_flags,
            group_btree_k: Some((leaf_k, internal_k)),
            checksum: None,
        })
    }

    /// Versions 2 and 3: sizes and flags in three bytes, four addresses,
    /// then a lookup3 checksum over everything before it.
    fn parse_compact(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        ensure_len(d, 0, 12)?;
        let offset_size = check_width(d[9], FormatError::InvalidOffsetSize)?;
        let length_size = check_width(d[10], FormatError::InvalidLengthSize)?;

        let mut f = Fields {
            data: d,
            pos: 12,
            offset_size,
        };
        let base_address = f.address()?;
        // superblock extension
        f.skip_address();
        let eof_address = f.address()?;
        let root_group_address = f.address()?;

        verify_checksum(d, 0, f.pos)?;
        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            consistency_flags: u32::from(d[11]),
            group_btree_k: None,
            checksum: Some(read_u32(d, f.pos)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::lookup3;

    fn push_sized(buf: &mut Vec<u8>, value: u64, width: u8) {
        buf.extend_from_slice(&value.to_le_bytes()[..width as usize]);
    }

    /// A superblock with eof 4096 and the root group at 96.
    fn image(version: u8, os: u8) -> Vec<u8> {
        let mut buf = HDF5_SIGNATURE.to_vec();
        if version < 2 {
            buf.extend_from_slice(&[version, 0, 0, 0, 0, os, os, 0]);
            buf.extend_from_slice(&[4, 0, 16, 0]);
            if version == 1 {
                buf.extend_from_slice(&[32, 0, 0, 0]);
            }
            buf.extend_from_slice(&[3, 0, 0, 0]);
            for addr in [0, u64::MAX, 4096, u64::MAX, 0, 96] {
                push_sized(&mut buf, addr, os);
            }
            buf.extend_from_slice(&[0; 24]);
        } else {
            buf.extend_from_slice(&[version, os, os, 1]);
            for addr in [0, u64::MAX, 4096, 96] {
                push_sized(&mut buf, addr, os);
            }
            let sum = lookup3(&buf);
            buf.extend_from_slice(&sum.to_le_bytes());
        }
        buf
    }

    #[test]
    fn every_version_finds_the_root() {
        for version in 0..=3 {
            for os in [4, 8] {
                let sb = Superblock::parse(&image(version, os), 0).unwrap();
                assert_eq!(sb.version, version);
                assert_eq!(sb.offset_size, os);
                assert_eq!(sb.eof_address, 4096);
                assert_eq!(sb.root_group_address, 96);
                assert_eq!(sb.base_address, 0);
            }
        }
    }

    #[test]
    fn legacy_fields() {
        let sb = Superblock::parse(&image(1, 8), 0).unwrap();
        assert_eq!(sb.group_btree_k, Some((4, 16)));
        assert_eq!(sb.consistency_flags, 3);
        assert_eq!(sb.checksum, None);
        assert_eq!(image(0, 8).len(), 96);
    }

    #[test]
    fn compact_checksum_is_checked() {
        let mut data = image(2, 8);
        assert_eq!(data.len(), 48);
        let sb = Superblock::parse(&data, 0).unwrap();
        assert_eq!(sb.checksum, Some(lookup3(&data[..44])));
        assert_eq!(sb.consistency_flags, 1);

        data[20] ^= 0x01;
        assert!(matches!(
            Superblock::parse(&data, 0),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn behind_a_user_block() {
        let mut data = vec![0xAB; 512];
        data.extend_from_slice(&image(0, 8));
        assert_eq!(Superblock::parse(&data, 512).unwrap().root_group_address, 96);
        assert_eq!(
            Superblock::parse(&data, 0),
            Err(FormatError::SignatureNotFound)
        );
    }

    #[test]
    fn rejects_bad_versions_and_widths() {
        let mut data = image(0, 8);
        data[8] = 7;
        assert_eq!(Superblock::parse(&data, 0), Err(FormatError::UnsupportedVersion(7)));

        let mut data = image(0, 8);
        data[13] = 3;
        assert_eq!(Superblock::parse(&data, 0), Err(FormatError::InvalidOffsetSize(3)));
        data[13] = 8;
        data[14] = 16;
        assert_eq!(Superblock::parse(&data, 0), Err(FormatError::InvalidLengthSize(16)));
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            Superblock::parse(&HDF5_SIGNATURE, 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
        let data = image(0, 8);
        assert!(matches!(
            Superblock::parse(&data[..60], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
        let data = image(3, 8);
        assert!(matches!(
            Superblock::parse(&data[..40], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
