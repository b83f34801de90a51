//! HDF5 Link message parsing (message type 0x0006).

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::bytes::{ensure_len, read_u16, read_uint};
use crate::error::FormatError;

/// Link type code of external links.
pub const LINK_TYPE_EXTERNAL: u8 = 64;

/// What a link points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Object header address in this file.
    Hard(u64),
    /// Path in this file, absolute or relative to the link's group.
    Soft(String),
    /// Object `path` in another file named `file`.
    External { file: String, path: String },
}

/// A parsed HDF5 Link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub name: String,
    pub target: LinkTarget,
    /// Creation order, if tracked.
    pub creation_order: Option<u64>,
}

fn utf8(bytes: &[u8]) -> Result<String, FormatError> {
    core::str::from_utf8(bytes)
        .map(String::from)
        .map_err(|_| FormatError::InvalidUtf8)
}

fn split_nul(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == 0) {
        Some(i) => (&bytes[..i], &bytes[i + 1..]),
        None => (bytes, &[]),
    }
}

impl LinkMessage {
    /// Parse a Link message from raw message data.
    ///
    /// `offset_size` is needed for hard link target addresses.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if version != 1 {
            return Err(FormatError::InvalidLinkVersion(version));
        }
        let flags = data[1];
        let mut pos = 2;

        let link_type = if flags & 0x08 != 0 {
            ensure_len(data, pos, 1)?;
            pos += 1;
            data[pos - 1]
        } else {
            0
        };
        let creation_order = if flags & 0x04 != 0 {
            let co = read_uint(data, pos, 8)?;
            pos += 8;
            Some(co)
        } else {
            None
        };
        if flags & 0x10 != 0 {
            // name character set; both ASCII and UTF-8 decode as UTF-8
            pos += 1;
        }

        let width = 1u8 << (flags & 0x03);
        let name_len = read_uint(data, pos, width)? as usize;
        pos += width as usize;
        ensure_len(data, pos, name_len)?;
        let name = utf8(&data[pos..pos + name_len])?;
        pos += name_len;

        let target = match link_type {
            0 => LinkTarget::Hard(read_uint(data, pos, offset_size)?),
            1 | LINK_TYPE_EXTERNAL => {
                let len = read_u16(data, pos)? as usize;
                pos += 2;
                ensure_len(data, pos, len)?;
                let value = &data[pos..pos + len];
                if link_type == 1 {
                    LinkTarget::Soft(utf8(split_nul(value).0)?)
                } else {
                    // version/flags byte, then two NUL-terminated strings
                    let (file, rest) = split_nul(value.get(1..).unwrap_or(&[]));
                    let (path, _) = split_nul(rest);
                    LinkTarget::External {
                        file: utf8(file)?,
                        path: utf8(path)?,
                    }
                }
            }
            other => return Err(FormatError::InvalidLinkType(other)),
        };

        Ok(LinkMessage {
            name,
            target,
            creation_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(flags: u8, link_type: Option<u8>, name: &str, value: &[u8]) -> Vec<u8> {
        let mut buf = vec![1, flags];
        if let Some(t) = link_type {
            buf.push(t);
        }
        if flags & 0x04 != 0 {
            buf.extend_from_slice(&7u64.to_le_bytes());
        }
        if flags & 0x10 != 0 {
            buf.push(1);
        }
        match flags & 0x03 {
            0 => buf.push(name.len() as u8),
            1 => buf.extend_from_slice(&(name.len() as u16).to_le_bytes()),
            _ => buf.extend_from_slice(&(name.len() as u32).to_le_bytes()),
        }
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(value);
        buf
    }

    #[test]
    fn hard_link() {
        let data = link(0x00, None, "entry", &0x1234u64.to_le_bytes());
        let msg = LinkMessage::parse(&data, 8).unwrap();
        assert_eq!(msg.name, "entry");
        assert_eq!(msg.target, LinkTarget::Hard(0x1234));
        assert_eq!(msg.creation_order, None);
    }

    #[test]
    fn hard_link_with_order_and_charset() {
        let data = link(0x15, None, "data", &0x40u32.to_le_bytes());
        let msg = LinkMessage::parse(&data, 4).unwrap();
        assert_eq!(msg.name, "data");
        assert_eq!(msg.creation_order, Some(7));
        assert_eq!(msg.target, LinkTarget::Hard(0x40));
    }

    #[test]
    fn soft_link() {
        let mut value = 13u16.to_le_bytes().to_vec();
        value.extend_from_slice(b"/entry/data/x");
        let data = link(0x08, Some(1), "alias", &value);
        let msg = LinkMessage::parse(&data, 8).unwrap();
        assert_eq!(msg.target, LinkTarget::Soft("/entry/data/x".into()));
    }

    #[test]
    fn external_link() {
        let body = b"\0scan_data_000001.h5\0/entry/data/data\0";
        let mut value = (body.len() as u16).to_le_bytes().to_vec();
        value.extend_from_slice(body);
        let data = link(0x08, Some(LINK_TYPE_EXTERNAL), "data_000001", &value);
        let msg = LinkMessage::parse(&data, 8).unwrap();
        assert_eq!(msg.name, "data_000001");
        assert_eq!(
            msg.target,
            LinkTarget::External {
                file: "scan_data_000001.h5".into(),
                path: "/entry/data/data".into(),
            }
        );
    }

    #[test]
    fn invalid_version_and_type() {
        let mut data = link(0x08, Some(5), "x", &[]);
        assert_eq!(LinkMessage::parse(&data, 8), Err(FormatError::InvalidLinkType(5)));
        data[0] = 2;
        assert_eq!(LinkMessage::parse(&data, 8), Err(FormatError::InvalidLinkVersion(2)));
    }

    #[test]
    fn invalid_name_bytes() {
        let mut data = link(0x00, None, "ab", &0u64.to_le_bytes());
        data[3] = 0xFF;
        assert_eq!(LinkMessage::parse(&data, 8), Err(FormatError::InvalidUtf8));
    }
}
