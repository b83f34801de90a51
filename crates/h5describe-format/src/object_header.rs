//! HDF5 Object Header parsing (v1 and v2).
//!
//! Both versions store a sequence of typed messages, optionally spread over
//! continuation blocks. Version 2 headers (`OHDR`) and their continuation
//! chunks (`OCHK`) end in a lookup3 checksum, which is verified here.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_u16, read_u32, read_uint, verify_checksum};
use crate::error::FormatError;
use crate::message_type::MessageType;

/// OHDR signature for v2 object headers.
const OHDR_SIGNATURE: [u8; 4] = *b"OHDR";

/// OCHK signature for v2 continuation chunks.
const OCHK_SIGNATURE: [u8; 4] = *b"OCHK";

/// Message flag: the message is stored in the shared message heap.
pub const MSG_FLAG_SHARED: u8 = 0x02;

/// Message flag: readers must fail when they do not know the type.
pub const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x80;

/// Continuation blocks followed before giving up on a header.
const MAX_CONTINUATIONS: usize = 4096;

/// A single parsed header message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    /// Raw message body.
    pub data: Vec<u8>,
}

/// Parsed HDF5 object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Header version (1 or 2).
    pub version: u8,
    /// All non-NIL, non-continuation messages in file order.
    pub messages: Vec<HeaderMessage>,
}

/// Where a block of messages lives and how it is laid out.
#[derive(Debug, Clone, Copy)]
struct Block {
    start: usize,
    end: usize,
}

struct Walker<'a> {
    data: &'a [u8],
    version: u8,
    creation_order: bool,
    offset_size: u8,
    length_size: u8,
    pending: Vec<Block>,
    followed: usize,
    messages: Vec<HeaderMessage>,
}

impl ObjectHeader {
    /// Parse an object header at the given offset in the data buffer.
    ///
    /// `offset_size` and `length_size` come from the superblock.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 4)?;
        let mut walker = Walker {
            data,
            version: 1,
            creation_order: false,
            offset_size,
            length_size,
            pending: Vec::new(),
            followed: 0,
            messages: Vec::new(),
        };

        let first = if data[offset..offset + 4] == OHDR_SIGNATURE {
            walker.version = 2;
            walker.v2_prefix(offset)?
        } else {
            walker.v1_prefix(offset)?
        };
        walker.pending.push(first);

        while let Some(block) = walker.pending.pop() {
            walker.walk(block)?;
        }

        Ok(ObjectHeader {
            version: walker.version,
            messages: walker.messages,
        })
    }

    /// First message of the given type, if any.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// All messages of the given type, in file order.
    pub fn find_all(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }
}

impl Walker<'_> {
    fn v1_prefix(&self, offset: usize) -> Result<Block, FormatError> {
        // version(1) + reserved(1) + num_messages(2) + ref_count(4) + header_size(4),
        // padded to 16
        ensure_len(self.data, offset, 16)?;
        let version = self.data[offset];
        if version != 1 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let size = read_u32(self.data, offset + 8)? as usize;
        let start = offset + 16;
        ensure_len(self.data, start, size)?;
        Ok(Block {
            start,
            end: start + size,
        })
    }

    fn v2_prefix(&mut self, offset: usize) -> Result<Block, FormatError> {
        ensure_len(self.data, offset, 6)?;
        let version = self.data[offset + 4];
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = self.data[offset + 5];
        self.creation_order = flags & 0x04 != 0;

        let mut pos = offset + 6;
        if flags & 0x20 != 0 {
            // access, modification, change and birth times
            pos += 16;
        }
        if flags & 0x10 != 0 {
            // max compact / min dense attribute counts
            pos += 4;
        }
        let width = 1u8 << (flags & 0x03);
        let chunk0_size = read_uint(self.data, pos, width)? as usize;
        pos += width as usize;

        let end = pos
            .checked_add(chunk0_size)
            .ok_or(FormatError::UnexpectedEof {
                expected: usize::MAX,
                available: self.data.len(),
            })?;
        verify_checksum(self.data, offset, end)?;
        Ok(Block { start: pos, end })
    }

    fn continuation(&mut self, body: &[u8]) -> Result<(), FormatError> {
        self.followed += 1;
        if self.followed > MAX_CONTINUATIONS {
            return Err(FormatError::UnsupportedLayout(
                "object header continuation chain too long".into(),
            ));
        }
        let offset = read_uint(body, 0, self.offset_size)? as usize;
        let length = read_uint(body, self.offset_size as usize, self.length_size)? as usize;
        ensure_len(self.data, offset, length)?;

        let block = if self.version == 1 {
            Block {
                start: offset,
                end: offset + length,
            }
        } else {
            // OCHK + messages + checksum(4)
            if length < 8 || self.data[offset..offset + 4] != OCHK_SIGNATURE {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            let end = offset + length - 4;
            verify_checksum(self.data, offset, end)?;
            Block {
                start: offset + 4,
                end,
            }
        };
        self.pending.push(block);
        Ok(())
    }

    fn walk(&mut self, block: Block) -> Result<(), FormatError> {
        let header_len = match (self.version, self.creation_order) {
            (1, _) => 8,
            (_, true) => 6,
            (_, false) => 4,
        };
        let mut pos = block.start;

        // Trailing bytes shorter than a message header are padding.
        while pos + header_len <= block.end {
            let (raw_type, size, flags) = if self.version == 1 {
                (
                    read_u16(self.data, pos)?,
                    read_u16(self.data, pos + 2)? as usize,
                    self.data[pos + 4],
                )
            } else {
                (
                    self.data[pos] as u16,
                    read_u16(self.data, pos + 1)? as usize,
                    self.data[pos + 3],
                )
            };
            pos += header_len;

            if pos + size > block.end {
                return Err(FormatError::UnexpectedEof {
                    expected: pos + size,
                    available: block.end,
                });
            }
            let body = &self.data[pos..pos + size];
            pos += size;

            match MessageType::from(raw_type) {
                MessageType::Nil => {}
                MessageType::ObjectHeaderContinuation => self.continuation(body)?,
                MessageType::Other(id) if flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                    return Err(FormatError::UnsupportedMessage(id));
                }
                msg_type => self.messages.push(HeaderMessage {
                    msg_type,
                    flags,
                    data: body.to_vec(),
                }),
            }
        }
        Ok(())
    }
}
