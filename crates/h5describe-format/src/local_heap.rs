//! Local heaps (`HEAP`).
//!
//! Symbol-table groups keep their link names (and soft link values) as
//! NUL-terminated strings in a local heap.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::bytes::{ensure_len, read_uint};
use crate::error::FormatError;

const HEAP_MAGIC: &[u8; 4] = b"HEAP";

/// A local heap's data segment, borrowed from the file image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeap<'a> {
    pub segment_address: u64,
    segment: &'a [u8],
}

impl<'a> LocalHeap<'a> {
    /// Locate the heap whose header starts at `at` and borrow its segment.
    ///
    /// Header layout: magic, version, 3 reserved bytes, segment size,
    /// free-list head, segment address.
    pub fn parse(
        data: &'a [u8],
        at: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<Self, FormatError> {
        let ls = length_size as usize;
        ensure_len(data, at, 8 + 2 * ls + offset_size as usize)?;
        match (&data[at..at + 4], data[at + 4]) {
            (magic, _) if magic != HEAP_MAGIC => return Err(FormatError::InvalidLocalHeapSignature),
            (_, 0) => {}
            (_, v) => return Err(FormatError::InvalidLocalHeapVersion(v)),
        }

        let segment_size = read_uint(data, at + 8, length_size)? as usize;
        let segment_address = read_uint(data, at + 8 + 2 * ls, offset_size)?;
        ensure_len(data, segment_address as usize, segment_size)?;
        let start = segment_address as usize;
        Ok(LocalHeap {
            segment_address,
            segment: &data[start..start + segment_size],
        })
    }

    pub fn len(&self) -> usize {
        self.segment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
    }

    /// The NUL-terminated string stored at `offset` in the segment.
    pub fn name(&self, offset: u64) -> Result<String, FormatError> {
        let eof = |expected| FormatError::UnexpectedEof {
            expected,
            available: self.segment.len(),
        };
        let start = offset as usize;
        let tail = self.segment.get(start..).ok_or_else(|| eof(start + 1))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| eof(self.segment.len() + 1))?;
        core::str::from_utf8(&tail[..end])
            .map(String::from)
            .map_err(|_| FormatError::InvalidUtf8)
    }
}
