//! Symbol table message (0x0011) and symbol table nodes (`SNOD`).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_u16, read_u32, read_uint};
use crate::error::FormatError;

/// Cache type of an entry whose scratch pad holds a soft link value offset.
pub const CACHE_SOFT_LINK: u32 = 2;

/// Size in bytes of one symbol table entry.
pub fn entry_size(offset_size: u8) -> usize {
    2 * offset_size as usize + 4 + 4 + 16
}

/// Where a v1 group keeps its B-tree and name heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTableMessage {
    pub btree_address: u64,
    pub local_heap_address: u64,
}

impl SymbolTableMessage {
    pub fn parse(data: &[u8], offset_size: u8) -> Result<SymbolTableMessage, FormatError> {
        Ok(SymbolTableMessage {
            btree_address: read_uint(data, 0, offset_size)?,
            local_heap_address: read_uint(data, offset_size as usize, offset_size)?,
        })
    }
}

/// One entry of a symbol table node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTableEntry {
    /// Offset of the name in the group's local heap.
    pub link_name_offset: u64,
    pub object_header_address: u64,
    /// 0 = nothing cached, 1 = group, 2 = soft link.
    pub cache_type: u32,
    pub scratch_pad: [u8; 16],
}

impl SymbolTableEntry {
    /// Heap offset of the soft link value, for cache type 2 entries.
    pub fn soft_link_offset(&self) -> Option<u64> {
        (self.cache_type == CACHE_SOFT_LINK).then(|| {
            u32::from_le_bytes([
                self.scratch_pad[0],
                self.scratch_pad[1],
                self.scratch_pad[2],
                self.scratch_pad[3],
            ]) as u64
        })
    }

    fn parse(data: &[u8], pos: usize, offset_size: u8) -> Result<SymbolTableEntry, FormatError> {
        let os = offset_size as usize;
        ensure_len(data, pos, entry_size(offset_size))?;
        let mut scratch_pad = [0u8; 16];
        scratch_pad.copy_from_slice(&data[pos + 2 * os + 8..pos + 2 * os + 24]);
        Ok(SymbolTableEntry {
            link_name_offset: read_uint(data, pos, offset_size)?,
            object_header_address: read_uint(data, pos + os, offset_size)?,
            cache_type: read_u32(data, pos + 2 * os)?,
            scratch_pad,
        })
    }
}

/// A parsed Symbol Table Node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableNode {
    pub entries: Vec<SymbolTableEntry>,
}

impl SymbolTableNode {
    /// Parse a Symbol Table Node at the given offset in the file data.
    pub fn parse(
        file_data: &[u8],
        offset: usize,
        offset_size: u8,
    ) -> Result<SymbolTableNode, FormatError> {
        // signature(4) + version(1) + reserved(1) + number_of_symbols(2)
        ensure_len(file_data, offset, 8)?;
        if &file_data[offset..offset + 4] != b"SNOD" {
            return Err(FormatError::InvalidSymbolTableNodeSignature);
        }
        let version = file_data[offset + 4];
        if version != 1 {
            return Err(FormatError::InvalidSymbolTableNodeVersion(version));
        }
        let count = read_u16(file_data, offset + 6)? as usize;

        let size = entry_size(offset_size);
        let entries = (0..count)
            .map(|i| SymbolTableEntry::parse(file_data, offset + 8 + i * size, offset_size))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SymbolTableNode { entries })
    }
}
