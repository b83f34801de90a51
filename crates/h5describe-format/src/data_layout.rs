//! HDF5 Data Layout message parsing (message type 0x0008).

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

use crate::bytes::{ensure_len, read_address, read_u16, read_u32, read_uint};
use crate::error::FormatError;

/// How the chunks of a chunked dataset are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkIndex {
    /// Version 1 B-tree (node type 1) rooted at `address`.
    BTreeV1 { address: Option<u64> },
    /// The whole dataset is one chunk.
    SingleChunk {
        address: Option<u64>,
        /// Stored size when the chunk is filtered.
        filtered_size: Option<u64>,
        /// Filters skipped for this chunk.
        filter_mask: u32,
    },
    /// Unfiltered chunks laid out back to back starting at `address`.
    Implicit { address: Option<u64> },
}

/// Parsed HDF5 data layout message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Data stored inline in the message.
    Compact { data: Vec<u8> },
    /// Data stored at a single address in the file.
    Contiguous {
        /// File address of the data, or `None` if never written.
        address: Option<u64>,
        size: u64,
    },
    /// Data stored in equally sized chunks.
    Chunked {
        /// Chunk extent per dataspace dimension (the trailing element-size
        /// dimension of the on-disk encoding is dropped).
        chunk_dimensions: Vec<u64>,
        index: ChunkIndex,
    },
}

impl DataLayout {
    /// Parse a data layout message from raw message bytes.
    ///
    /// `offset_size` and `length_size` come from the superblock.
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }
        let pos = 2;

        match data[1] {
            0 => {
                let size = read_u16(data, pos)? as usize;
                ensure_len(data, pos + 2, size)?;
                Ok(DataLayout::Compact {
                    data: data[pos + 2..pos + 2 + size].to_vec(),
                })
            }
            1 => {
                let address = read_address(data, pos, offset_size)?;
                let size = read_uint(data, pos + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous { address, size })
            }
            2 if version == 3 => Self::chunked_v3(data, pos, offset_size),
            2 => Self::chunked_v4(data, pos, offset_size, length_size),
            3 => Err(FormatError::UnsupportedLayout("virtual dataset".into())),
            class => Err(FormatError::InvalidLayoutClass(class)),
        }
    }

    fn chunked_v3(data: &[u8], pos: usize, offset_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, pos, 1)?;
        let dimensionality = data[pos] as usize;
        let address = read_address(data, pos + 1, offset_size)?;
        let mut p = pos + 1 + offset_size as usize;

        let mut dims = Vec::with_capacity(dimensionality);
        for _ in 0..dimensionality {
            dims.push(read_u32(data, p)? as u64);
            p += 4;
        }
        dims.pop();

        Ok(DataLayout::Chunked {
            chunk_dimensions: dims,
            index: ChunkIndex::BTreeV1 { address },
        })
    }

    fn chunked_v4(
        data: &[u8],
        pos: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<DataLayout, FormatError> {
        ensure_len(data, pos, 3)?;
        let flags = data[pos];
        let dimensionality = data[pos + 1] as usize;
        let width = data[pos + 2];
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(FormatError::UnsupportedLayout(format!(
                "chunk dimension width {width}"
            )));
        }
        let mut p = pos + 3;

        let mut dims = Vec::with_capacity(dimensionality);
        for _ in 0..dimensionality {
            dims.push(read_uint(data, p, width)?);
            p += width as usize;
        }
        dims.pop();

        ensure_len(data, p, 1)?;
        let index_type = data[p];
        p += 1;

        let index = match index_type {
            1 => {
                let (filtered_size, filter_mask) = if flags & 0x02 != 0 {
                    let size = read_uint(data, p, length_size)?;
                    let mask = read_u32(data, p + length_size as usize)?;
                    p += length_size as usize + 4;
                    (Some(size), mask)
                } else {
                    (None, 0)
                };
                ChunkIndex::SingleChunk {
                    address: read_address(data, p, offset_size)?,
                    filtered_size,
                    filter_mask,
                }
            }
            2 => ChunkIndex::Implicit {
                address: read_address(data, p, offset_size)?,
            },
            3 => return Err(FormatError::UnsupportedLayout("fixed array chunk index".into())),
            4 => {
                return Err(FormatError::UnsupportedLayout(
                    "extensible array chunk index".into(),
                ))
            }
            5 => return Err(FormatError::UnsupportedLayout("v2 B-tree chunk index".into())),
            t => return Err(FormatError::UnsupportedLayout(format!("chunk index type {t}"))),
        };

        Ok(DataLayout::Chunked {
            chunk_dimensions: dims,
            index,
        })
    }
}
