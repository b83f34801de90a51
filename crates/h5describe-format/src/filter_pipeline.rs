//! HDF5 Filter Pipeline message parsing (message type 0x000B).

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::bytes::{ensure_len, read_u16, read_u32};
use crate::error::FormatError;

/// Well-known filter IDs.
pub const FILTER_DEFLATE: u16 = 1;
pub const FILTER_SHUFFLE: u16 = 2;
pub const FILTER_FLETCHER32: u16 = 3;
/// Registered third-party filter used by detector writers.
pub const FILTER_LZ4: u16 = 32004;
pub const FILTER_BITSHUFFLE: u16 = 32008;

/// Filter flag: the filter may be skipped when it fails.
pub const FILTER_FLAG_OPTIONAL: u16 = 0x0001;

/// Description of a single filter in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescription {
    pub filter_id: u16,
    /// Optional filter name as stored in the file.
    pub name: Option<String>,
    pub flags: u16,
    /// Client data values passed to the filter.
    pub client_data: Vec<u32>,
}

/// A filter pipeline, in the order filters were applied on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPipeline {
    pub version: u8,
    pub filters: Vec<FilterDescription>,
}

fn name_from(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).ok().map(String::from)
}

impl FilterPipeline {
    /// Parse a filter pipeline message from raw message bytes.
    pub fn parse(data: &[u8]) -> Result<FilterPipeline, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        let count = data[1] as usize;

        // v1 has six reserved bytes after the count
        let mut pos = match version {
            1 => 8,
            2 => 2,
            v => return Err(FormatError::InvalidFilterPipelineVersion(v)),
        };
        ensure_len(data, 0, pos)?;

        let mut filters = Vec::with_capacity(count);
        for _ in 0..count {
            let filter_id = read_u16(data, pos)?;
            pos += 2;

            // v2 omits the name length for library-defined filters
            let name_len = if version == 1 || filter_id >= 256 {
                let n = read_u16(data, pos)? as usize;
                pos += 2;
                n
            } else {
                0
            };
            let flags = read_u16(data, pos)?;
            let num_values = read_u16(data, pos + 2)? as usize;
            pos += 4;

            let name = if name_len > 0 {
                ensure_len(data, pos, name_len)?;
                let name = name_from(&data[pos..pos + name_len]);
                // v1 pads names to a multiple of eight
                pos += if version == 1 {
                    (name_len + 7) & !7
                } else {
                    name_len
                };
                name
            } else {
                None
            };

            let mut client_data = Vec::with_capacity(num_values);
            for _ in 0..num_values {
                client_data.push(read_u32(data, pos)?);
                pos += 4;
            }
            if version == 1 && num_values % 2 == 1 {
                pos += 4;
            }

            filters.push(FilterDescription {
                filter_id,
                name,
                flags,
                client_data,
            });
        }

        Ok(FilterPipeline { version, filters })
    }
}
