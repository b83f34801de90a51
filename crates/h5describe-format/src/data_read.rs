//! Raw data reading for HDF5 datasets.
//!
//! The result is the dataset's element bytes in row-major order, exactly
//! as stored after filters are undone. No type conversion is performed.

#[cfg(not(feature = "std"))]
use alloc::{format, vec, vec::Vec};

use crate::bytes::{array_bytes, ensure_len};
use crate::chunked_read::{read_chunked, ChunkGeometry};
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::filter_pipeline::FilterPipeline;
use crate::message_type::MessageType;
use crate::object_header::{ObjectHeader, MSG_FLAG_SHARED};

/// The messages that describe a dataset's storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub dataspace: Dataspace,
    pub datatype: Datatype,
    pub layout: DataLayout,
    pub pipeline: Option<FilterPipeline>,
}

fn required<'a>(
    header: &'a ObjectHeader,
    msg_type: MessageType,
) -> Result<&'a [u8], FormatError> {
    let msg = header
        .find(msg_type)
        .ok_or(FormatError::MissingMessage(msg_type.id()))?;
    if msg.flags & MSG_FLAG_SHARED != 0 {
        return Err(FormatError::UnsupportedLayout(format!(
            "shared message {:#06x}",
            msg_type.id()
        )));
    }
    Ok(&msg.data)
}

impl DatasetInfo {
    /// True when the header carries a data layout message.
    pub fn is_dataset(header: &ObjectHeader) -> bool {
        header.find(MessageType::DataLayout).is_some()
    }

    /// Collect and parse the storage messages of a dataset header.
    pub fn from_header(
        header: &ObjectHeader,
        offset_size: u8,
        length_size: u8,
    ) -> Result<DatasetInfo, FormatError> {
        if header.find(MessageType::ExternalDataFiles).is_some() {
            return Err(FormatError::UnsupportedLayout("external raw data files".into()));
        }
        let layout = DataLayout::parse(
            required(header, MessageType::DataLayout)?,
            offset_size,
            length_size,
        )?;
        let dataspace = Dataspace::parse(required(header, MessageType::Dataspace)?, length_size)?;
        let datatype = Datatype::parse(required(header, MessageType::Datatype)?)?;
        let pipeline = header
            .find(MessageType::FilterPipeline)
            .map(|m| FilterPipeline::parse(&m.data))
            .transpose()?;

        Ok(DatasetInfo {
            dataspace,
            datatype,
            layout,
            pipeline,
        })
    }

    /// Size of the full dataset in bytes.
    ///
    /// Dimensions come straight from the file, so an overflowing or
    /// oversized product is an error rather than a buffer length.
    pub fn byte_len(&self) -> Result<usize, FormatError> {
        let elements = self.dataspace.num_elements()?;
        array_bytes(&[elements], self.datatype.element_size(), "dataset")
    }
}

/// Read a dataset's raw bytes.
///
/// Storage that was never allocated reads as zeros.
pub fn read_raw_data(
    file_data: &[u8],
    info: &DatasetInfo,
    offset_size: u8,
) -> Result<Vec<u8>, FormatError> {
    let expected = info.byte_len()?;
    match &info.layout {
        DataLayout::Compact { data } => {
            if data.len() < expected {
                return Err(FormatError::UnexpectedEof {
                    expected,
                    available: data.len(),
                });
            }
            Ok(data[..expected].to_vec())
        }
        DataLayout::Contiguous { address: None, .. } => Ok(vec![0u8; expected]),
        DataLayout::Contiguous {
            address: Some(address),
            size,
        } => {
            if (*size as usize) < expected {
                return Err(FormatError::UnsupportedLayout(format!(
                    "contiguous storage of {size} bytes for {expected} bytes of data"
                )));
            }
            let start = *address as usize;
            ensure_len(file_data, start, expected)?;
            Ok(file_data[start..start + expected].to_vec())
        }
        DataLayout::Chunked {
            chunk_dimensions,
            index,
        } => {
            let geometry = ChunkGeometry {
                dims: &info.dataspace.dimensions,
                chunk_dims: chunk_dimensions,
                element_size: info.datatype.element_size(),
            };
            read_chunked(file_data, index, &geometry, info.pipeline.as_ref(), offset_size)
        }
    }
}
