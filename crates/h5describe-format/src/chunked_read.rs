//! Chunked dataset reading: chunk location and assembly into a row-major
//! buffer.

#[cfg(not(feature = "std"))]
use alloc::{format, vec, vec::Vec};

use crate::btree_v1::{collect_chunks, ChunkRecord};
use crate::bytes::array_bytes;
use crate::data_layout::ChunkIndex;
use crate::error::FormatError;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::decompress_chunk;

/// Shape information shared by every chunk of one dataset.
#[derive(Debug, Clone, Copy)]
pub struct ChunkGeometry<'a> {
    /// Dataset extent per dimension.
    pub dims: &'a [u64],
    /// Chunk extent per dimension.
    pub chunk_dims: &'a [u64],
    pub element_size: usize,
}

impl ChunkGeometry<'_> {
    /// Bytes in one decoded chunk.
    pub fn chunk_bytes(&self) -> Result<usize, FormatError> {
        array_bytes(self.chunk_dims, self.element_size, "chunk")
    }

    /// Bytes in the assembled dataset.
    pub fn dataset_bytes(&self) -> Result<usize, FormatError> {
        array_bytes(self.dims, self.element_size, "dataset")
    }

    /// Number of chunks along each dimension.
    fn grid(&self) -> Vec<u64> {
        self.dims
            .iter()
            .zip(self.chunk_dims)
            .map(|(&d, &c)| if c == 0 { 0 } else { d.div_ceil(c) })
            .collect()
    }
}

/// Stored size field of a chunk record.
fn record_size(bytes: u64) -> Result<u32, FormatError> {
    u32::try_from(bytes).map_err(|_| FormatError::ImplausibleSize("chunk"))
}

/// Chunks of an implicit index: every chunk is allocated, in row-major
/// chunk order, back to back from `base`. The whole run must lie inside
/// `file_data`.
pub fn implicit_chunks(
    file_data: &[u8],
    base: u64,
    geometry: &ChunkGeometry<'_>,
) -> Result<Vec<ChunkRecord>, FormatError> {
    let grid = geometry.grid();
    let chunk_bytes = geometry.chunk_bytes()? as u64;
    let size = record_size(chunk_bytes)?;
    let total = grid
        .iter()
        .try_fold(1u64, |n, &g| n.checked_mul(g))
        .ok_or(FormatError::ImplausibleSize("chunk grid"))?;
    let end = total
        .checked_mul(chunk_bytes)
        .and_then(|span| span.checked_add(base))
        .ok_or(FormatError::ImplausibleSize("chunk grid"))?;
    if end > file_data.len() as u64 {
        return Err(FormatError::UnexpectedEof {
            expected: usize::try_from(end).unwrap_or(usize::MAX),
            available: file_data.len(),
        });
    }

    Ok((0..total)
        .map(|linear| {
            let mut offsets = vec![0u64; grid.len()];
            let mut rest = linear;
            for d in (0..grid.len()).rev() {
                offsets[d] = rest % grid[d] * geometry.chunk_dims[d];
                rest /= grid[d];
            }
            ChunkRecord {
                offsets,
                size,
                filter_mask: 0,
                address: base + linear * chunk_bytes,
            }
        })
        .collect())
}

/// Locate every stored chunk for `index`. Unallocated storage yields none.
pub fn locate_chunks(
    file_data: &[u8],
    index: &ChunkIndex,
    geometry: &ChunkGeometry<'_>,
    offset_size: u8,
) -> Result<Vec<ChunkRecord>, FormatError> {
    Ok(match *index {
        ChunkIndex::BTreeV1 { address: None }
        | ChunkIndex::SingleChunk { address: None, .. }
        | ChunkIndex::Implicit { address: None } => Vec::new(),
        ChunkIndex::BTreeV1 {
            address: Some(address),
        } => collect_chunks(file_data, address, offset_size, geometry.dims.len())?,
        ChunkIndex::SingleChunk {
            address: Some(address),
            filtered_size,
            filter_mask,
        } => {
            let stored = match filtered_size {
                Some(n) => n,
                None => geometry.chunk_bytes()? as u64,
            };
            vec![ChunkRecord {
                offsets: vec![0; geometry.dims.len()],
                size: record_size(stored)?,
                filter_mask,
                address,
            }]
        }
        ChunkIndex::Implicit {
            address: Some(address),
        } => implicit_chunks(file_data, address, geometry)?,
    })
}

/// Read and assemble a chunked dataset into one row-major buffer.
///
/// Regions no chunk covers stay zero.
pub fn read_chunked(
    file_data: &[u8],
    index: &ChunkIndex,
    geometry: &ChunkGeometry<'_>,
    pipeline: Option<&FilterPipeline>,
    offset_size: u8,
) -> Result<Vec<u8>, FormatError> {
    if geometry.chunk_dims.len() != geometry.dims.len() {
        return Err(FormatError::ChunkedReadError(format!(
            "chunk rank {} does not match dataset rank {}",
            geometry.chunk_dims.len(),
            geometry.dims.len()
        )));
    }
    let mut output = vec![0u8; geometry.dataset_bytes()?];
    let chunk_bytes = geometry.chunk_bytes()?;

    for chunk in locate_chunks(file_data, index, geometry, offset_size)? {
        let start = usize::try_from(chunk.address).unwrap_or(usize::MAX);
        let stored = start
            .checked_add(chunk.size as usize)
            .and_then(|end| file_data.get(start..end))
            .ok_or(FormatError::UnexpectedEof {
                expected: start.saturating_add(chunk.size as usize),
                available: file_data.len(),
            })?;
        let decoded = match pipeline {
            Some(p) => decompress_chunk(stored, p, geometry.element_size, chunk.filter_mask)?,
            None => stored.to_vec(),
        };
        if decoded.len() < chunk_bytes {
            return Err(FormatError::ChunkedReadError(format!(
                "chunk at {:#x} decoded to {} bytes, expected {chunk_bytes}",
                chunk.address,
                decoded.len()
            )));
        }
        copy_chunk(&decoded, &mut output, &chunk.offsets, geometry)?;
    }
    Ok(output)
}

/// Copy one decoded chunk into `output`, clipping at the dataset edge.
///
/// Runs along the last dimension are copied whole.
fn copy_chunk(
    chunk: &[u8],
    output: &mut [u8],
    offsets: &[u64],
    geometry: &ChunkGeometry<'_>,
) -> Result<(), FormatError> {
    let ChunkGeometry {
        dims,
        chunk_dims,
        element_size,
    } = *geometry;
    let rank = dims.len();
    if rank == 0 {
        let n = element_size.min(chunk.len()).min(output.len());
        output[..n].copy_from_slice(&chunk[..n]);
        return Ok(());
    }
    if offsets.len() < rank {
        return Err(FormatError::ChunkedReadError("chunk key has too few offsets".into()));
    }

    let extent: Vec<u64> = (0..rank)
        .map(|d| chunk_dims[d].min(dims[d].saturating_sub(offsets[d])))
        .collect();
    if extent.contains(&0) {
        return Ok(());
    }
    let last = rank - 1;
    let run = extent[last] as usize * element_size;
    let mut idx = vec![0u64; last];

    loop {
        let mut src = 0u64;
        let mut dst = 0u64;
        for d in 0..last {
            src = src * chunk_dims[d] + idx[d];
            dst = dst * dims[d] + offsets[d] + idx[d];
        }
        let src = (src * chunk_dims[last]) as usize * element_size;
        let dst = (dst * dims[last] + offsets[last]) as usize * element_size;
        if src + run > chunk.len() || dst + run > output.len() {
            return Err(FormatError::ChunkedReadError(
                "chunk extends past the dataset buffer".into(),
            ));
        }
        output[dst..dst + run].copy_from_slice(&chunk[src..src + run]);

        // odometer over the outer dimensions
        let mut d = last;
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < extent[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}
