//! Chunk filter decoders: deflate, shuffle, fletcher32, LZ4 and bitshuffle.
//!
//! Detector writers store images either with deflate/shuffle from the
//! HDF5 library or with the registered LZ4 (32004) and bitshuffle (32008)
//! plugins; all of them are undone here in pure Rust.

#[cfg(not(feature = "std"))]
use alloc::{format, vec, vec::Vec};

use crate::error::FormatError;
use crate::filter_pipeline::{
    FilterDescription, FilterPipeline, FILTER_BITSHUFFLE, FILTER_DEFLATE, FILTER_FLETCHER32,
    FILTER_LZ4, FILTER_SHUFFLE,
};

/// Bitshuffle client data value selecting LZ4 compression of each block.
pub const BSHUF_LZ4: u32 = 2;

/// Bitshuffle operates on runs of this many elements.
const BSHUF_BLOCKED_MULT: usize = 8;

/// Undo a filter pipeline on one stored chunk.
///
/// Filters run in reverse order. Bit `i` of `filter_mask` marks filter `i`
/// as skipped for this chunk.
pub fn decompress_chunk(
    stored: &[u8],
    pipeline: &FilterPipeline,
    element_size: usize,
    filter_mask: u32,
) -> Result<Vec<u8>, FormatError> {
    let mut data = stored.to_vec();
    for (i, filter) in pipeline.filters.iter().enumerate().rev() {
        if i < 32 && filter_mask & (1 << i) != 0 {
            continue;
        }
        data = apply(filter, &data, element_size)?;
    }
    Ok(data)
}

fn apply(
    filter: &FilterDescription,
    data: &[u8],
    element_size: usize,
) -> Result<Vec<u8>, FormatError> {
    match filter.filter_id {
        FILTER_DEFLATE => deflate_decompress(data),
        FILTER_SHUFFLE => {
            let size = filter
                .client_data
                .first()
                .map_or(element_size, |&v| v as usize);
            Ok(unshuffle(data, size))
        }
        FILTER_FLETCHER32 => fletcher32_strip(data),
        FILTER_LZ4 => lz4_decompress(data),
        FILTER_BITSHUFFLE => {
            let size = filter
                .client_data
                .get(2)
                .map_or(element_size, |&v| v as usize);
            let lz4 = filter.client_data.get(4) == Some(&BSHUF_LZ4);
            if lz4 {
                bitshuffle_lz4_decompress(data, size)
            } else {
                let block = filter.client_data.get(3).copied().unwrap_or(0) as usize;
                bitshuffle_decode(data, size, block)
            }
        }
        other => Err(FormatError::UnsupportedFilter(other)),
    }
}

#[cfg(feature = "deflate")]
fn deflate_decompress(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    use std::io::Read;

    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| FormatError::DecompressionError(e.to_string()))?;
    Ok(result)
}

#[cfg(not(feature = "deflate"))]
fn deflate_decompress(_data: &[u8]) -> Result<Vec<u8>, FormatError> {
    Err(FormatError::UnsupportedFilter(FILTER_DEFLATE))
}

/// Reconstruct interleaved element bytes.
///
/// On disk all byte-0s come first, then all byte-1s, and so on. Trailing
/// bytes that do not fill an element are stored unshuffled.
pub fn unshuffle(data: &[u8], element_size: usize) -> Vec<u8> {
    if element_size <= 1 {
        return data.to_vec();
    }
    let n = data.len() / element_size;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for j in 0..element_size {
            out[i * element_size + j] = data[j * n + i];
        }
    }
    let body = n * element_size;
    out[body..].copy_from_slice(&data[body..]);
    out
}

/// HDF5's Fletcher-32 over 16-bit big-endian words.
pub fn fletcher32(data: &[u8]) -> u32 {
    // 360 words keep both sums inside u32 before folding
    const BLOCK_WORDS: usize = 360;

    let mut sum1: u32 = 0;
    let mut sum2: u32 = 0;
    let mut words = data.chunks(2).peekable();
    while words.peek().is_some() {
        for w in words.by_ref().take(BLOCK_WORDS) {
            let hi = (w[0] as u32) << 8;
            let lo = w.get(1).copied().unwrap_or(0) as u32;
            sum1 += hi | lo;
            sum2 += sum1;
        }
        sum1 = (sum1 & 0xFFFF) + (sum1 >> 16);
        sum2 = (sum2 & 0xFFFF) + (sum2 >> 16);
    }
    sum1 = (sum1 & 0xFFFF) + (sum1 >> 16);
    sum2 = (sum2 & 0xFFFF) + (sum2 >> 16);
    (sum2 << 16) | sum1
}

/// Verify and remove the trailing Fletcher-32 checksum.
///
/// Files written by old library versions store the checksum with the bytes
/// of each 16-bit half swapped; both forms are accepted.
fn fletcher32_strip(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    if data.len() < 4 {
        return Err(FormatError::FilterError(
            "fletcher32: chunk shorter than its checksum".into(),
        ));
    }
    let (payload, tail) = data.split_at(data.len() - 4);
    let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let computed = fletcher32(payload);
    let reversed = ((computed & 0x00FF_00FF) << 8) | ((computed & 0xFF00_FF00) >> 8);
    if stored != computed && stored != reversed {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(payload.to_vec())
}

fn be_u32(data: &[u8], pos: usize) -> Result<u32, FormatError> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(FormatError::UnexpectedEof {
            expected: pos + 4,
            available: data.len(),
        })
}

fn be_u64(data: &[u8], pos: usize) -> Result<u64, FormatError> {
    Ok(((be_u32(data, pos)? as u64) << 32) | be_u32(data, pos + 4)? as u64)
}

/// Upper bound on a chunk size declared by a filter header.
const MAX_DECLARED_SIZE: u64 = crate::bytes::MAX_BUFFER_BYTES;

fn declared_size(total: u64) -> Result<usize, FormatError> {
    if total > MAX_DECLARED_SIZE {
        return Err(FormatError::FilterError(format!(
            "declared chunk size {total} is implausible"
        )));
    }
    Ok(total as usize)
}

#[cfg(feature = "lz4")]
fn lz4_block(input: &[u8], size: usize) -> Result<Vec<u8>, FormatError> {
    lz4_flex::block::decompress(input, size)
        .map_err(|e| FormatError::DecompressionError(format!("lz4: {e}")))
}

#[cfg(not(feature = "lz4"))]
fn lz4_block(_input: &[u8], _size: usize) -> Result<Vec<u8>, FormatError> {
    Err(FormatError::UnsupportedFilter(FILTER_LZ4))
}

/// HDF5 LZ4 plugin: `u64` BE total size, `u32` BE block size, then per
/// block a `u32` BE stored length and the LZ4 block. A block whose stored
/// length equals its raw length is kept uncompressed.
fn lz4_decompress(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let total = declared_size(be_u64(data, 0)?)?;
    let block_size = be_u32(data, 8)? as usize;
    if block_size == 0 && total > 0 {
        return Err(FormatError::FilterError("lz4: zero block size".into()));
    }

    let mut out = Vec::with_capacity(total);
    let mut pos = 12;
    while out.len() < total {
        let raw_len = block_size.min(total - out.len());
        let stored_len = be_u32(data, pos)? as usize;
        pos += 4;
        let block = data.get(pos..pos + stored_len).ok_or(FormatError::UnexpectedEof {
            expected: pos + stored_len,
            available: data.len(),
        })?;
        pos += stored_len;
        if stored_len == raw_len {
            out.extend_from_slice(block);
        } else {
            out.extend_from_slice(&lz4_block(block, raw_len)?);
        }
    }
    Ok(out)
}

/// Default bitshuffle block, in elements, when the client data leaves it 0.
fn default_block_elements(element_size: usize) -> usize {
    const TARGET_BLOCK_BYTES: usize = 8192;
    const MIN_BLOCK: usize = 128;
    let block = TARGET_BLOCK_BYTES / element_size.max(1);
    (block / BSHUF_BLOCKED_MULT * BSHUF_BLOCKED_MULT).max(MIN_BLOCK)
}

/// Undo the bit transposition of one block of `n` elements (`n % 8 == 0`).
///
/// Bit `k` of byte `j` of element `i` lives in bit row `j * 8 + k`, at bit
/// `i % 8` of byte `i / 8` of that row.
fn untranspose_block(input: &[u8], element_size: usize, out: &mut [u8]) {
    let n = input.len() / element_size;
    let row_len = n / 8;
    out.fill(0);
    for (row, bits) in input.chunks_exact(row_len).enumerate() {
        let (j, k) = (row / 8, row % 8);
        for (byte_idx, &byte) in bits.iter().enumerate() {
            if byte == 0 {
                continue;
            }
            for bit in 0..8 {
                if byte >> bit & 1 == 1 {
                    let i = byte_idx * 8 + bit;
                    out[i * element_size + j] |= 1 << k;
                }
            }
        }
    }
}

/// Walk the bitshuffle block structure of `total` output bytes, calling
/// `block` with the element count of every transposed block. Elements past
/// the last multiple of eight are copied raw by the caller.
fn for_each_block(
    total_elements: usize,
    block_elements: usize,
    mut block: impl FnMut(usize) -> Result<(), FormatError>,
) -> Result<usize, FormatError> {
    let mut done = 0;
    while total_elements - done >= block_elements {
        block(block_elements)?;
        done += block_elements;
    }
    let last = (total_elements - done) / BSHUF_BLOCKED_MULT * BSHUF_BLOCKED_MULT;
    if last > 0 {
        block(last)?;
        done += last;
    }
    Ok(done)
}

fn check_block_size(block_elements: usize) -> Result<(), FormatError> {
    if block_elements == 0 || block_elements % BSHUF_BLOCKED_MULT != 0 {
        return Err(FormatError::FilterError(format!(
            "bitshuffle: block of {block_elements} elements is not a multiple of 8"
        )));
    }
    Ok(())
}

/// Bitshuffle without compression: transposed blocks laid end to end.
fn bitshuffle_decode(
    data: &[u8],
    element_size: usize,
    block_elements: usize,
) -> Result<Vec<u8>, FormatError> {
    if element_size == 0 {
        return Err(FormatError::FilterError("bitshuffle: zero element size".into()));
    }
    let block_elements = match block_elements {
        0 => default_block_elements(element_size),
        b => b,
    };
    check_block_size(block_elements)?;

    let total_elements = data.len() / element_size;
    let mut out = vec![0u8; data.len()];
    let mut pos = 0;
    let done = for_each_block(total_elements, block_elements, |n| {
        let len = n * element_size;
        untranspose_block(&data[pos..pos + len], element_size, &mut out[pos..pos + len]);
        pos += len;
        Ok(())
    })?;
    let tail = done * element_size;
    out[tail..].copy_from_slice(&data[tail..]);
    Ok(out)
}

/// Bitshuffle with LZ4: `u64` BE total bytes and `u32` BE block size in
/// bytes, then per block a `u32` BE compressed length and an LZ4 block of
/// the transposed bytes. Leftover elements follow uncompressed.
fn bitshuffle_lz4_decompress(data: &[u8], element_size: usize) -> Result<Vec<u8>, FormatError> {
    if element_size == 0 {
        return Err(FormatError::FilterError("bitshuffle: zero element size".into()));
    }
    let total = declared_size(be_u64(data, 0)?)?;
    let block_bytes = be_u32(data, 8)? as usize;
    let block_elements = match block_bytes / element_size {
        0 => default_block_elements(element_size),
        b => b,
    };
    check_block_size(block_elements)?;

    let total_elements = total / element_size;
    let mut out = vec![0u8; total];
    let mut pos = 12;
    let mut written = 0;
    let done = for_each_block(total_elements, block_elements, |n| {
        let len = n * element_size;
        let stored_len = be_u32(data, pos)? as usize;
        pos += 4;
        let block = data.get(pos..pos + stored_len).ok_or(FormatError::UnexpectedEof {
            expected: pos + stored_len,
            available: data.len(),
        })?;
        pos += stored_len;
        let transposed = lz4_block(block, len)?;
        if transposed.len() != len {
            return Err(FormatError::DecompressionError(format!(
                "bitshuffle: block decoded to {} bytes, expected {len}",
                transposed.len()
            )));
        }
        untranspose_block(&transposed, element_size, &mut out[written..written + len]);
        written += len;
        Ok(())
    })?;

    let tail = done * element_size;
    let rest = total - tail;
    let raw = data.get(pos..pos + rest).ok_or(FormatError::UnexpectedEof {
        expected: pos + rest,
        available: data.len(),
    })?;
    out[tail..].copy_from_slice(raw);
    Ok(out)
}
