//! Bounds-checked little-endian field readers shared by the parsers.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// Fail with `UnexpectedEof` unless `data[offset..offset + needed]` exists.
pub(crate) fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    match offset.checked_add(needed) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(FormatError::UnexpectedEof {
            expected: offset.saturating_add(needed),
            available: data.len(),
        }),
    }
}

/// Largest decoded buffer (dataset or chunk) a reader will allocate.
pub const MAX_BUFFER_BYTES: u64 = 1 << 34;

/// Bytes taken by an array of `extent` elements of `element_size` bytes.
///
/// Fails with `ImplausibleSize(what)` when the product overflows or is
/// larger than [`MAX_BUFFER_BYTES`].
pub(crate) fn array_bytes(
    extent: &[u64],
    element_size: usize,
    what: &'static str,
) -> Result<usize, FormatError> {
    extent
        .iter()
        .try_fold(element_size as u64, |acc, &d| acc.checked_mul(d))
        .filter(|&n| n <= MAX_BUFFER_BYTES)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(FormatError::ImplausibleSize(what))
}

/// Read an unsigned integer of `size` bytes (1, 2, 4 or 8) at `pos`.
///
/// Offsets and lengths in HDF5 share this encoding; the caller picks the
/// width from the superblock.
pub(crate) fn read_uint(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    ensure_len(data, pos, size as usize)?;
    let slice = &data[pos..pos + size as usize];
    Ok(match size {
        1 => slice[0] as u64,
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

pub(crate) fn read_u16(data: &[u8], pos: usize) -> Result<u16, FormatError> {
    ensure_len(data, pos, 2)?;
    Ok(LittleEndian::read_u16(&data[pos..pos + 2]))
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> Result<u32, FormatError> {
    ensure_len(data, pos, 4)?;
    Ok(LittleEndian::read_u32(&data[pos..pos + 4]))
}

/// An address field with every byte set to 0xFF means "undefined".
pub(crate) fn read_address(data: &[u8], pos: usize, size: u8) -> Result<Option<u64>, FormatError> {
    ensure_len(data, pos, size as usize)?;
    if data[pos..pos + size as usize].iter().all(|&b| b == 0xFF) {
        Ok(None)
    } else {
        read_uint(data, pos, size).map(Some)
    }
}

/// Verify a trailing lookup3 checksum: `data[start..end]` is covered and the
/// stored value sits at `data[end..end + 4]`.
pub(crate) fn verify_checksum(data: &[u8], start: usize, end: usize) -> Result<(), FormatError> {
    let stored = read_u32(data, end)?;
    let computed = crate::checksum::lookup3(&data[start..end]);
    if computed != stored {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}
