//! Locating the superblock and checking the leading magic bytes.

use crate::error::FormatError;

/// `\x89HDF\r\n\x1a\n`, the first eight bytes of every superblock.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Number of bytes [`HeaderProbe::parse`] needs: signature plus version byte.
pub const PROBE_LEN: usize = 9;

/// Offsets where a superblock may start: 0, then 512 doubling.
fn candidate_offsets() -> impl Iterator<Item = usize> {
    core::iter::once(0).chain(core::iter::successors(Some(512usize), |o| o.checked_mul(2)))
}

/// Byte offset of the superblock signature, searching past any user block.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    candidate_offsets()
        .take_while(|&o| o.saturating_add(HDF5_SIGNATURE.len()) <= data.len())
        .find(|&o| data[o..o + HDF5_SIGNATURE.len()] == HDF5_SIGNATURE)
        .ok_or(FormatError::SignatureNotFound)
}

/// The first nine bytes of a file, taken at face value.
///
/// Unlike [`find_signature`] this does not search: it reports what sits at
/// offset 0 so a caller can flag a bad header and still read the version
/// byte that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProbe {
    /// Bytes 0..8 as found in the file.
    pub magic: [u8; 8],
    /// Byte 8, the superblock version when the magic is valid.
    pub version: u8,
}

impl HeaderProbe {
    /// Read the probe from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<HeaderProbe, FormatError> {
        if data.len() < PROBE_LEN {
            return Err(FormatError::UnexpectedEof {
                expected: PROBE_LEN,
                available: data.len(),
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[..8]);
        Ok(HeaderProbe {
            magic,
            version: data[8],
        })
    }

    /// True when the magic matches [`HDF5_SIGNATURE`].
    pub fn has_valid_signature(&self) -> bool {
        self.magic == HDF5_SIGNATURE
    }
}
