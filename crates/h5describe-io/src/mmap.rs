//! Memory-mapped file reader for zero-copy HDF5 access.

use memmap2::Mmap;
use std::fs;
use std::io;
use std::path::Path;

use crate::Hdf5Read;

/// Read-only memory mapping of a whole file.
///
/// Slices handed out by `as_bytes()` point into the mapping; nothing is
/// copied until a dataset is decoded.
pub struct MmapReader {
    _file: fs::File,
    mmap: Mmap,
}

impl MmapReader {
    /// Open a file and memory-map it for reading.
    ///
    /// The file must not be truncated by another process while the mapping
    /// is alive.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        // SAFETY: the mapping is read-only and lives no longer than `file`;
        // concurrent truncation by another process is outside our control.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Read a slice at the given offset without copying.
    ///
    /// Returns `None` if `offset + len` exceeds the file size.
    pub fn read_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.mmap.get(offset..offset.checked_add(len)?)
    }
}

impl Hdf5Read for MmapReader {
    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}

impl std::fmt::Debug for MmapReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapReader")
            .field("len", &self.mmap.len())
            .finish()
    }
}
