//! Byte sources for HDF5 container files.
//!
//! The format parser works on one contiguous byte slice. This crate
//! provides the ways of getting one: an owned buffer, a whole-file read,
//! or (with the `mmap` feature) a memory mapping. All of them sit behind
//! [`Hdf5Read`] so callers can hold any of them as a trait object.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub use h5describe_format;

/// Whole-file, read-only view of a container.
pub trait Hdf5Read: Send + Sync {
    fn as_bytes(&self) -> &[u8];

    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bytes that are already in memory, e.g. a file image built by a test or
/// received from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for MemoryReader {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl Hdf5Read for MemoryReader {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A file read completely into an owned buffer.
#[derive(Debug)]
pub struct FileReader {
    data: Vec<u8>,
}

impl FileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read(path)?;
        Ok(Self { data })
    }
}

impl Hdf5Read for FileReader {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Read at most `len` bytes from the start of a file.
///
/// A file shorter than `len` yields all of its bytes.
pub fn read_prefix<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    fs::File::open(path)?.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "mmap")]
pub mod mmap;

#[cfg(feature = "mmap")]
pub use mmap::MmapReader;
