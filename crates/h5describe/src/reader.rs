//! Reading API: `File` and `Dataset` handles over one HDF5 container.
//!
//! When the `mmap` feature is enabled (default), [`File::open`] maps the
//! file instead of reading it. [`File::open_buffered`] reads it into a
//! `Vec<u8>`, and [`File::from_bytes`] wraps bytes already in memory.
//!
//! External links are followed by opening the target file relative to the
//! directory of the file holding the link.

use std::path::{Path, PathBuf};

use tracing::debug;

use h5describe_format::data_layout::DataLayout;
use h5describe_format::data_read::{read_raw_data, DatasetInfo};
use h5describe_format::datatype::Datatype;
use h5describe_format::filter_pipeline::FilterPipeline;
use h5describe_format::group::{self, Resolved};
use h5describe_format::object_header::ObjectHeader;
use h5describe_format::signature;
use h5describe_format::superblock::Superblock;
use h5describe_io::{FileReader, Hdf5Read, MemoryReader};

use crate::error::Error;

/// External links followed in one lookup before giving up.
const MAX_EXTERNAL_DEPTH: usize = 8;

/// An open HDF5 file for reading.
pub struct File {
    data: Box<dyn Hdf5Read>,
    /// Offset of the base address in `data`; file addresses are relative to it.
    base: usize,
    superblock: Superblock,
    path: Option<PathBuf>,
}

impl File {
    /// Open an HDF5 file from a filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        #[cfg(feature = "mmap")]
        {
            let reader = h5describe_io::MmapReader::open(path)?;
            Self::from_reader(Box::new(reader), Some(path.to_path_buf()))
        }
        #[cfg(not(feature = "mmap"))]
        {
            Self::open_buffered(path)
        }
    }

    /// Open an HDF5 file by reading it entirely into memory.
    pub fn open_buffered<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let reader = FileReader::open(path)?;
        Self::from_reader(Box::new(reader), Some(path.to_path_buf()))
    }

    /// Open an HDF5 file from an in-memory byte vector.
    ///
    /// Relative external links resolve against the working directory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Error> {
        Self::from_reader(Box::new(MemoryReader::new(data)), None)
    }

    fn from_reader(data: Box<dyn Hdf5Read>, path: Option<PathBuf>) -> Result<Self, Error> {
        let bytes = data.as_bytes();
        let sig_offset = signature::find_signature(bytes)?;
        let superblock = Superblock::parse(bytes, sig_offset)?;
        let base = superblock.base_address as usize;
        if base > bytes.len() {
            return Err(Error::Format(
                h5describe_format::FormatError::UnexpectedEof {
                    expected: base,
                    available: bytes.len(),
                },
            ));
        }
        Ok(Self {
            data,
            base,
            superblock,
            path,
        })
    }

    /// The parsed superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// The path this file was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn bytes(&self) -> &[u8] {
        &self.data.as_bytes()[self.base..]
    }

    fn header(&self, address: u64) -> Result<ObjectHeader, Error> {
        let sb = &self.superblock;
        Ok(ObjectHeader::parse(
            self.bytes(),
            address as usize,
            sb.offset_size,
            sb.length_size,
        )?)
    }

    /// Resolve a path and return a `Dataset` handle.
    ///
    /// Only objects stored in this file are returned; a path that crosses
    /// an external link yields `Error::Unsupported`. Use
    /// [`File::read_buffer`] to read through external links.
    pub fn dataset(&self, path: &str) -> Result<Dataset<'_>, Error> {
        match group::resolve(self.bytes(), &self.superblock, path)? {
            Resolved::Object(address) => self.dataset_at(path, address),
            Resolved::External { file, .. } => Err(Error::Unsupported(format!(
                "{path} is an external link into {file}"
            ))),
        }
    }

    fn dataset_at(&self, path: &str, address: u64) -> Result<Dataset<'_>, Error> {
        let header = self.header(address)?;
        if !DatasetInfo::is_dataset(&header) {
            return Err(Error::NotADataset(path.to_string()));
        }
        let sb = &self.superblock;
        let info = DatasetInfo::from_header(&header, sb.offset_size, sb.length_size)?;
        Ok(Dataset {
            file: self,
            path: path.to_string(),
            info,
        })
    }

    /// Names of the members of the group at `path`, sorted by name.
    pub fn keys(&self, path: &str) -> Result<Vec<String>, Error> {
        self.keys_at(path, 0)
    }

    fn keys_at(&self, path: &str, depth: usize) -> Result<Vec<String>, Error> {
        let (bytes, sb) = (self.bytes(), &self.superblock);
        match group::resolve(bytes, sb, path)? {
            Resolved::Object(address) => {
                if !group::is_group(bytes, sb, address)? {
                    return Err(Error::NotFound(format!("{path} is not a group")));
                }
                Ok(group::list_links(bytes, sb, address)?
                    .into_iter()
                    .map(|l| l.name)
                    .collect())
            }
            Resolved::External { file, path } => {
                self.follow(&file, depth, |ext, depth| ext.keys_at(&path, depth))
            }
        }
    }

    /// True when the group at `path` has a member called `name`.
    pub fn contains(&self, path: &str, name: &str) -> Result<bool, Error> {
        Ok(self.keys(path)?.iter().any(|k| k == name))
    }

    /// True when resolving `path` crosses an external link.
    pub fn is_external(&self, path: &str) -> Result<bool, Error> {
        Ok(matches!(
            group::resolve(self.bytes(), &self.superblock, path)?,
            Resolved::External { .. }
        ))
    }

    /// Read the raw bytes and shape of the dataset at `path`, following
    /// external links.
    pub fn read_buffer(&self, path: &str) -> Result<(Vec<u8>, Vec<u64>), Error> {
        self.read_buffer_at(path, 0)
    }

    fn read_buffer_at(&self, path: &str, depth: usize) -> Result<(Vec<u8>, Vec<u64>), Error> {
        match group::resolve(self.bytes(), &self.superblock, path)? {
            Resolved::Object(address) => {
                let ds = self.dataset_at(path, address)?;
                let bytes = ds.read_raw()?;
                debug!(path, len = bytes.len(), shape = ?ds.shape(), "read dataset");
                Ok((bytes, ds.shape().to_vec()))
            }
            Resolved::External { file, path } => {
                self.follow(&file, depth, |ext, depth| ext.read_buffer_at(&path, depth))
            }
        }
    }

    /// Where an external link's file name points, seen from this file.
    fn external_path(&self, file: &str) -> PathBuf {
        let target = Path::new(file);
        match self.path.as_deref().and_then(Path::parent) {
            Some(dir) if target.is_relative() => dir.join(target),
            _ => target.to_path_buf(),
        }
    }

    fn follow<T>(
        &self,
        file: &str,
        depth: usize,
        f: impl FnOnce(&File, usize) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let target = self.external_path(file);
        if depth >= MAX_EXTERNAL_DEPTH {
            return Err(Error::Unsupported(format!(
                "more than {MAX_EXTERNAL_DEPTH} nested external links at {}",
                target.display()
            )));
        }
        debug!(file = %target.display(), "following external link");
        File::open(&target)
            .and_then(|ext| f(&ext, depth + 1))
            .map_err(|e| Error::ExternalFile {
                file: target,
                source: Box::new(e),
            })
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("len", &self.data.as_bytes().len())
            .field("superblock_version", &self.superblock.version)
            .finish()
    }
}

/// A dataset stored in an open [`File`].
pub struct Dataset<'f> {
    file: &'f File,
    path: String,
    info: DatasetInfo,
}

impl Dataset<'_> {
    /// The path this dataset was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dimension sizes; empty for scalar and null dataspaces.
    pub fn shape(&self) -> &[u64] {
        &self.info.dataspace.dimensions
    }

    pub fn datatype(&self) -> &Datatype {
        &self.info.datatype
    }

    pub fn layout(&self) -> &DataLayout {
        &self.info.layout
    }

    pub fn filters(&self) -> Option<&FilterPipeline> {
        self.info.pipeline.as_ref()
    }

    /// Number of elements in the dataset.
    pub fn element_count(&self) -> Result<u64, Error> {
        Ok(self.info.dataspace.num_elements()?)
    }

    /// Raw element bytes in row-major order, as stored.
    pub fn read_raw(&self) -> Result<Vec<u8>, Error> {
        Ok(read_raw_data(
            self.file.bytes(),
            &self.info,
            self.file.superblock.offset_size,
        )?)
    }
}
