//! The byte/shape source the describer reads datasets from.

use std::collections::{BTreeMap, BTreeSet};

use crate::consistency::Shape;
use crate::error::Error;
use crate::reader::File;

/// Read access to a hierarchical container of named arrays.
///
/// Paths are `/`-separated and absolute.
pub trait DatasetSource {
    /// Superblock version of the container.
    fn superblock_version(&self) -> u8;

    /// Names of the members of the group at `path`, in listing order.
    fn keys(&self, path: &str) -> Result<Vec<String>, Error>;

    /// True when the group at `path` has a member called `name`.
    fn contains(&self, path: &str, name: &str) -> Result<bool, Error> {
        Ok(self.keys(path)?.iter().any(|k| k == name))
    }

    /// The full raw byte content and the shape of the array at `path`.
    fn read_buffer(&self, path: &str) -> Result<(Vec<u8>, Shape), Error>;

    /// True when `path` lives in another container reached by a link.
    fn is_external(&self, _path: &str) -> Result<bool, Error> {
        Ok(false)
    }
}

impl DatasetSource for File {
    fn superblock_version(&self) -> u8 {
        self.superblock().version
    }

    fn keys(&self, path: &str) -> Result<Vec<String>, Error> {
        File::keys(self, path)
    }

    fn contains(&self, path: &str, name: &str) -> Result<bool, Error> {
        File::contains(self, path, name)
    }

    fn read_buffer(&self, path: &str) -> Result<(Vec<u8>, Shape), Error> {
        File::read_buffer(self, path)
    }

    fn is_external(&self, path: &str) -> Result<bool, Error> {
        File::is_external(self, path)
    }
}

/// An in-memory container. Groups exist implicitly as the parents of the
/// arrays inserted.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    superblock_version: u8,
    arrays: BTreeMap<String, (Vec<u8>, Shape)>,
}

/// `/a//b/` -> `/a/b`; the root is `/`.
fn normalize(path: &str) -> String {
    let mut out = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

impl MemorySource {
    pub fn new(superblock_version: u8) -> Self {
        Self {
            superblock_version,
            arrays: BTreeMap::new(),
        }
    }

    /// Store an array at `path`, replacing any previous one.
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>, shape: Shape) -> &mut Self {
        self.arrays.insert(normalize(path), (bytes, shape));
        self
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, path: &str, bytes: Vec<u8>, shape: Shape) -> Self {
        self.insert(path, bytes, shape);
        self
    }
}

impl DatasetSource for MemorySource {
    fn superblock_version(&self) -> u8 {
        self.superblock_version
    }

    fn keys(&self, path: &str) -> Result<Vec<String>, Error> {
        let group = normalize(path);
        if self.arrays.contains_key(&group) {
            return Err(Error::NotFound(format!("{group} is not a group")));
        }
        let prefix = if group == "/" { group.clone() } else { format!("{group}/") };
        let names: BTreeSet<&str> = self
            .arrays
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .collect();
        if names.is_empty() && group != "/" {
            return Err(Error::NotFound(group));
        }
        Ok(names.into_iter().map(String::from).collect())
    }

    fn read_buffer(&self, path: &str) -> Result<(Vec<u8>, Shape), Error> {
        let key = normalize(path);
        match self.arrays.get(&key) {
            Some((bytes, shape)) => Ok((bytes.clone(), shape.clone())),
            None if self.keys(&key).is_ok() => Err(Error::NotADataset(key)),
            None => Err(Error::NotFound(key)),
        }
    }
}
