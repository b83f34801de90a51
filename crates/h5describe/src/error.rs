//! Error types for the high-level API.

use std::fmt;
use std::path::PathBuf;

use h5describe_format::error::FormatError;
use h5describe_format::message_type::MessageType;

/// Result alias for the high-level API.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the description of one master file.
#[derive(Debug)]
pub enum Error {
    /// I/O error from the filesystem.
    Io(std::io::Error),
    /// Low-level format parsing error.
    Format(FormatError),
    /// No object exists at the given path.
    NotFound(String),
    /// The object at the given path is not a dataset.
    NotADataset(String),
    /// A required header message was not found.
    MissingMessage(MessageType),
    /// The file uses a feature this reader does not implement.
    Unsupported(String),
    /// Failure inside a file reached through an external link.
    ExternalFile {
        file: PathBuf,
        source: Box<Error>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Format(e) => write!(f, "HDF5 format error: {e}"),
            Error::NotFound(path) => write!(f, "no such object: {path}"),
            Error::NotADataset(path) => write!(f, "not a dataset: {path}"),
            Error::MissingMessage(mt) => write!(f, "missing required message: {mt:?}"),
            Error::Unsupported(what) => write!(f, "unsupported: {what}"),
            Error::ExternalFile { file, source } => {
                write!(f, "in external file {}: {source}", file.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Format(e) => Some(e),
            Error::ExternalFile { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::PathNotFound(path) => Error::NotFound(path),
            FormatError::MissingMessage(id) => Error::MissingMessage(MessageType::from(id)),
            FormatError::DenseLinkStorage => Error::Unsupported("dense link storage".into()),
            FormatError::UnsupportedLayout(what) => Error::Unsupported(what),
            FormatError::UnsupportedFilter(id) => Error::Unsupported(format!("filter {id}")),
            other => Error::Format(other),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl Error {
    /// The error at the end of a chain of external links.
    pub fn innermost(&self) -> &Error {
        match self {
            Error::ExternalFile { source, .. } => source.innermost(),
            other => other,
        }
    }
}
