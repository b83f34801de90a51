//! Error types for HDF5 format parsing.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt;

/// Errors that can occur when parsing HDF5 binary format structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The HDF5 magic signature was not found at any valid offset.
    SignatureNotFound,
    /// The superblock version is not supported.
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header signature.
    InvalidObjectHeaderSignature,
    /// Invalid object header version.
    InvalidObjectHeaderVersion(u8),
    /// Unknown message type that is marked as must-understand.
    UnsupportedMessage(u16),
    /// A message an object of this kind must carry is absent.
    MissingMessage(u16),
    /// Stored lookup3 metadata checksum does not match the computed one.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Dataspace message version other than 1 or 2.
    InvalidDataspaceVersion(u8),
    /// Dataspace type byte other than scalar/simple/null.
    InvalidDataspaceType(u8),
    /// Datatype class outside 0..=10.
    InvalidDatatypeClass(u8),
    /// Data layout message version other than 3 or 4.
    InvalidLayoutVersion(u8),
    /// Data layout class outside compact/contiguous/chunked/virtual.
    InvalidLayoutClass(u8),
    /// Filter pipeline message version other than 1 or 2.
    InvalidFilterPipelineVersion(u8),
    /// A filter in the pipeline is not implemented (or its feature is off).
    UnsupportedFilter(u16),
    /// A filter rejected its input.
    FilterError(String),
    /// A compression backend failed.
    DecompressionError(String),
    /// Local heap signature is not `HEAP`.
    InvalidLocalHeapSignature,
    /// Local heap version other than 0.
    InvalidLocalHeapVersion(u8),
    /// B-tree v1 node signature is not `TREE`.
    InvalidBTreeSignature,
    /// B-tree v1 node has the wrong node type for the traversal.
    InvalidBTreeNodeType(u8),
    /// Symbol table node signature is not `SNOD`.
    InvalidSymbolTableNodeSignature,
    /// Symbol table node version other than 1.
    InvalidSymbolTableNodeVersion(u8),
    /// Link message version other than 1.
    InvalidLinkVersion(u8),
    /// Link type code that is neither hard, soft, nor external.
    InvalidLinkType(u8),
    /// A name stored in the file is not valid UTF-8.
    InvalidUtf8,
    /// A path component could not be found.
    PathNotFound(String),
    /// Group uses fractal-heap (dense) link storage.
    DenseLinkStorage,
    /// Chunked dataset could not be assembled.
    ChunkedReadError(String),
    /// Dataset layout that cannot be read by this crate.
    UnsupportedLayout(String),
    /// A size derived from stored dimensions overflows, exceeds the largest
    /// buffer this crate allocates, or does not fit its on-disk field.
    ImplausibleSize(&'static str),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any valid offset")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderSignature => {
                write!(f, "invalid object header signature")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "invalid object header version: {v}")
            }
            FormatError::UnsupportedMessage(id) => {
                write!(
                    f,
                    "unsupported message type {id:#06x} marked as must-understand"
                )
            }
            FormatError::MissingMessage(id) => {
                write!(f, "required header message {id:#06x} is missing")
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => write!(f, "invalid dataspace type: {t}"),
            FormatError::InvalidDatatypeClass(c) => write!(f, "invalid datatype class: {c}"),
            FormatError::InvalidLayoutVersion(v) => {
                write!(f, "invalid data layout version: {v}")
            }
            FormatError::InvalidLayoutClass(c) => write!(f, "invalid data layout class: {c}"),
            FormatError::InvalidFilterPipelineVersion(v) => {
                write!(f, "invalid filter pipeline version: {v}")
            }
            FormatError::UnsupportedFilter(id) => write!(f, "unsupported filter id {id}"),
            FormatError::FilterError(msg) => write!(f, "filter error: {msg}"),
            FormatError::DecompressionError(msg) => write!(f, "decompression error: {msg}"),
            FormatError::InvalidLocalHeapSignature => write!(f, "invalid local heap signature"),
            FormatError::InvalidLocalHeapVersion(v) => {
                write!(f, "invalid local heap version: {v}")
            }
            FormatError::InvalidBTreeSignature => write!(f, "invalid B-tree signature"),
            FormatError::InvalidBTreeNodeType(t) => write!(f, "invalid B-tree node type: {t}"),
            FormatError::InvalidSymbolTableNodeSignature => {
                write!(f, "invalid symbol table node signature")
            }
            FormatError::InvalidSymbolTableNodeVersion(v) => {
                write!(f, "invalid symbol table node version: {v}")
            }
            FormatError::InvalidLinkVersion(v) => write!(f, "invalid link message version: {v}"),
            FormatError::InvalidLinkType(t) => write!(f, "invalid link type: {t}"),
            FormatError::InvalidUtf8 => write!(f, "name is not valid UTF-8"),
            FormatError::PathNotFound(p) => write!(f, "path not found: {p}"),
            FormatError::DenseLinkStorage => {
                write!(f, "group uses dense link storage, which is not supported")
            }
            FormatError::ChunkedReadError(msg) => write!(f, "chunked read error: {msg}"),
            FormatError::UnsupportedLayout(msg) => write!(f, "unsupported data layout: {msg}"),
            FormatError::ImplausibleSize(what) => write!(f, "implausible {what} size"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
