//! Pure-Rust parsing of the HDF5 structures needed to locate a dataset and
//! read its stored bytes, plus the lookup3 hash HDF5 uses for metadata
//! checksums.
//!
//! Supports `no_std` environments with the `alloc` crate. The compression
//! filters need the `deflate` and `lz4` features, which imply `std`.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod bytes;

pub mod btree_v1;
pub mod checksum;
pub mod chunked_read;
pub mod data_layout;
pub mod data_read;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod filter_pipeline;
pub mod filters;
pub mod group;
pub mod link_message;
pub mod local_heap;
pub mod message_type;
pub mod object_header;
pub mod signature;
pub mod superblock;
pub mod symbol_table;

pub use checksum::{hashlittle, hashlittle2};
pub use error::FormatError;
