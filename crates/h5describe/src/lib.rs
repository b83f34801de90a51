//! Describe detector HDF5 master files and check their data entries for
//! consistency.
//!
//! This crate sits on top of `h5describe-format` and `h5describe-io`.
//!
//! # Describing a file
//!
//! ```no_run
//! use h5describe::{describe, DescribeOptions};
//!
//! let report = describe("scan_master.h5".as_ref(), &DescribeOptions::default()).unwrap();
//! println!("{report}");
//! ```
//!
//! # Reading a dataset
//!
//! ```no_run
//! use h5describe::File;
//!
//! let file = File::open("scan_master.h5").unwrap();
//! let (bytes, shape) = file.read_buffer("/entry/data/data_000001").unwrap();
//! println!("{} bytes, shape {:?}", bytes.len(), shape);
//! ```

pub mod consistency;
pub mod descriptor;
pub mod error;
pub mod reader;
pub mod source;
pub mod walk;

pub use consistency::{ConsistencyChecker, Fingerprint, MismatchKind, Shape};
pub use descriptor::{describe, describe_source, DatasetDescriptor, DescribeOptions, Diagnostic, Report};
pub use error::Error;
pub use reader::{Dataset, File};
pub use source::{DatasetSource, MemorySource};
pub use walk::{find_master_files, MASTER_SUFFIX};

pub use h5describe_format::checksum::{hashlittle2, lookup3};
