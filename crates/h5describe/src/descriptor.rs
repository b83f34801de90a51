//! Per-file description of a detector master file.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use h5describe_format::signature::{HeaderProbe, HDF5_SIGNATURE, PROBE_LEN};

use crate::consistency::{auxiliary, ConsistencyChecker, Fingerprint, MismatchKind, Shape};
use crate::error::Error;
use crate::reader::File;
use crate::source::DatasetSource;

/// Where the describer looks inside a master file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeOptions {
    /// Group whose members are the repeated data entries.
    pub data_group: String,
    /// Group holding the optional auxiliary arrays.
    pub detector_group: String,
    pub pixel_mask: String,
    pub flatfield: String,
    /// Read data entries that live in other files. When off, external
    /// entries are listed but not hashed.
    pub follow_external: bool,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self {
            data_group: "/entry/data".into(),
            detector_group: "/entry/instrument/detector/detectorSpecific".into(),
            pixel_mask: "pixel_mask".into(),
            flatfield: "flatfield".into(),
            follow_external: true,
        }
    }
}

/// What was learned about one master file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    pub master_file: String,
    pub superblock_version: u8,
    pub data_entries: Vec<String>,
    pub pm_checksum: i64,
    pub pm_shape: Shape,
    pub ff_checksum: i64,
    pub ff_shape: Shape,
    pub data_checksum: i64,
    pub data_shape: Shape,
}

/// A non-fatal finding about one master file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "diagnostic", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The first 8 bytes are not the HDF5 signature.
    MalformedHeader { found: [u8; 8] },
    /// A data entry disagrees with the first one.
    InconsistentEntries { entry: String, kind: MismatchKind },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedHeader { .. } => f.write_str("BAD HEADER"),
            Diagnostic::InconsistentEntries { entry, kind } => {
                write!(f, "ERROR: hdf5 with changing data entries ({kind}): {entry}")
            }
        }
    }
}

/// Descriptor plus the diagnostics raised while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub descriptor: DatasetDescriptor,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn is_consistent(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// `()`, `(5,)`, `(2, 3)`.
struct Tuple<'a>(&'a [u64]);

impl fmt::Display for Tuple<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => f.write_str("()"),
            [one] => write!(f, "({one},)"),
            [first, rest @ ..] => {
                write!(f, "({first}")?;
                for d in rest {
                    write!(f, ", {d}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DatasetDescriptor(master_file='{}', superblock_version={}, data_entries=[",
            self.master_file, self.superblock_version
        )?;
        for (i, e) in self.data_entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{e}'")?;
        }
        write!(
            f,
            "], pm_checksum={}, pm_shape={}, ff_checksum={}, ff_shape={}, \
             data_checksum={}, data_shape={})",
            self.pm_checksum,
            Tuple(&self.pm_shape),
            self.ff_checksum,
            Tuple(&self.ff_shape),
            self.data_checksum,
            Tuple(&self.data_shape),
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.diagnostics {
            writeln!(f, "{d}")?;
        }
        write!(f, "{}", self.descriptor)
    }
}

fn join(group: &str, name: &str) -> String {
    format!("{}/{}", group.trim_end_matches('/'), name)
}

/// Fingerprint of `group/name`, or the absent record when the member (or
/// the group itself) does not exist.
fn read_auxiliary<S: DatasetSource + ?Sized>(
    source: &S,
    group: &str,
    name: &str,
) -> Result<Fingerprint, Error> {
    let present = match source.contains(group, name) {
        Ok(present) => present,
        Err(Error::NotFound(_)) => false,
        Err(e) => return Err(e),
    };
    if !present {
        debug!(group, name, "auxiliary array absent");
        return Ok(auxiliary(None));
    }
    let (bytes, shape) = source.read_buffer(&join(group, name))?;
    Ok(auxiliary(Some((bytes.as_slice(), shape.as_slice()))))
}

/// The data entries that get hashed: all of them, or only the local ones
/// when external links are not followed.
fn hashed_entries<'n, S: DatasetSource + ?Sized>(
    source: &S,
    options: &DescribeOptions,
    names: &'n [String],
) -> Result<Vec<&'n str>, Error> {
    let mut hashed = Vec::with_capacity(names.len());
    for name in names {
        if !options.follow_external && source.is_external(&join(&options.data_group, name))? {
            debug!(entry = %name, "external data entry not hashed");
            continue;
        }
        hashed.push(name.as_str());
    }
    Ok(hashed)
}

/// Describe the container behind `source`, reported under `master_file`.
///
/// The first hashed data entry is the reference; every other hashed entry
/// is compared with it. Read failures abort the description, mismatches
/// do not.
pub fn describe_source<S: DatasetSource + Sync + ?Sized>(
    master_file: &str,
    source: &S,
    options: &DescribeOptions,
) -> Result<Report, Error> {
    let group = options.data_group.as_str();
    let data_entries = source.keys(group)?;
    if data_entries.is_empty() {
        return Err(Error::NotFound(format!("{group} has no members")));
    }

    let pixel_mask = read_auxiliary(source, &options.detector_group, &options.pixel_mask)?;
    let flatfield = read_auxiliary(source, &options.detector_group, &options.flatfield)?;

    let mut diagnostics = Vec::new();
    let hashed = hashed_entries(source, options, &data_entries)?;
    let data = match hashed.split_first() {
        None => auxiliary(None),
        Some((reference, rest)) => {
            let (bytes, shape) = source.read_buffer(&join(group, reference))?;
            let checker = ConsistencyChecker::new(&bytes, &shape);
            drop(bytes);
            for m in checker.check_all(rest, |name| source.read_buffer(&join(group, name)))? {
                warn!(file = master_file, entry = %m.entry, kind = %m.kind, "inconsistent data entry");
                diagnostics.push(Diagnostic::InconsistentEntries {
                    entry: m.entry,
                    kind: m.kind,
                });
            }
            checker.into_reference()
        }
    };

    let descriptor = DatasetDescriptor {
        master_file: master_file.to_string(),
        superblock_version: source.superblock_version(),
        data_entries,
        pm_checksum: pixel_mask.checksum,
        pm_shape: pixel_mask.shape,
        ff_checksum: flatfield.checksum,
        ff_shape: flatfield.shape,
        data_checksum: data.checksum,
        data_shape: data.shape,
    };
    Ok(Report {
        descriptor,
        diagnostics,
    })
}

/// Describe the master file at `path`.
///
/// The signature check and the superblock version come from the first
/// nine bytes of the file, before it is parsed.
pub fn describe(path: &Path, options: &DescribeOptions) -> Result<Report, Error> {
    let prefix = h5describe_io::read_prefix(path, PROBE_LEN)?;
    let probe = HeaderProbe::parse(&prefix)?;

    let mut header_diagnostics = Vec::new();
    if !probe.has_valid_signature() {
        warn!(file = %path.display(), found = ?probe.magic, expected = ?HDF5_SIGNATURE, "bad header");
        header_diagnostics.push(Diagnostic::MalformedHeader { found: probe.magic });
    }

    let file = File::open(path)?;
    let mut report = describe_source(&path.display().to_string(), &file, options)?;
    report.descriptor.superblock_version = probe.version;
    header_diagnostics.append(&mut report.diagnostics);
    report.diagnostics = header_diagnostics;

    info!(
        file = %path.display(),
        entries = report.descriptor.data_entries.len(),
        diagnostics = report.diagnostics.len(),
        "described"
    );
    Ok(report)
}
