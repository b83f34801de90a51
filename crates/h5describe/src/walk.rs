//! Locating master files under a directory tree.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// File name suffix of detector master files.
pub const MASTER_SUFFIX: &str = "_master.h5";

/// Every regular file under `root` whose name ends with `suffix`, in
/// directory-walk order with siblings sorted by name.
///
/// Entries that cannot be read are logged and skipped. Paths under `.` are
/// returned without the leading `./`.
pub fn find_master_files(root: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matches {
            let path = entry.path();
            found.push(path.strip_prefix(".").unwrap_or(path).to_path_buf());
        }
    }
    found
}
