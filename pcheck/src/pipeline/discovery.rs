//! Dump file discovery
//!
//! Lists the dump files directly inside a group's dump directory. Matching is
//! on file extension only (case-insensitive); sub-directories are not walked.
//! Results are sorted by path so scheduling order is reproducible.

use pcheck_common::{DumpFile, Group};
use std::path::Path;
use walkdir::WalkDir;

/// Find all dump files of one group.
///
/// A missing directory yields an empty list with a warning.
pub fn discover_dump_files(dir: &Path, group: Group, extensions: &[String]) -> Vec<DumpFile> {
    if !dir.is_dir() {
        tracing::warn!(group = %group, dir = %dir.display(), "Dump directory not found");
        return Vec::new();
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_dump_extension(entry.path(), extensions) {
                    files.push(DumpFile::new(entry.path(), group));
                }
            }
            Err(e) => {
                // Continue scanning, don't abort
                tracing::warn!(group = %group, "Error accessing entry: {}", e);
            }
        }
    }

    tracing::debug!(
        group = %group,
        dir = %dir.display(),
        count = files.len(),
        "Dump files discovered"
    );
    files
}

fn has_dump_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .map(|ext| extensions.iter().any(|allowed| *allowed == ext))
        .unwrap_or(false)
}
