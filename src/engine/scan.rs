// src/engine/scan.rs
//
// Recursive directory listing used to build batch inputs.

use crate::config::ScanConfig;
use crate::error::LunarzError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

type ScanResult<T> = std::result::Result<T, LunarzError>;

/// Image files under `root` whose extension the config accepts, sorted by path.
///
/// Entries that can't be read are skipped with a warning. A root that is
/// missing or not a directory is an error.
pub fn scan_directory(root: &Path, config: &ScanConfig) -> ScanResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(LunarzError::scan_failed(
            root.display().to_string(),
            "does not exist or is not a directory",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(config.follow_links)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "lunarz::scan", error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let accepted = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.accepts(ext));
        if accepted {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
