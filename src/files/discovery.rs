//! Recursive discovery of source images

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{BatchScaleError, Result};
use crate::processing::has_supported_extension;

/// Find every `.png`, `.jpg` and `.jpeg` file under `root`.
///
/// Extensions match case-insensitively. The result is sorted
/// lexicographically by path so that batch order is reproducible. A missing
/// or unreadable root, or any unreadable directory below it, is an error.
pub fn find_images<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();

    let metadata = std::fs::metadata(root).map_err(|e| BatchScaleError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(BatchScaleError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source path is not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() && has_supported_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("Found {} images under {:?}", files.len(), root);
    Ok(files)
}
