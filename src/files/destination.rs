//! Destination directory management

use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BatchScaleError, Result};

/// Make sure `dest` exists, creating parents as needed.
///
/// Existing contents are left alone; later writes overwrite files with
/// the same name.
pub fn prepare<P: AsRef<Path>>(dest: P) -> Result<()> {
    let dest = dest.as_ref();
    std::fs::create_dir_all(dest).map_err(|e| BatchScaleError::io(dest, e))?;
    debug!("Destination ready: {:?}", dest);
    Ok(())
}

/// Delete every file below `dest`, creating it if absent.
///
/// Directories are kept. Returns the number of files removed.
pub fn clean<P: AsRef<Path>>(dest: P) -> Result<usize> {
    let dest = dest.as_ref();

    if !dest.exists() {
        prepare(dest)?;
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(dest) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        std::fs::remove_file(entry.path()).map_err(|e| BatchScaleError::io(entry.path(), e))?;
        removed += 1;
    }

    info!("Cleaned {} files from {:?}", removed, dest);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn count_files(root: &Path) -> usize {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .count()
    }

    #[test]
    fn test_prepare_creates_parents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a/b/c");

        prepare(&dest).unwrap();
        assert!(dest.is_dir());
    }

    #[test]
    fn test_prepare_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.jpg"), b"data").unwrap();

        prepare(dir.path()).unwrap();
        assert!(dir.path().join("keep.jpg").exists());
    }

    #[test]
    fn test_prepare_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, b"data").unwrap();

        assert!(matches!(prepare(&file), Err(BatchScaleError::IoError { .. })));
    }

    #[test]
    fn test_clean_removes_files_keeps_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/inner")).unwrap();
        fs::write(root.join("top.jpg"), b"1").unwrap();
        fs::write(root.join("sub/notes.txt"), b"2").unwrap();
        fs::write(root.join("sub/inner/deep.png"), b"3").unwrap();

        let removed = clean(root).unwrap();

        assert_eq!(removed, 3);
        assert_eq!(count_files(root), 0);
        assert!(root.join("sub/inner").is_dir());
    }

    #[test]
    fn test_clean_creates_missing_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("fresh");

        assert_eq!(clean(&dest).unwrap(), 0);
        assert!(dest.is_dir());
    }
}
