//! Input format recognition and output naming

use std::path::{Path, PathBuf};

use crate::error::{BatchScaleError, Result};

/// Extension given to every produced file
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Get supported input formats
pub fn supported_input_formats() -> &'static [&'static str] {
    &["png", "jpg", "jpeg"]
}

/// Check if a file extension is supported for input
pub fn is_supported_input_format(extension: &str) -> bool {
    supported_input_formats()
        .iter()
        .any(|&fmt| fmt.eq_ignore_ascii_case(extension))
}

/// Check whether a path names a supported input image
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_input_format)
}

/// Destination file for a source image: `dest_dir/<stem>.jpg`.
///
/// The source directory structure is flattened, so equal stems from
/// different subdirectories map to the same output file.
pub fn output_path_for(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let stem = source.file_stem().ok_or_else(|| {
        BatchScaleError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source path has no file name"),
        )
    })?;

    // set_extension would eat a dotted stem like "scan.v2"
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(OUTPUT_EXTENSION);
    Ok(dest_dir.join(file_name))
}
