//! Per-file transform: decode, scale, encode, write

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ResizeConfig;
use crate::error::{BatchScaleError, ErrorContext, Result};

pub mod codec;
pub mod formats;
pub mod resize;

pub use codec::*;
pub use formats::*;
pub use resize::*;

/// Runs the transform for one file at a time.
///
/// The transformer holds no per-file state, so one instance is shared by
/// every worker of a batch.
pub struct ImageTransformer {
    codec: Arc<dyn ImageCodec>,
    quality: u8,
    filter: FilterType,
}

impl ImageTransformer {
    /// Create a transformer using the `image` crate codec
    pub fn new(config: &ResizeConfig) -> Self {
        Self::with_codec(Arc::new(StandardCodec), config)
    }

    /// Create a transformer with a custom codec
    pub fn with_codec(codec: Arc<dyn ImageCodec>, config: &ResizeConfig) -> Self {
        Self {
            codec,
            quality: config.quality,
            filter: config.filter,
        }
    }

    /// Transform one source image into `dest_dir/<stem>.jpg`.
    ///
    /// The JPEG is fully encoded in memory before anything touches the
    /// destination, so a decode or encode failure writes nothing. The file
    /// is staged next to its target and renamed over it; concurrent writers
    /// of the same name leave one complete file, never a mix.
    pub fn process_one(
        &self,
        source: &Path,
        dest_dir: &Path,
        scale: f64,
    ) -> Result<ProcessedImage> {
        let start_time = Instant::now();
        let output = output_path_for(source, dest_dir)?;

        debug!("Processing file: {:?} -> {:?}", source, output);

        let raster = self.codec.decode(source).with_file_context(source)?;
        let (source_width, source_height) = (raster.width(), raster.height());

        let (width, height) = target_dimensions(source_width, source_height, scale);
        debug!("Target dimensions: {}x{} -> {}x{}", source_width, source_height, width, height);

        let resized = self.codec.resize(&raster, width, height, self.filter);
        drop(raster);

        let encoded = self.codec.encode_jpeg(&resized, self.quality)
            .with_file_context(source)?;

        write_replacing(&output, &encoded)?;

        let processing_time = start_time.elapsed();
        debug!("Wrote {:?} ({} bytes) in {:.3}s", output, encoded.len(), processing_time.as_secs_f64());

        Ok(ProcessedImage {
            source: source.to_path_buf(),
            output,
            source_width,
            source_height,
            width,
            height,
            bytes_written: encoded.len() as u64,
            processing_time,
        })
    }
}

/// Write `bytes` to a sibling staging file, then rename it over `output`
fn write_replacing(output: &Path, bytes: &[u8]) -> Result<()> {
    static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut staged_name = OsString::from(".");
    staged_name.push(output.file_name().unwrap_or_default());
    staged_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let staged = output.with_file_name(staged_name);

    let written = std::fs::write(&staged, bytes).and_then(|()| std::fs::rename(&staged, output));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&staged);
        return Err(BatchScaleError::io(output, e));
    }

    Ok(())
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new(&ResizeConfig::default())
    }
}

/// Result of transforming one image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
    pub bytes_written: u64,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30])))
            .save(path)
            .unwrap();
    }

    /// Delegates to the standard codec but fails every encode
    struct FailingEncoder {
        encodes: AtomicUsize,
    }

    impl ImageCodec for FailingEncoder {
        fn decode(&self, path: &Path) -> Result<Raster> {
            StandardCodec.decode(path)
        }

        fn resize(&self, raster: &Raster, width: u32, height: u32, filter: FilterType) -> Raster {
            StandardCodec.resize(raster, width, height, filter)
        }

        fn encode_jpeg(&self, _raster: &Raster, _quality: u8) -> Result<Vec<u8>> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            Err(BatchScaleError::encode(
                None,
                image::ImageError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
            ))
        }
    }

    #[test]
    fn test_process_one_scales_and_writes_jpeg() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = src.path().join("wide.png");
        write_png(&source, 101, 50);

        let result = ImageTransformer::default()
            .process_one(&source, dest.path(), 0.5)
            .unwrap();

        assert_eq!(result.output, dest.path().join("wide.jpg"));
        assert_eq!((result.width, result.height), (50, 25));
        assert_eq!((result.source_width, result.source_height), (101, 50));

        let written = image::open(&result.output).unwrap();
        assert_eq!((written.width(), written.height()), (50, 25));
        assert_eq!(std::fs::metadata(&result.output).unwrap().len(), result.bytes_written);
    }

    #[test]
    fn test_process_one_overwrites_existing_output() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = src.path().join("photo.png");
        write_png(&source, 20, 20);
        std::fs::write(dest.path().join("photo.jpg"), b"stale").unwrap();

        ImageTransformer::default().process_one(&source, dest.path(), 1.0).unwrap();

        let written = image::open(dest.path().join("photo.jpg")).unwrap();
        assert_eq!((written.width(), written.height()), (20, 20));
    }

    #[test]
    fn test_write_replacing_leaves_no_staging_file() {
        let dest = TempDir::new().unwrap();
        let output = dest.path().join("out.jpg");

        write_replacing(&output, b"first").unwrap();
        write_replacing(&output, b"second").unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dest = TempDir::new().unwrap();
        let output = dest.path().join("absent/out.jpg");

        let err = write_replacing(&output, b"data").unwrap_err();
        assert!(matches!(err, BatchScaleError::IoError { .. }));
        assert_eq!(err.file_path(), Some(output.as_path()));
    }

    #[test]
    fn test_decode_failure_writes_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = src.path().join("corrupt.jpg");
        std::fs::write(&source, b"\xFF\xD8 truncated").unwrap();

        let err = ImageTransformer::default()
            .process_one(&source, dest.path(), 0.5)
            .unwrap_err();

        assert!(matches!(err, BatchScaleError::DecodeError { .. }));
        assert!(!dest.path().join("corrupt.jpg").exists());
    }

    #[test]
    fn test_encode_failure_writes_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = src.path().join("fine.png");
        write_png(&source, 8, 8);

        let codec = Arc::new(FailingEncoder { encodes: AtomicUsize::new(0) });
        let transformer = ImageTransformer::with_codec(codec.clone(), &ResizeConfig::default());
        let err = transformer.process_one(&source, dest.path(), 0.5).unwrap_err();

        assert!(matches!(err, BatchScaleError::EncodeError { .. }));
        assert_eq!(err.file_path(), Some(source.as_path()));
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
        assert!(!dest.path().join("fine.jpg").exists());
    }

    #[test]
    fn test_degenerate_scale_surfaces_codec_error() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = src.path().join("tiny.png");
        write_png(&source, 4, 4);

        let err = ImageTransformer::default()
            .process_one(&source, dest.path(), 0.1)
            .unwrap_err();

        assert!(matches!(err, BatchScaleError::EncodeError { .. }));
        assert!(!dest.path().join("tiny.jpg").exists());
    }
}
