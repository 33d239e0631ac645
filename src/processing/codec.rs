//! Codec collaborator: decode, resample and JPEG-encode rasters

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::{ColorType, DynamicImage};
use tracing::debug;

use crate::error::{BatchScaleError, ErrorContext, Result};
use crate::processing::FilterType;

/// Decoded pixel data
pub type Raster = DynamicImage;

/// Image codec used by the transformer.
///
/// Implementations must be shareable across worker threads; every call
/// works on its own buffers.
pub trait ImageCodec: Send + Sync {
    /// Read and decode an image file
    fn decode(&self, path: &Path) -> Result<Raster>;

    /// Resample to exactly `width` x `height`
    fn resize(&self, raster: &Raster, width: u32, height: u32, filter: FilterType) -> Raster;

    /// Encode as baseline JPEG
    fn encode_jpeg(&self, raster: &Raster, quality: u8) -> Result<Vec<u8>>;
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl ImageCodec for StandardCodec {
    fn decode(&self, path: &Path) -> Result<Raster> {
        let data = std::fs::read(path).with_file_context(path)?;

        let raster = image::load_from_memory(&data)
            .map_err(|e| BatchScaleError::decode(path, e))?;

        debug!("Decoded {:?}: {}x{}", path, raster.width(), raster.height());
        Ok(raster)
    }

    fn resize(&self, raster: &Raster, width: u32, height: u32, filter: FilterType) -> Raster {
        if width == 0 || height == 0 {
            // Nothing to sample; the encoder rejects the empty raster
            return DynamicImage::new_rgb8(width, height);
        }

        if width == raster.width() && height == raster.height() {
            return raster.clone();
        }

        raster.resize_exact(width, height, filter.into())
    }

    fn encode_jpeg(&self, raster: &Raster, quality: u8) -> Result<Vec<u8>> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(BatchScaleError::encode(
                None,
                ImageError::Parameter(ParameterError::from_kind(
                    ParameterErrorKind::DimensionMismatch,
                )),
            ));
        }

        // JPEG has no alpha channel and only 8-bit samples
        let rgb = raster.to_rgb8();
        let mut buffer = Vec::new();

        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| BatchScaleError::encode(None, e))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> Raster {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128, 200])
        }))
    }

    #[test]
    fn test_decode_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.png");
        gradient(12, 8).save(&path).unwrap();

        let raster = StandardCodec.decode(&path).unwrap();
        assert_eq!((raster.width(), raster.height()), (12, 8));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = StandardCodec.decode(&path).unwrap_err();
        assert!(matches!(err, BatchScaleError::DecodeError { .. }));
        assert_eq!(err.file_path(), Some(path.as_path()));
    }

    #[test]
    fn test_decode_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = StandardCodec.decode(&dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, BatchScaleError::IoError { .. }));
    }

    #[test]
    fn test_resize_exact_dimensions() {
        let resized = StandardCodec.resize(&gradient(40, 10), 13, 7, FilterType::Lanczos3);
        assert_eq!((resized.width(), resized.height()), (13, 7));
    }

    #[test]
    fn test_encode_alpha_source_as_jpeg() {
        let bytes = StandardCodec.encode_jpeg(&gradient(16, 16), 100).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_encode_empty_raster_fails() {
        let empty = StandardCodec.resize(&gradient(4, 4), 0, 2, FilterType::Triangle);
        let err = StandardCodec.encode_jpeg(&empty, 100).unwrap_err();
        assert!(matches!(err, BatchScaleError::EncodeError { .. }));
    }
}
