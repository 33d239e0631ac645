//! Resampling filters and target dimension arithmetic

use serde::{Deserialize, Serialize};

/// Available resize filters.
///
/// Only interpolating filters are offered; nearest-neighbor sampling is
/// not a valid choice for the output this crate produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Lanczos with radius 3 (high quality, recommended)
    #[default]
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Compute output dimensions for a scale factor.
///
/// Each side is `source * scale` truncated toward zero. Nothing is clamped:
/// a small or non-positive factor yields zero-sized sides and the codec
/// decides how to react. NaN and negative products saturate to 0.
pub fn target_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (scale_side(width, scale), scale_side(height, scale))
}

fn scale_side(side: u32, scale: f64) -> u32 {
    // `as` truncates toward zero and saturates at the u32 bounds
    (f64::from(side) * scale) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions_truncate() {
        assert_eq!(target_dimensions(1000, 800, 0.5), (500, 400));
        assert_eq!(target_dimensions(101, 99, 0.5), (50, 49));
        assert_eq!(target_dimensions(3, 3, 0.9), (2, 2));
        assert_eq!(target_dimensions(10, 20, 1.5), (15, 30));
    }

    #[test]
    fn test_target_dimensions_degenerate() {
        assert_eq!(target_dimensions(10, 10, 0.01), (0, 0));
        assert_eq!(target_dimensions(10, 10, 0.0), (0, 0));
        assert_eq!(target_dimensions(10, 10, -2.0), (0, 0));
        assert_eq!(target_dimensions(10, 10, f64::NAN), (0, 0));
    }

    #[test]
    fn test_filter_conversion() {
        let filter: image::imageops::FilterType = FilterType::default().into();
        assert_eq!(filter, image::imageops::FilterType::Lanczos3);
    }
}
