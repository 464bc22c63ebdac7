//! Image cleanup before recognition.

use deck_core::{Error, Preprocessor, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::io::Cursor;

/// Resolution the source pictures are assumed to have.
const BASE_DPI: f32 = 150.0;

/// Upscaling never grows the longer side past this many pixels.
const MAX_SIDE: u32 = 4000;

/// Width the skew estimate is computed at.
const SKEW_SAMPLE_WIDTH: u32 = 400;

/// Largest skew corrected, in degrees.
const MAX_SKEW_DEGREES: f32 = 5.0;
const SKEW_STEP_DEGREES: f32 = 0.5;

/// Grayscale, median denoise, histogram equalization, optional deskew and a
/// dpi-driven upscale. Output is always PNG.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    median_radius: u32,
    deskew: bool,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            median_radius: 1,
            deskew: true,
        }
    }
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_median_radius(mut self, radius: u32) -> Self {
        self.median_radius = radius;
        self
    }

    pub fn with_deskew(mut self, deskew: bool) -> Self {
        self.deskew = deskew;
        self
    }

    /// Run the cleanup steps on a decoded image.
    pub fn process(&self, image: &DynamicImage, dpi: u32) -> GrayImage {
        let gray = image.to_luma8();
        let denoised = if self.median_radius > 0 {
            median_filter(&gray, self.median_radius, self.median_radius)
        } else {
            gray
        };
        let mut enhanced = equalize_histogram(&denoised);

        if self.deskew {
            let angle = estimate_skew(&enhanced);
            if angle.abs() >= SKEW_STEP_DEGREES {
                log::debug!("Deskewing image by {:.1} degrees", angle);
                enhanced = rotate_about_center(
                    &enhanced,
                    -angle.to_radians(),
                    Interpolation::Bilinear,
                    Luma([255u8]),
                );
            }
        }

        let (width, height) = upscaled_size(enhanced.width(), enhanced.height(), dpi);
        if (width, height) != enhanced.dimensions() {
            enhanced = imageops::resize(&enhanced, width, height, FilterType::CatmullRom);
        }
        enhanced
    }
}

impl Preprocessor for ImagePreprocessor {
    fn preprocess(&self, image: &[u8], dpi: u32) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| Error::Preprocess(format!("cannot decode image: {}", e)))?;
        let processed = self.process(&decoded, dpi);

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(processed)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Preprocess(format!("cannot encode PNG: {}", e)))?;
        Ok(png)
    }
}

/// Size after scaling by `dpi / 150`, capped at [`MAX_SIDE`]. Never shrinks.
fn upscaled_size(width: u32, height: u32, dpi: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as f32;
    let factor = (dpi as f32 / BASE_DPI).min(MAX_SIDE as f32 / longest);
    if factor <= 1.0 {
        return (width, height);
    }
    (
        (width as f32 * factor).round() as u32,
        (height as f32 * factor).round() as u32,
    )
}

/// Skew angle in degrees that best aligns dark text rows horizontally.
///
/// Tries each candidate rotation on a downsampled copy and keeps the one
/// whose row profile of dark pixels has the highest variance.
pub fn estimate_skew(image: &GrayImage) -> f32 {
    if image.width() < 2 || image.height() < 2 {
        return 0.0;
    }

    let sample = if image.width() > SKEW_SAMPLE_WIDTH {
        let height = (image.height() as u64 * SKEW_SAMPLE_WIDTH as u64 / image.width() as u64).max(1) as u32;
        imageops::resize(image, SKEW_SAMPLE_WIDTH, height, FilterType::Triangle)
    } else {
        image.clone()
    };
    let level = otsu_level(&sample);

    let steps = (MAX_SKEW_DEGREES / SKEW_STEP_DEGREES) as i32;
    let mut best = (0.0f32, row_profile_variance(&sample, level));
    for step in -steps..=steps {
        if step == 0 {
            continue;
        }
        let angle = step as f32 * SKEW_STEP_DEGREES;
        let rotated = rotate_about_center(&sample, -angle.to_radians(), Interpolation::Nearest, Luma([255u8]));
        let score = row_profile_variance(&rotated, level);
        if score > best.1 {
            best = (angle, score);
        }
    }
    best.0
}

fn row_profile_variance(image: &GrayImage, level: u8) -> f64 {
    let rows: Vec<f64> = image
        .rows()
        .map(|row| row.filter(|p| p.0[0] < level).count() as f64)
        .collect();
    if rows.is_empty() {
        return 0.0;
    }
    let mean = rows.iter().sum::<f64>() / rows.len() as f64;
    rows.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| if y % 10 < 3 { Luma([0]) } else { Luma([255]) })
    }

    fn png(image: GrayImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_upscaled_size() {
        assert_eq!(upscaled_size(100, 50, 300), (200, 100));
        assert_eq!(upscaled_size(100, 50, 150), (100, 50));
        assert_eq!(upscaled_size(100, 50, 72), (100, 50));
        assert_eq!(upscaled_size(3000, 1000, 600), (4000, 1333));
    }

    #[test]
    fn test_preprocess_outputs_scaled_grayscale_png() {
        let output = ImagePreprocessor::new()
            .preprocess(&png(striped(60, 40)), 300)
            .unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_horizontal_text_is_not_rotated() {
        assert_eq!(estimate_skew(&striped(200, 100)), 0.0);
    }

    #[test]
    fn test_undecodable_bytes() {
        let err = ImagePreprocessor::new().preprocess(b"not an image", 300).unwrap_err();
        assert!(matches!(err, Error::Preprocess(_)));
    }
}
