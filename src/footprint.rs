//! Edge-density prefilter for candidate track photographs
//!
//! A usable track photo has pronounced contours (the print outline) against
//! a comparatively flat background. The filter grayscales and blurs the
//! image, then measures the fraction of pixels whose local gradient exceeds
//! a threshold; candidates below the cutoff are assumed to be logos, flat
//! color swatches, or otherwise unusable.

use image::{DynamicImage, GrayImage};

/// Tuning for [`has_strong_edges`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFilterOptions {
    /// Gaussian blur sigma applied before gradient measurement
    pub blur_sigma: f32,
    /// Minimum gradient magnitude for a pixel to count as an edge
    pub gradient_threshold: u16,
    /// Minimum fraction of edge pixels for the image to pass
    pub min_edge_fraction: f64,
}

impl Default for EdgeFilterOptions {
    fn default() -> Self {
        Self {
            blur_sigma: 1.4,
            gradient_threshold: 40,
            min_edge_fraction: 0.02,
        }
    }
}

/// Whether the image shows enough contour structure to plausibly be a track
/// photograph
pub fn has_strong_edges(image: &DynamicImage, options: &EdgeFilterOptions) -> bool {
    let gray = image.to_luma8();
    if gray.width() < 3 || gray.height() < 3 {
        return false;
    }

    let blurred = image::imageops::blur(&gray, options.blur_sigma.max(0.1));
    edge_fraction(&blurred, options.gradient_threshold) >= options.min_edge_fraction
}

/// Fraction of interior pixels whose central-difference gradient magnitude
/// meets the threshold
fn edge_fraction(gray: &GrayImage, threshold: u16) -> f64 {
    let (width, height) = gray.dimensions();
    let mut edge_pixels = 0u64;
    let mut total = 0u64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = i32::from(gray.get_pixel(x + 1, y)[0]) - i32::from(gray.get_pixel(x - 1, y)[0]);
            let gy = i32::from(gray.get_pixel(x, y + 1)[0]) - i32::from(gray.get_pixel(x, y - 1)[0]);
            let magnitude = ((gx * gx + gy * gy) as f64).sqrt();

            if magnitude >= f64::from(threshold) {
                edge_pixels += 1;
            }
            total += 1;
        }
    }

    if total == 0 {
        0.0
    } else {
        edge_pixels as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn flat_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])))
    }

    fn striped_image() -> DynamicImage {
        let mut img = RgbImage::new(64, 64);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            let v = if (x / 4) % 2 == 0 { 0 } else { 255 };
            *pixel = Rgb([v, v, v]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_flat_image_fails() {
        assert!(!has_strong_edges(&flat_image(), &EdgeFilterOptions::default()));
    }

    #[test]
    fn test_high_contrast_image_passes() {
        assert!(has_strong_edges(&striped_image(), &EdgeFilterOptions::default()));
    }

    #[test]
    fn test_tiny_image_fails() {
        let tiny = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(!has_strong_edges(&tiny, &EdgeFilterOptions::default()));
    }
}
