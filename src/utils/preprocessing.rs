//! Image preprocessing for segmentation model input

use crate::{
    error::{Result, SplicerError},
    models::PreprocessingConfig,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Where the scaled source image sits inside the square model input
///
/// The same geometry is needed again after inference to crop the padding
/// back out of the predicted mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterboxGeometry {
    /// Side of the square model input
    pub target_size: u32,
    /// Width of the scaled source inside the canvas
    pub scaled_width: u32,
    /// Height of the scaled source inside the canvas
    pub scaled_height: u32,
    /// Horizontal padding before the source
    pub offset_x: u32,
    /// Vertical padding before the source
    pub offset_y: u32,
}

impl LetterboxGeometry {
    /// Compute the aspect-preserving fit of `width`x`height` into a `target_size` square
    ///
    /// # Errors
    /// Returns a processing error for empty images or a zero target size
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn fit(width: u32, height: u32, target_size: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SplicerError::processing(format!(
                "Cannot preprocess an empty {}x{} image",
                width, height
            )));
        }
        if target_size == 0 {
            return Err(SplicerError::processing("Model input size must be non-zero"));
        }

        let target = target_size as f32;
        let scale = (target / width as f32).min(target / height as f32);

        // At least one pixel, never past the canvas
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            target_size,
            scaled_width,
            scaled_height,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
        })
    }
}

/// Model input preprocessing
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Padding used around the letterboxed source
    const PADDING: [u8; 3] = [255, 255, 255];

    /// Preprocess an image for inference
    ///
    /// - RGB conversion
    /// - Aspect ratio preserving resize
    /// - Center padding to the square target size
    /// - Normalization to an NCHW tensor
    ///
    /// # Errors
    /// Returns a processing error for empty images or a zero target size
    pub fn preprocess(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, LetterboxGeometry)> {
        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();
        let geometry = LetterboxGeometry::fit(orig_width, orig_height, config.target_size)?;

        let resized = image::imageops::resize(
            &rgb_image,
            geometry.scaled_width,
            geometry.scaled_height,
            image::imageops::FilterType::Triangle,
        );

        let mut canvas: RgbImage = ImageBuffer::from_pixel(
            geometry.target_size,
            geometry.target_size,
            image::Rgb(Self::PADDING),
        );
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(geometry.offset_x),
            i64::from(geometry.offset_y),
        );

        Ok((Self::canvas_to_tensor(&canvas, config), geometry))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = f32::from(pixel.0.get(channel).copied().unwrap_or(0)) / 255.0;
                let mean = config.normalization_mean.get(channel).copied().unwrap_or(0.0);
                let std = config.normalization_std.get(channel).copied().unwrap_or(1.0);
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = (value - mean) / std;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: size,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_letterbox_landscape() {
        let geometry = LetterboxGeometry::fit(200, 100, 64).unwrap();
        assert_eq!(geometry.scaled_width, 64);
        assert_eq!(geometry.scaled_height, 32);
        assert_eq!(geometry.offset_x, 0);
        assert_eq!(geometry.offset_y, 16);
    }

    #[test]
    fn test_letterbox_rejects_empty() {
        assert!(LetterboxGeometry::fit(0, 10, 64).is_err());
        assert!(LetterboxGeometry::fit(10, 10, 0).is_err());
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, image::Rgb([255, 0, 0])));
        let (tensor, geometry) = ImagePreprocessor::preprocess(&image, &config(32)).unwrap();

        assert_eq!(tensor.dim(), (1, 3, 32, 32));
        assert_eq!(geometry.scaled_height, 32);

        // Inside the source: red maps to 0.5, green to -0.5
        let cx = (geometry.offset_x + geometry.scaled_width / 2) as usize;
        assert!((tensor[[0, 0, 16, cx]] - 0.5).abs() < 1e-3);
        assert!((tensor[[0, 1, 16, cx]] + 0.5).abs() < 1e-3);

        // White padding on the left edge
        assert!((tensor[[0, 1, 16, 0]] - 0.5).abs() < 1e-3);
    }
}
