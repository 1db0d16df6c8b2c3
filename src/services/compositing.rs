//! Mask extraction and alpha compositing

use crate::{
    error::{Result, SplicerError},
    types::SegmentationMask,
    utils::LetterboxGeometry,
};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::Array4;

/// Pixel-level compositing operations
pub struct Compositor;

impl Compositor {
    /// Turn a raw model output into a mask the size of the source image
    ///
    /// Crops the letterbox padding out of the prediction, maps probabilities to
    /// 0..=255 and resizes to `source_dimensions`. The output may be a different
    /// resolution than the model input; the crop is scaled accordingly.
    ///
    /// # Errors
    /// - Output tensor with no batch or channel
    /// - Degenerate source dimensions
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn tensor_to_mask(
        tensor: &Array4<f32>,
        geometry: &LetterboxGeometry,
        source_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        let (batch, channels, height, width) = tensor.dim();
        if batch == 0 || channels == 0 || height == 0 || width == 0 {
            return Err(SplicerError::processing(format!(
                "Invalid output tensor shape {:?}",
                tensor.dim()
            )));
        }

        let scale_x = width as f32 / geometry.target_size as f32;
        let scale_y = height as f32 / geometry.target_size as f32;

        let x0 = ((geometry.offset_x as f32 * scale_x).round() as usize).min(width - 1);
        let y0 = ((geometry.offset_y as f32 * scale_y).round() as usize).min(height - 1);
        let crop_width = ((geometry.scaled_width as f32 * scale_x).round() as usize)
            .clamp(1, width - x0);
        let crop_height = ((geometry.scaled_height as f32 * scale_y).round() as usize)
            .clamp(1, height - y0);

        let mut data = Vec::with_capacity(crop_width * crop_height);
        for y in y0..y0 + crop_height {
            for x in x0..x0 + crop_width {
                let value = tensor.get([0, 0, y, x]).copied().unwrap_or(0.0);
                data.push(Self::probability_to_alpha(value));
            }
        }

        let cropped = SegmentationMask::new(data, (crop_width as u32, crop_height as u32));
        cropped.resize(source_dimensions.0, source_dimensions.1)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn probability_to_alpha(value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Keep the source only where the mask is opaque
    ///
    /// Output alpha is `source_alpha * mask / 255`; color channels are untouched.
    ///
    /// # Errors
    /// Returns a processing error when mask and image dimensions differ
    pub fn destination_in(image: &DynamicImage, mask: &SegmentationMask) -> Result<RgbaImage> {
        let mut rgba = image.to_rgba8();
        if rgba.dimensions() != mask.dimensions {
            return Err(SplicerError::processing(format!(
                "Mask {}x{} does not match image {}x{}",
                mask.dimensions.0,
                mask.dimensions.1,
                rgba.width(),
                rgba.height()
            )));
        }
        if mask.data.len() != rgba.pixels().len() {
            return Err(SplicerError::processing("Mask data does not match its dimensions"));
        }

        for (pixel, &coverage) in rgba.pixels_mut().zip(mask.data.iter()) {
            let Rgba([_, _, _, alpha]) = *pixel;
            pixel.0[3] = Self::mul_div_255(alpha, coverage);
        }
        Ok(rgba)
    }

    /// Flatten an RGBA image onto an opaque color
    #[must_use]
    pub fn flatten_onto(image: &RgbaImage, background: [u8; 3]) -> RgbImage {
        let (width, height) = image.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
            let inverse = 255 - a;
            Rgb([
                Self::mul_div_255(r, a) + Self::mul_div_255(background[0], inverse),
                Self::mul_div_255(g, a) + Self::mul_div_255(background[1], inverse),
                Self::mul_div_255(b, a) + Self::mul_div_255(background[2], inverse),
            ])
        })
    }

    /// `a * b / 255`, rounded
    #[allow(clippy::cast_possible_truncation)]
    fn mul_div_255(a: u8, b: u8) -> u8 {
        let product = u32::from(a) * u32::from(b) + 128;
        ((product + (product >> 8)) >> 8) as u8
    }
}
