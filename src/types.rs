//! Core types shared by the removal strategies, the export step and the UI

use crate::error::{Result, SplicerError};
use crate::utils::ColorParser;
use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-pixel alpha mask produced by a segmentation model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.as_raw().clone(), (width, height))
    }

    /// Convert mask to a grayscale image
    ///
    /// # Errors
    /// Returns a processing error when `data` does not cover `dimensions`
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, self.data.clone()).ok_or_else(
            || SplicerError::processing("Mask data does not match its dimensions"),
        )
    }

    /// Resize the mask to new dimensions
    ///
    /// # Errors
    /// Returns a processing error for zero target dimensions or inconsistent mask data
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        if new_width == 0 || new_height == 0 {
            return Err(SplicerError::processing(format!(
                "Cannot resize mask to {}x{}",
                new_width, new_height
            )));
        }
        if self.dimensions == (new_width, new_height) {
            return Ok(self.clone());
        }

        let resized = image::imageops::resize(
            &self.to_image()?,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );
        Ok(Self::from_image(&resized))
    }

    /// Fraction of pixels considered foreground (alpha > 127)
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let foreground = self.data.iter().filter(|&&value| value > 127).count();
        foreground as f32 / self.data.len() as f32
    }
}

/// Background placed behind the cut-out subject at download time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackgroundColor {
    /// Keep the transparent PNG as returned by the endpoint
    #[default]
    Transparent,
    /// Flatten onto an opaque RGB color
    Solid { r: u8, g: u8, b: u8 },
}

impl BackgroundColor {
    /// Solid color from components
    #[must_use]
    pub const fn solid(r: u8, g: u8, b: u8) -> Self {
        Self::Solid { r, g, b }
    }

    /// The fixed palette offered next to the free-form picker
    pub const PALETTE: [(&'static str, BackgroundColor); 5] = [
        ("Transparent", BackgroundColor::Transparent),
        ("White", BackgroundColor::solid(0xff, 0xff, 0xff)),
        ("Black", BackgroundColor::solid(0x00, 0x00, 0x00)),
        ("Red", BackgroundColor::solid(0xff, 0x00, 0x00)),
        ("Blue", BackgroundColor::solid(0x25, 0x63, 0xeb)),
    ];

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transparent => write!(f, "transparent"),
            Self::Solid { r, g, b } => f.write_str(&ColorParser::to_hex(*r, *g, *b)),
        }
    }
}

impl FromStr for BackgroundColor {
    type Err = SplicerError;

    /// Accepts `transparent`, a palette name, `#rrggbb` or `#rgb`
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if let Some((_, color)) = Self::PALETTE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
        {
            return Ok(*color);
        }
        ColorParser::parse_hex(value)
    }
}

/// An encoded image ready to be offered for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    /// Encoded bytes
    pub bytes: bytes::Bytes,
    /// MIME type of `bytes`
    pub content_type: &'static str,
    /// Suggested download file name
    pub file_name: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_resize_matches_target() {
        let mask = SegmentationMask::new(vec![255; 16], (4, 4));
        let resized = mask.resize(10, 6).unwrap();
        assert_eq!(resized.dimensions, (10, 6));
        assert_eq!(resized.data.len(), 60);
        assert!(resized.data.iter().all(|&v| v == 255));

        assert!(mask.resize(0, 6).is_err());
    }

    #[test]
    fn test_mask_with_short_data_is_rejected() {
        let mask = SegmentationMask::new(vec![0; 3], (2, 2));
        assert!(mask.to_image().is_err());
    }

    #[test]
    fn test_foreground_ratio() {
        let mask = SegmentationMask::new(vec![0, 0, 255, 200], (2, 2));
        assert!((mask.foreground_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_background_color_parsing() {
        assert_eq!(
            "transparent".parse::<BackgroundColor>().unwrap(),
            BackgroundColor::Transparent
        );
        assert_eq!(
            "blue".parse::<BackgroundColor>().unwrap(),
            BackgroundColor::solid(0x25, 0x63, 0xeb)
        );
        assert_eq!(
            "#F00".parse::<BackgroundColor>().unwrap(),
            BackgroundColor::solid(255, 0, 0)
        );
        assert!("#12345".parse::<BackgroundColor>().is_err());
        assert_eq!(BackgroundColor::solid(1, 2, 255).to_string(), "#0102ff");
    }
}
