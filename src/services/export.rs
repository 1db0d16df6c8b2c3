//! Download export with an optional background color

use crate::{
    error::Result,
    services::{Compositor, ImageIOService},
    types::{BackgroundColor, ExportedImage},
};
use bytes::Bytes;

/// JPEG quality used for solid-background exports
pub const EXPORT_JPEG_QUALITY: u8 = 90;

/// File name offered for transparent exports
pub const TRANSPARENT_FILE_NAME: &str = "splicer-result.png";

/// File name offered for solid-background exports
pub const SOLID_FILE_NAME: &str = "splicer-result.jpg";

/// Turns a transparent cut-out into the file the user downloads
pub struct ExportService;

impl ExportService {
    /// Export a cut-out PNG with the chosen background
    ///
    /// Transparent exports return the input bytes unchanged. Solid colors are
    /// painted behind the cut-out and encoded as JPEG.
    ///
    /// # Errors
    /// - Input is not a decodable image
    /// - JPEG encoding failure
    pub fn export(cutout_png: Bytes, background: BackgroundColor) -> Result<ExportedImage> {
        match background {
            BackgroundColor::Transparent => Ok(ExportedImage {
                bytes: cutout_png,
                content_type: "image/png",
                file_name: TRANSPARENT_FILE_NAME,
            }),
            BackgroundColor::Solid { r, g, b } => {
                let cutout = ImageIOService::load_from_bytes(&cutout_png)?.to_rgba8();
                let flattened = Compositor::flatten_onto(&cutout, [r, g, b]);
                let jpeg = ImageIOService::encode_jpeg(&flattened, EXPORT_JPEG_QUALITY)?;
                log::debug!(
                    "Exported {}x{} cut-out onto {} ({} bytes)",
                    flattened.width(),
                    flattened.height(),
                    background,
                    jpeg.len()
                );
                Ok(ExportedImage {
                    bytes: Bytes::from(jpeg),
                    content_type: "image/jpeg",
                    file_name: SOLID_FILE_NAME,
                })
            },
        }
    }
}
