//! Image I/O operations service
//!
//! Decoding uploads, encoding results and the temporary files used when the
//! local pipeline runs in temp-file mode.

use crate::error::{Result, SplicerError};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Service for image decoding and encoding
pub struct ImageIOService;

impl ImageIOService {
    /// Decode an uploaded image, detecting the format from its content
    ///
    /// # Errors
    /// - Empty payload
    /// - Unrecognized or corrupt image data
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(SplicerError::processing("Empty image payload"));
        }
        let format = image::guess_format(bytes)?;
        log::debug!("Decoding {} byte {:?} upload", bytes.len(), format);
        Ok(image::load_from_memory_with_format(bytes, format)?)
    }

    /// Load an image from a file path
    ///
    /// The file content decides the format, so upload files need no meaningful
    /// extension. Falls back to extension-based detection when sniffing fails.
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Unrecognized or corrupt image data
    pub async fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();
        let data = tokio::fs::read(path_ref)
            .await
            .map_err(|e| SplicerError::file_io_error("read image file", path_ref, &e))?;

        match Self::load_from_bytes(&data) {
            Ok(image) => Ok(image),
            Err(content_err) => {
                let Some(format) = ImageFormat::from_path(path_ref).ok() else {
                    return Err(content_err);
                };
                log::debug!(
                    "Content-based detection failed for {}: {}. Trying {:?}.",
                    path_ref.display(),
                    content_err,
                    format
                );
                Ok(image::load_from_memory_with_format(&data, format)?)
            },
        }
    }

    /// Encode an RGBA image as PNG, keeping the alpha channel
    ///
    /// # Errors
    /// Propagates encoder failures
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Encode an opaque image as JPEG at the given quality (1-100)
    ///
    /// # Errors
    /// Propagates encoder failures
    pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        image.write_with_encoder(encoder)?;
        Ok(buffer)
    }
}

/// An upload written to disk, removed again when dropped
///
/// Removal failures are logged and never surface as request errors.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    /// Write `bytes` to a uniquely named file in `dir`
    ///
    /// # Errors
    /// Returns an I/O error when the file cannot be written; any partial file is removed
    pub async fn create(dir: &Path, bytes: &[u8]) -> Result<Self> {
        let upload = Self {
            path: dir.join(format!("splicer-{}.upload", uuid::Uuid::new_v4())),
        };
        tokio::fs::write(&upload.path, bytes)
            .await
            .map_err(|e| SplicerError::file_io_error("write upload", &upload.path, &e))?;
        log::debug!("Wrote {} byte upload to {}", bytes.len(), upload.path.display());
        Ok(upload)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => log::warn!(
                "Failed to remove temporary upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn red_png() -> Vec<u8> {
        ImageIOService::encode_png(&RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]))).unwrap()
    }

    #[test]
    fn test_png_roundtrip_keeps_alpha() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let decoded =
            ImageIOService::load_from_bytes(&ImageIOService::encode_png(&image).unwrap()).unwrap();
        assert_eq!(decoded.to_rgba8(), image);
    }

    #[test]
    fn test_load_rejects_empty_and_garbage() {
        assert_eq!(ImageIOService::load_from_bytes(&[]).unwrap_err().category(), "processing");
        assert_eq!(
            ImageIOService::load_from_bytes(b"definitely not an image").unwrap_err().category(),
            "image"
        );
    }

    #[test]
    fn test_encode_jpeg() {
        let jpeg = ImageIOService::encode_jpeg(&RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255])), 90)
            .unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_temp_upload_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let upload = TempUpload::create(dir.path(), &red_png()).await.unwrap();

        let name = upload.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("splicer-") && name.ends_with(".upload"));

        let image = ImageIOService::load_image(upload.path()).await.unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));

        drop(upload);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_temp_upload_in_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let err = TempUpload::create(&dir.path().join("missing"), b"x").await.unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
