//! Model downloading
//!
//! Streams an ONNX file into a temp file next to its cache slot, then renames
//! it into place, so a crash mid-download never leaves a truncated model in the
//! cache.

use crate::cache::ModelCache;
use crate::error::{Result, SplicerError};
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Model downloads can be hundreds of megabytes
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Model downloader
#[derive(Debug, Clone)]
pub struct ModelDownloader {
    client: Client,
}

impl ModelDownloader {
    /// Create a new model downloader
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| SplicerError::network_error("Failed to create HTTP client", e))?;

        Ok(Self { client })
    }

    /// Download a model into the cache unless it is already there
    ///
    /// Returns the path of the cached file.
    ///
    /// # Errors
    /// - Invalid model URL
    /// - Network errors or non-success HTTP status
    /// - File system errors while writing the cache
    pub async fn download_to_cache(&self, url: &str, cache: &ModelCache) -> Result<PathBuf> {
        validate_model_url(url)?;

        let model_id = ModelCache::url_to_model_id(url);
        let final_path = cache.model_path(&model_id);
        if cache.is_model_cached(&model_id) {
            log::info!("Model already cached: {}", model_id);
            return Ok(final_path);
        }

        log::info!("Downloading model {} from {}", model_id, url);
        let response = self.start_download(url).await?;

        // Removed on drop unless persisted
        let temp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".onnx")
            .tempfile_in(cache.cache_dir())
            .map_err(|e| SplicerError::file_io_error("create download file", cache.cache_dir(), &e))?;
        let (std_file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut hasher = Sha256::new();
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SplicerError::network_error("Failed to read download stream", e))?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| SplicerError::file_io_error("write to file", &temp_path, &e))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| SplicerError::file_io_error("flush file", &temp_path, &e))?;
        drop(file);

        if downloaded == 0 {
            return Err(SplicerError::model(format!("Downloaded model {} is empty", model_id)));
        }

        temp_path.persist(&final_path).map_err(|e| {
            SplicerError::file_io_error("move downloaded model to cache", &final_path, &e.error)
        })?;

        log::info!(
            "Cached model {} ({} bytes, sha256 {:x})",
            model_id,
            downloaded,
            hasher.finalize()
        );
        Ok(final_path)
    }

    /// Download a model straight into memory, bypassing the cache
    ///
    /// # Errors
    /// - Invalid model URL
    /// - Network errors or non-success HTTP status
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        validate_model_url(url)?;

        let response = self.start_download(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SplicerError::network_error("Failed to read model body", e))?;

        log::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    async fn start_download(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SplicerError::network_error(&format!("Failed to download {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SplicerError::model(format!(
                "HTTP error {} while downloading {}",
                status, url
            )));
        }
        Ok(response)
    }
}

/// Validate that a model URL can be downloaded
///
/// # Errors
/// Returns `SplicerError::InvalidConfig` for empty or non-HTTP(S) URLs
pub fn validate_model_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(SplicerError::invalid_config("Model URL cannot be empty"));
    }

    let has_host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'));
    if !has_host {
        return Err(SplicerError::invalid_config(format!(
            "Unsupported model URL: {}. Expected http:// or https://",
            url
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_model_url() {
        assert!(validate_model_url(crate::config::DEFAULT_MODEL_URL).is_ok());
        assert!(validate_model_url("http://localhost:8080/model.onnx").is_ok());

        for url in ["", "   ", "ftp://host/model.onnx", "https://", "https:///model.onnx", "model.onnx"] {
            let err = validate_model_url(url).unwrap_err();
            assert_eq!(err.category(), "configuration", "url {:?}", url);
        }
    }

    #[tokio::test]
    async fn test_cached_model_skips_network() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::with_custom_cache_dir(dir.path()).unwrap();

        // Unroutable URL: only succeeds if the cache short-circuits
        let url = "http://127.0.0.1:9/unreachable/model.onnx";
        let cached = cache.model_path(&ModelCache::url_to_model_id(url));
        std::fs::write(&cached, b"cached").unwrap();

        let path = ModelDownloader::new()
            .unwrap()
            .download_to_cache(url, &cache)
            .await
            .unwrap();
        assert_eq!(path, cached);
    }
}
