//! Segmentation model resolution and loading

use crate::{
    cache::ModelCache,
    config::LocalModelConfig,
    download::ModelDownloader,
    error::{Result, SplicerError},
};
use log::{debug, info};
use std::path::PathBuf;

/// Where the segmentation model comes from
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ModelSource {
    /// ONNX file on the local filesystem
    External(PathBuf),
    /// ONNX file fetched over HTTP(S)
    Remote(String),
}

impl ModelSource {
    /// Pick the source for a local pipeline configuration
    ///
    /// A configured path wins over the URL, but only while local models are allowed.
    ///
    /// # Errors
    /// Returns `SplicerError::InvalidConfig` when a path is configured but local models are disallowed
    pub fn from_config(config: &LocalModelConfig) -> Result<Self> {
        match &config.model_path {
            Some(path) if config.allow_local_models => Ok(Self::External(path.clone())),
            Some(path) => Err(SplicerError::invalid_config(format!(
                "Local model '{}' configured but local models are not allowed",
                path.display()
            ))),
            None => Ok(Self::Remote(config.model_url.clone())),
        }
    }

    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            ModelSource::External(path) => format!(
                "external:{}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
            ModelSource::Remote(url) => format!("remote:{}", ModelCache::url_to_model_id(url)),
        }
    }
}

/// Input normalization expected by the model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreprocessingConfig {
    /// Side of the square model input
    pub target_size: u32,
    /// Per-channel mean subtracted after scaling to 0..1
    pub normalization_mean: [f32; 3],
    /// Per-channel std divided after mean subtraction
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// RMBG-style normalization at the given input size
    #[must_use]
    pub fn rmbg(target_size: u32) -> Self {
        Self {
            target_size,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self::rmbg(1024)
    }
}

/// Resolves a `LocalModelConfig` to raw ONNX bytes
#[derive(Debug)]
pub struct ModelLoader {
    source: ModelSource,
    use_cache: bool,
    cache_dir: Option<PathBuf>,
}

impl ModelLoader {
    /// Create a loader for the given configuration
    ///
    /// # Errors
    /// See [`ModelSource::from_config`]
    pub fn from_config(config: &LocalModelConfig) -> Result<Self> {
        Ok(Self {
            source: ModelSource::from_config(config)?,
            use_cache: config.use_cache,
            cache_dir: config.cache_dir.clone(),
        })
    }

    #[must_use]
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Load the model bytes, downloading (and caching) remote models as needed
    ///
    /// # Errors
    /// - Local file missing or unreadable
    /// - Download failures
    /// - Cache directory errors
    pub async fn load(&self) -> Result<Vec<u8>> {
        match &self.source {
            ModelSource::External(path) => {
                info!("Loading local model from {}", path.display());
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|e| SplicerError::file_io_error("read model file", path, &e))?;
                Self::check_not_empty(&data, &self.source)?;
                Ok(data)
            },
            ModelSource::Remote(url) => {
                let downloader = ModelDownloader::new()?;
                let data = if self.use_cache {
                    let cache = match &self.cache_dir {
                        Some(dir) => ModelCache::with_custom_cache_dir(dir)?,
                        None => ModelCache::new()?,
                    };
                    let path = downloader.download_to_cache(url, &cache).await?;
                    debug!("Reading cached model {}", path.display());
                    tokio::fs::read(&path)
                        .await
                        .map_err(|e| SplicerError::file_io_error("read cached model", &path, &e))?
                } else {
                    info!("Model cache disabled, fetching {} into memory", url);
                    downloader.fetch(url).await?
                };
                Self::check_not_empty(&data, &self.source)?;
                Ok(data)
            },
        }
    }

    fn check_not_empty(data: &[u8], source: &ModelSource) -> Result<()> {
        if data.is_empty() {
            return Err(SplicerError::model(format!(
                "Model {} is empty",
                source.display_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_selection() {
        let mut config = LocalModelConfig::default();
        assert!(matches!(
            ModelSource::from_config(&config).unwrap(),
            ModelSource::Remote(_)
        ));

        config.model_path = Some(PathBuf::from("/models/rmbg.onnx"));
        let source = ModelSource::from_config(&config).unwrap();
        assert_eq!(source.display_name(), "external:rmbg.onnx");

        config.allow_local_models = false;
        assert!(ModelSource::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_load_external_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not really onnx").unwrap();

        let config = LocalModelConfig {
            model_path: Some(path),
            ..LocalModelConfig::default()
        };
        let data = ModelLoader::from_config(&config).unwrap().load().await.unwrap();
        assert_eq!(data, b"not really onnx");
    }

    #[tokio::test]
    async fn test_load_missing_or_empty_model() {
        let dir = TempDir::new().unwrap();

        let config = LocalModelConfig {
            model_path: Some(dir.path().join("missing.onnx")),
            ..LocalModelConfig::default()
        };
        let err = ModelLoader::from_config(&config).unwrap().load().await.unwrap_err();
        assert_eq!(err.category(), "io");

        let empty = dir.path().join("empty.onnx");
        std::fs::write(&empty, b"").unwrap();
        let config = LocalModelConfig {
            model_path: Some(empty),
            ..LocalModelConfig::default()
        };
        let err = ModelLoader::from_config(&config).unwrap().load().await.unwrap_err();
        assert_eq!(err.category(), "model");
    }
}
