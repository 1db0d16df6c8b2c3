//! Model cache management for downloaded models
//!
//! Downloaded ONNX files live in an XDG-compliant cache directory, one file per
//! model id, so a restarted service does not fetch the model again.

use crate::error::{Result, SplicerError};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache location
pub const CACHE_DIR_ENV: &str = "PHOTO_SPLICER_CACHE_DIR";

/// Model cache manager
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache manager
    ///
    /// Uses `$PHOTO_SPLICER_CACHE_DIR/models` when set, otherwise:
    /// - Linux/macOS: `~/.cache/photo-splicer/models/`
    /// - Windows: `%LOCALAPPDATA%/photo-splicer/models/`
    ///
    /// # Errors
    /// - Failed to determine cache directory
    /// - Failed to create cache directory
    pub fn new() -> Result<Self> {
        let cache_dir = Self::default_cache_dir()?;
        Self::with_custom_cache_dir(&cache_dir)
    }

    /// Use a specific directory as the cache root
    ///
    /// # Errors
    /// - Failed to create the directory
    pub fn with_custom_cache_dir(cache_dir: &Path) -> Result<Self> {
        if !cache_dir.exists() {
            fs::create_dir_all(cache_dir).map_err(|e| {
                SplicerError::file_io_error("create cache directory", cache_dir, &e)
            })?;
        }

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    fn default_cache_dir() -> Result<PathBuf> {
        if let Ok(cache_override) = std::env::var(CACHE_DIR_ENV) {
            return Ok(PathBuf::from(cache_override).join("models"));
        }

        Ok(dirs::cache_dir()
            .ok_or_else(|| {
                SplicerError::invalid_config(format!(
                    "Failed to determine cache directory. Set {} environment variable.",
                    CACHE_DIR_ENV
                ))
            })?
            .join("photo-splicer")
            .join("models"))
    }

    /// Generate a cache-safe model id from a URL
    ///
    /// Hugging Face file URLs become `owner--repo--file`; anything else is
    /// identified by a SHA-256 prefix.
    ///
    /// # Examples
    /// ```
    /// use photo_splicer::cache::ModelCache;
    ///
    /// let id = ModelCache::url_to_model_id(
    ///     "https://huggingface.co/briaai/RMBG-1.4/resolve/main/onnx/model.onnx",
    /// );
    /// assert_eq!(id, "briaai--RMBG-1.4--model");
    /// ```
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let prefix = "https://huggingface.co/";
        if let Some(path) = url.strip_prefix(prefix) {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            if let (Some(owner), Some(repo), Some(file)) =
                (segments.first(), segments.get(1), segments.last())
            {
                if segments.len() > 2 {
                    let stem = file.strip_suffix(".onnx").unwrap_or(file);
                    return format!("{}--{}--{}", owner, repo, stem);
                }
            }
            return path.replace('/', "--");
        }

        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash_string = format!("url-{:x}", hasher.finalize());
        hash_string.get(..20).unwrap_or(&hash_string).to_string()
    }

    /// Path the model with this id is (or will be) stored at
    #[must_use]
    pub fn model_path(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.onnx", model_id))
    }

    /// Check if a non-empty model file is cached
    #[must_use]
    pub fn is_model_cached(&self, model_id: &str) -> bool {
        fs::metadata(self.model_path(model_id))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Remove a cached model, returning whether anything was deleted
    ///
    /// # Errors
    /// - Failed to delete the file
    pub fn clear_model(&self, model_id: &str) -> Result<bool> {
        let path = self.model_path(model_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .map_err(|e| SplicerError::file_io_error("remove cached model", &path, &e))?;
        Ok(true)
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
