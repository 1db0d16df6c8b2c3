//! Configuration types for the background removal service

use crate::error::{Result, SplicerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default remove.bg endpoint
pub const DEFAULT_REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Value shipped in sample environments in place of a real key
pub const PLACEHOLDER_API_KEY: &str = "PASTE_YOUR_REMOVE_BG_KEY_HERE";

/// Default segmentation model (RMBG 1.4, ONNX export)
pub const DEFAULT_MODEL_URL: &str =
    "https://huggingface.co/briaai/RMBG-1.4/resolve/main/onnx/model.onnx";

/// Default maximum request body size (20 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = SplicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" | "core-ml" => Ok(Self::CoreMl),
            other => Err(SplicerError::invalid_config(format!(
                "Unknown execution provider '{}' (expected auto, cpu, cuda or coreml)",
                other
            ))),
        }
    }
}

/// Which removal strategy a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalBackendKind {
    /// Third-party remove.bg compatible HTTP API
    #[default]
    RemoteApi,
    /// Local ONNX segmentation model
    LocalModel,
}

impl std::fmt::Display for RemovalBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteApi => write!(f, "remote-api"),
            Self::LocalModel => write!(f, "local-model"),
        }
    }
}

impl FromStr for RemovalBackendKind {
    type Err = SplicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "remote-api" | "remote" | "removebg" | "remove-bg" => Ok(Self::RemoteApi),
            "local-model" | "local" | "onnx" => Ok(Self::LocalModel),
            other => Err(SplicerError::invalid_config(format!(
                "Unknown removal backend '{}' (expected remote-api or local-model)",
                other
            ))),
        }
    }
}

/// How the local pipeline receives the uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Decode the buffered bytes directly
    #[default]
    Memory,
    /// Spill the bytes to a uniquely named temporary file first
    TempFile,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::TempFile => write!(f, "temp-file"),
        }
    }
}

impl FromStr for InputMode {
    type Err = SplicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "temp-file" | "tempfile" | "file" => Ok(Self::TempFile),
            other => Err(SplicerError::invalid_config(format!(
                "Unknown input mode '{}' (expected memory or temp-file)",
                other
            ))),
        }
    }
}

/// Settings for the remote removal API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteApiConfig {
    /// API key sent as `X-Api-Key`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Endpoint receiving the multipart upload
    pub endpoint: String,
    /// Value of the `size` form field
    pub size: String,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_REMOVE_BG_ENDPOINT.to_string(),
            size: "auto".to_string(),
            timeout_secs: 60,
        }
    }
}

impl RemoteApiConfig {
    /// The configured key, unless it is missing, blank or the placeholder
    #[must_use]
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

/// Settings for the local segmentation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct LocalModelConfig {
    /// Local ONNX file, only honoured when `allow_local_models` is set
    pub model_path: Option<PathBuf>,
    /// Remote ONNX file used when no local path is configured
    pub model_url: String,
    /// Permit loading models from the local filesystem
    pub allow_local_models: bool,
    /// Keep downloaded models in the cache directory across restarts
    pub use_cache: bool,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// How uploads reach the pipeline
    pub input_mode: InputMode,
    /// Directory for temporary uploads (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// ONNX Runtime execution provider
    pub execution_provider: ExecutionProvider,
    /// Number of intra-op threads (0 = auto)
    pub intra_threads: usize,
    /// Square model input size in pixels
    pub target_size: u32,
    /// Load the model at startup instead of on the first request
    pub eager_init: bool,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_url: DEFAULT_MODEL_URL.to_string(),
            allow_local_models: true,
            use_cache: true,
            cache_dir: None,
            input_mode: InputMode::default(),
            temp_dir: None,
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
            target_size: 1024,
            eager_init: false,
        }
    }
}

/// Configuration for the HTTP service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Number of HTTP workers (0 = one per core)
    pub workers: usize,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
    /// Removal strategy for this deployment
    pub backend: RemovalBackendKind,
    /// Remote API settings
    pub remote: RemoteApiConfig,
    /// Local pipeline settings
    pub local: LocalModelConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            workers: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            backend: RemovalBackendKind::default(),
            remote: RemoteApiConfig::default(),
            local: LocalModelConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use photo_splicer::config::{RemovalBackendKind, ServiceConfig};
    ///
    /// let config = ServiceConfig::builder()
    ///     .backend(RemovalBackendKind::RemoteApi)
    ///     .api_key("my-key")
    ///     .port(8080)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.bind_address(), "127.0.0.1:8080");
    /// ```
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// `host:port` string for binding
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    /// - Zero body limit
    /// - Malformed remote endpoint
    /// - Local model path configured while local models are disallowed
    /// - Zero model input size
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            return Err(SplicerError::invalid_config(
                "Maximum body size must be greater than zero",
            ));
        }

        match self.backend {
            RemovalBackendKind::RemoteApi => {
                let endpoint = &self.remote.endpoint;
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(SplicerError::invalid_config(format!(
                        "Remote endpoint must be an http(s) URL, got '{}'",
                        endpoint
                    )));
                }
                if self.remote.timeout_secs == 0 {
                    return Err(SplicerError::invalid_config(
                        "Remote timeout must be at least one second",
                    ));
                }
            },
            RemovalBackendKind::LocalModel => {
                if self.local.model_path.is_some() && !self.local.allow_local_models {
                    return Err(SplicerError::invalid_config(
                        "A local model path is configured but local models are not allowed",
                    ));
                }
                if self.local.target_size == 0 {
                    return Err(SplicerError::invalid_config(
                        "Model input size must be greater than zero",
                    ));
                }
            },
        }

        Ok(())
    }
}

/// Builder for `ServiceConfig`
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: RemovalBackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.remote.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn remote_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.remote.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn remote_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.local.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn model_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.local.model_url = url.into();
        self
    }

    #[must_use]
    pub fn allow_local_models(mut self, allow: bool) -> Self {
        self.config.local.allow_local_models = allow;
        self
    }

    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.config.local.use_cache = use_cache;
        self
    }

    #[must_use]
    pub fn cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.local.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn input_mode(mut self, mode: InputMode) -> Self {
        self.config.local.input_mode = mode;
        self
    }

    #[must_use]
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.local.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.local.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.local.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn target_size(mut self, size: u32) -> Self {
        self.config.local.target_size = size;
        self
    }

    #[must_use]
    pub fn eager_init(mut self, eager: bool) -> Self {
        self.config.local.eager_init = eager;
        self
    }

    /// Build the service configuration
    ///
    /// # Errors
    /// Returns `SplicerError::InvalidConfig` when validation fails
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
