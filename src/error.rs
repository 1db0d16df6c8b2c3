//! Error types for background removal requests

use thiserror::Error;

/// Result type alias for photo-splicer operations
pub type Result<T> = std::result::Result<T, SplicerError>;

/// Every failure a removal request can run into
#[derive(Error, Debug)]
pub enum SplicerError {
    /// Input/output errors (temp files, model files, cache directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding, encoding or raster errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters, including a missing API key
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request body exceeded the configured maximum
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// The remote removal API answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Model resolution, download or loading errors
    #[error("Model error: {0}")]
    Model(String),

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Mask extraction and compositing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SplicerError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an upstream error from the remote API's status line
    pub fn upstream(status: u16, reason: &str) -> Self {
        Self::Upstream {
            status,
            message: format!("Remove.bg API Error: {}", reason),
        }
    }

    /// Create a network error with operation context
    pub fn network_error(context: &str, error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            "timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self::Network(format!("{}: {} ({})", context, kind, error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Short machine-readable category, reported as `error` in JSON failure bodies
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Image(_) => "image",
            Self::InvalidConfig(_) => "configuration",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Upstream { .. } => "upstream",
            Self::Network(_) => "network",
            Self::Model(_) => "model",
            Self::Inference(_) => "inference",
            Self::Processing(_) => "processing",
            Self::Internal(_) => "internal",
        }
    }
}
