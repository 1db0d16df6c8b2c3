#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Photo Splicer
//!
//! A small web service that removes the background from an uploaded photo and
//! lets the user download the cut-out as a transparent PNG or flattened onto a
//! solid color.
//!
//! Each deployment runs one removal strategy:
//!
//! - **Remote API**: the upload is forwarded to remove.bg (or a compatible
//!   endpoint) and the returned PNG is passed through.
//! - **Local model**: an ONNX segmentation model predicts an alpha mask which
//!   is applied to the original pixels. The model session is created once, on
//!   first use or at startup, and shared by all requests.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use photo_splicer::{build_remover, BackgroundColor, ExportService, RemovalBackendKind, ServiceConfig};
//!
//! # async fn example(upload: bytes::Bytes) -> anyhow::Result<()> {
//! let config = ServiceConfig::builder()
//!     .backend(RemovalBackendKind::LocalModel)
//!     .build()?;
//! let remover = build_remover(&config)?;
//!
//! let cutout = remover.remove_background(upload).await?;
//! let download = ExportService::export(cutout, "#2563eb".parse::<BackgroundColor>()?)?;
//! assert_eq!(download.content_type, "image/jpeg");
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving
//!
//! ```rust,no_run
//! use photo_splicer::{server, ServiceConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::builder().port(3000).api_key("my-key").build()?;
//! server::run(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): local ONNX Runtime segmentation pipeline
//! - `cli` (default): `photo-splicer` binary with `serve` and `remove` commands
//! - `webp-support` (default): WebP upload decoding
//! - `tracing-json`: JSON log output

pub mod backends;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod remover;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use backends::{MockBackend, MockBackendFactory};
#[cfg(feature = "onnx")]
pub use backends::{OnnxBackend, OnnxBackendFactory};
pub use cache::ModelCache;
pub use config::{
    ExecutionProvider, InputMode, LocalModelConfig, RemovalBackendKind, RemoteApiConfig,
    ServiceConfig, ServiceConfigBuilder,
};
pub use download::{validate_model_url, ModelDownloader};
pub use error::{Result, SplicerError};
pub use inference::InferenceBackend;
pub use models::{ModelLoader, ModelSource, PreprocessingConfig};
pub use pipeline::{BackendFactory, SegmentationPipeline};
pub use remover::{build_remover, BackgroundRemover, LocalModelRemover, RemoteApiRemover};
pub use server::AppState;
pub use services::{Compositor, ExportService, ImageIOService, TempUpload};
pub use tracing_config::{spans, TracingConfig, TracingFormat};
pub use types::{BackgroundColor, ExportedImage, SegmentationMask};
pub use utils::{ColorParser, ImagePreprocessor, LetterboxGeometry};
