//! Background removal strategies
//!
//! A deployment runs exactly one strategy, picked by
//! [`ServiceConfig::backend`](crate::config::ServiceConfig::backend).

pub mod local;
pub mod remote;

pub use local::LocalModelRemover;
pub use remote::RemoteApiRemover;

use crate::{
    config::{RemovalBackendKind, ServiceConfig},
    error::Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Turns an uploaded image into a PNG with a transparent background
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &'static str;

    /// Remove the background from an encoded image
    ///
    /// # Errors
    /// Any failure aborts the whole request; no partial output is produced.
    async fn remove_background(&self, image: Bytes) -> Result<Bytes>;

    /// Prepare expensive state ahead of the first request
    ///
    /// # Errors
    /// Strategy-specific initialization failures
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the remover configured for this deployment
///
/// # Errors
/// - Invalid configuration
/// - Local model requested in a build without the `onnx` feature
pub fn build_remover(config: &ServiceConfig) -> Result<Arc<dyn BackgroundRemover>> {
    match config.backend {
        RemovalBackendKind::RemoteApi => {
            let remover = RemoteApiRemover::new(config.remote.clone())?;
            if config.remote.usable_api_key().is_none() {
                log::warn!(
                    "No remove.bg API key configured; set REMOVE_BG_API_KEY or every request will fail"
                );
            }
            Ok(Arc::new(remover))
        },
        RemovalBackendKind::LocalModel => build_local_remover(config),
    }
}

#[cfg(feature = "onnx")]
fn build_local_remover(config: &ServiceConfig) -> Result<Arc<dyn BackgroundRemover>> {
    use crate::{backends::OnnxBackendFactory, pipeline::SegmentationPipeline};

    // Surface a disallowed local model at startup rather than on first request
    crate::models::ModelSource::from_config(&config.local)?;

    let pipeline = SegmentationPipeline::new(OnnxBackendFactory::new(config.local.clone()));
    Ok(Arc::new(LocalModelRemover::new(Arc::new(pipeline), &config.local)))
}

#[cfg(not(feature = "onnx"))]
fn build_local_remover(_config: &ServiceConfig) -> Result<Arc<dyn BackgroundRemover>> {
    Err(crate::error::SplicerError::invalid_config(
        "The local model backend requires the 'onnx' feature",
    ))
}
