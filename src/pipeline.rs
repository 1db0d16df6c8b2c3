//! Lazily initialized segmentation pipeline shared across requests

use crate::{
    error::{Result, SplicerError},
    inference::InferenceBackend,
    models::PreprocessingConfig,
    services::Compositor,
    types::SegmentationMask,
    utils::ImagePreprocessor,
};
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Creates the inference backend on first use
///
/// Creation may download a model, so it is async; the heavy session setup
/// happens afterwards in `InferenceBackend::initialize` on a blocking thread.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Build an uninitialized backend
    ///
    /// # Errors
    /// - Model resolution or download failures
    async fn create_backend(&self) -> Result<Box<dyn InferenceBackend>>;
}

/// An initialized backend plus the preprocessing it expects
///
/// The configuration is captured once so preprocessing never takes the
/// inference lock.
struct LoadedBackend {
    preprocessing: PreprocessingConfig,
    backend: Mutex<Box<dyn InferenceBackend>>,
}

impl LoadedBackend {
    fn new(backend: Box<dyn InferenceBackend>) -> Self {
        Self {
            preprocessing: backend.preprocessing_config(),
            backend: Mutex::new(backend),
        }
    }

    /// A panic inside `infer` poisons the mutex; the backend holds no state
    /// that a half-finished inference can corrupt, so later requests proceed.
    fn lock(&self) -> MutexGuard<'_, Box<dyn InferenceBackend>> {
        self.backend.lock().unwrap_or_else(|poisoned| {
            warn!("Segmentation backend lock poisoned by a panicked inference; recovering");
            poisoned.into_inner()
        })
    }
}

type SharedBackend = Arc<LoadedBackend>;

/// Segmentation pipeline
///
/// The backend is created at most once per process, on first use or on an
/// explicit [`SegmentationPipeline::initialize`]. Concurrent first callers wait
/// for the same initialization; a failed initialization is retried by the next
/// call. Inference is serialized through a mutex; preprocessing and mask
/// extraction run outside it.
pub struct SegmentationPipeline {
    factory: Box<dyn BackendFactory>,
    backend: OnceCell<SharedBackend>,
}

impl std::fmt::Debug for SegmentationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationPipeline")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl SegmentationPipeline {
    #[must_use]
    pub fn new<F: BackendFactory + 'static>(factory: F) -> Self {
        Self {
            factory: Box::new(factory),
            backend: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.initialized()
    }

    /// Initialize the backend now instead of on the first request
    ///
    /// # Errors
    /// Propagates backend creation and initialization failures
    pub async fn initialize(&self) -> Result<()> {
        self.backend().await.map(|_| ())
    }

    async fn backend(&self) -> Result<SharedBackend> {
        let backend = self
            .backend
            .get_or_try_init(|| async {
                info!("Initializing segmentation pipeline");
                let mut backend = self.factory.create_backend().await?;
                let backend = tokio::task::spawn_blocking(move || {
                    let load_time = backend.initialize()?;
                    if let Some(load_time) = load_time {
                        info!(
                            backend = backend.name(),
                            load_ms = load_time.as_millis() as u64,
                            "Segmentation backend ready"
                        );
                    }
                    Ok::<_, SplicerError>(backend)
                })
                .await
                .map_err(|e| SplicerError::internal(format!("Backend initialization panicked: {e}")))??;
                Ok::<_, SplicerError>(Arc::new(LoadedBackend::new(backend)))
            })
            .await?;
        Ok(Arc::clone(backend))
    }

    /// Predict an alpha mask the size of `image`
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Inference failures
    /// - Mask extraction failures
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub async fn segment(&self, image: DynamicImage) -> Result<SegmentationMask> {
        let backend = self.backend().await?;
        tokio::task::spawn_blocking(move || Self::segment_blocking(&backend, &image))
            .await
            .map_err(|e| SplicerError::internal(format!("Segmentation task panicked: {e}")))?
    }

    /// Remove the background: predict a mask and keep the source only where it is opaque
    ///
    /// # Errors
    /// See [`SegmentationPipeline::segment`]
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub async fn cut_out(&self, image: DynamicImage) -> Result<RgbaImage> {
        let backend = self.backend().await?;
        tokio::task::spawn_blocking(move || {
            let mask = Self::segment_blocking(&backend, &image)?;
            debug!(foreground = mask.foreground_ratio(), "Applying mask");
            Compositor::destination_in(&image, &mask)
        })
        .await
        .map_err(|e| SplicerError::internal(format!("Segmentation task panicked: {e}")))?
    }

    fn segment_blocking(backend: &LoadedBackend, image: &DynamicImage) -> Result<SegmentationMask> {
        let start = instant::Instant::now();
        let (tensor, geometry) = ImagePreprocessor::preprocess(image, &backend.preprocessing)?;
        let output = backend.lock().infer(&tensor)?;

        let mask = Compositor::tensor_to_mask(&output, &geometry, (image.width(), image.height()))?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Segmentation complete");
        Ok(mask)
    }
}
