//! ONNX Runtime backend for the segmentation model
//!
//! Supports CPU, CUDA and CoreML execution providers. Unavailable accelerators
//! fall back to CPU with a warning rather than failing the session.

use crate::config::{ExecutionProvider, LocalModelConfig};
use crate::error::{Result, SplicerError};
use crate::inference::InferenceBackend;
use crate::models::{ModelLoader, PreprocessingConfig};
use crate::pipeline::BackendFactory;
use async_trait::async_trait;
use instant::Duration;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};

/// ONNX Runtime backend running a segmentation model held in memory
pub struct OnnxBackend {
    model_data: Vec<u8>,
    session: Option<Session>,
    execution_provider: ExecutionProvider,
    intra_threads: usize,
    preprocessing: PreprocessingConfig,
    initialized: bool,
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("model_bytes", &self.model_data.len())
            .field("execution_provider", &self.execution_provider)
            .field("intra_threads", &self.intra_threads)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl OnnxBackend {
    /// Create a backend from raw ONNX model bytes
    ///
    /// The session is built lazily by [`InferenceBackend::initialize`].
    #[must_use]
    pub fn from_model_bytes(
        model_data: Vec<u8>,
        execution_provider: ExecutionProvider,
        intra_threads: usize,
        preprocessing: PreprocessingConfig,
    ) -> Self {
        Self {
            model_data,
            session: None,
            execution_provider,
            intra_threads,
            preprocessing,
            initialized: false,
        }
    }

    /// List ONNX Runtime execution providers with their availability
    #[must_use]
    pub fn list_providers() -> Vec<(ExecutionProvider, bool)> {
        vec![
            (ExecutionProvider::Cpu, true),
            (
                ExecutionProvider::Cuda,
                OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false),
            ),
            (
                ExecutionProvider::CoreMl,
                OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false),
            ),
        ]
    }

    fn cuda() -> Option<ExecutionProviderDispatch> {
        let provider = CUDAExecutionProvider::default();
        if OrtExecutionProvider::is_available(&provider).unwrap_or(false) {
            Some(provider.build())
        } else {
            None
        }
    }

    fn coreml() -> Option<ExecutionProviderDispatch> {
        let provider = CoreMLExecutionProvider::default();
        if OrtExecutionProvider::is_available(&provider).unwrap_or(false) {
            Some(CoreMLExecutionProvider::default().with_subgraphs(true).build())
        } else {
            None
        }
    }

    /// Providers to register, in priority order; empty means plain CPU
    fn select_providers(requested: ExecutionProvider) -> Vec<ExecutionProviderDispatch> {
        let providers: Vec<ExecutionProviderDispatch> = match requested {
            ExecutionProvider::Auto => [Self::cuda(), Self::coreml()].into_iter().flatten().collect(),
            ExecutionProvider::Cpu => Vec::new(),
            ExecutionProvider::Cuda => Self::cuda().into_iter().collect(),
            ExecutionProvider::CoreMl => Self::coreml().into_iter().collect(),
        };

        match (requested, providers.is_empty()) {
            (ExecutionProvider::Cpu, _) => log::info!("Using CPU execution provider"),
            (ExecutionProvider::Auto, true) => {
                log::warn!("No hardware acceleration available, falling back to CPU");
            },
            (ExecutionProvider::Auto, false) => log::info!(
                "Hardware acceleration enabled with {} provider(s)",
                providers.len()
            ),
            (provider, true) => {
                log::warn!("{} execution provider requested but not available, falling back to CPU", provider);
            },
            (provider, false) => log::info!("Using {} execution provider", provider),
        }

        providers
    }

    fn load_session(&mut self) -> Result<std::time::Duration> {
        let model_load_start = std::time::Instant::now();

        let mut session_builder = Session::builder()
            .map_err(|e| SplicerError::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| SplicerError::inference(format!("Failed to set optimization level: {e}")))?;

        let providers = Self::select_providers(self.execution_provider);
        if !providers.is_empty() {
            session_builder = session_builder
                .with_execution_providers(providers)
                .map_err(|e| {
                    SplicerError::inference(format!("Failed to set execution providers: {e}"))
                })?;
        }

        let intra_threads = if self.intra_threads > 0 {
            self.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };

        let session = session_builder
            .with_intra_threads(intra_threads)
            .map_err(|e| SplicerError::inference(format!("Failed to set intra threads: {e}")))?
            .commit_from_memory(&self.model_data)
            .map_err(|e| {
                SplicerError::model(format!("Failed to create session from model data: {e}"))
            })?;

        #[allow(clippy::cast_precision_loss)]
        let size_mb = self.model_data.len() as f64 / (1024.0 * 1024.0);
        log::debug!(
            "ONNX session ready: {:.2} MB model, {} intra-op threads, provider {}",
            size_mb,
            intra_threads,
            self.execution_provider
        );

        self.session = Some(session);
        self.initialized = true;
        // Session owns its copy of the graph
        self.model_data = Vec::new();

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );
        Ok(model_load_time)
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.load_session().map(Some)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(SplicerError::internal("Backend not initialized"));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SplicerError::internal("ONNX session not initialized"))?;

        let inference_start = std::time::Instant::now();
        log::debug!("Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone())
            .map_err(|e| SplicerError::inference(format!("Failed to convert input tensor: {e}")))?;

        // Positional input, so the model's tensor names do not matter
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| SplicerError::inference(format!("ONNX inference failed: {e}")))?;

        let output_tensor = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| SplicerError::inference("No output tensors found"))?;
            outputs
                .get(first_key)
                .ok_or_else(|| SplicerError::inference("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    SplicerError::inference(format!("Failed to extract output tensor: {e}"))
                })?
        };

        let output_shape = output_tensor.shape().to_vec();
        let output_data = output_tensor.view().to_owned();

        let result = match output_shape.as_slice() {
            [n, c, h, w] => Array4::from_shape_vec((*n, *c, *h, *w), output_data.into_raw_vec_and_offset().0)
                .map_err(|e| SplicerError::inference(format!("Failed to reshape output tensor: {e}"))),
            // Some exports drop the channel axis
            [n, h, w] => Array4::from_shape_vec((*n, 1, *h, *w), output_data.into_raw_vec_and_offset().0)
                .map_err(|e| SplicerError::inference(format!("Failed to reshape output tensor: {e}"))),
            other => Err(SplicerError::inference(format!(
                "Expected 3D or 4D output tensor, got {}D",
                other.len()
            ))),
        };

        log::debug!(
            "Inference complete: {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );
        result
    }

    fn preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing.clone()
    }

    fn name(&self) -> &'static str {
        "onnx"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Builds an [`OnnxBackend`] from a local pipeline configuration
#[derive(Debug, Clone)]
pub struct OnnxBackendFactory {
    config: LocalModelConfig,
}

impl OnnxBackendFactory {
    #[must_use]
    pub fn new(config: LocalModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendFactory for OnnxBackendFactory {
    async fn create_backend(&self) -> Result<Box<dyn InferenceBackend>> {
        let loader = ModelLoader::from_config(&self.config)?;
        log::info!("Resolving segmentation model {}", loader.source().display_name());
        let model_data = loader.load().await?;

        Ok(Box::new(OnnxBackend::from_model_bytes(
            model_data,
            self.config.execution_provider,
            self.config.intra_threads,
            PreprocessingConfig::rmbg(self.config.target_size),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_backend_rejects_inference() {
        let mut backend = OnnxBackend::from_model_bytes(
            b"not onnx".to_vec(),
            ExecutionProvider::Cpu,
            1,
            PreprocessingConfig::default(),
        );
        assert!(!backend.is_initialized());

        let input = Array4::<f32>::zeros((1, 3, 8, 8));
        let err = backend.infer(&input).unwrap_err();
        assert_eq!(err.category(), "internal");
    }

    #[test]
    fn test_cpu_always_listed() {
        let providers = OnnxBackend::list_providers();
        assert!(providers.contains(&(ExecutionProvider::Cpu, true)));
    }
}
