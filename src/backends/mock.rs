//! Deterministic mock backend
//!
//! Treats every pixel that is not near-white as foreground. Letterbox padding is
//! white, so a mock mask always marks the padding as background, which is what a
//! real model does too.

use crate::{
    error::{Result, SplicerError},
    inference::InferenceBackend,
    models::PreprocessingConfig,
    pipeline::BackendFactory,
};
use async_trait::async_trait;
use instant::Duration;
use ndarray::Array4;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Channel value (0..1) above which all three channels count as white
const WHITE_THRESHOLD: f32 = 0.94;

/// How a mock backend behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehavior {
    /// Non-white pixels are foreground
    #[default]
    NonWhiteForeground,
    /// `initialize` fails with a model error
    FailInit,
    /// `infer` fails with an inference error
    FailInference,
    /// The first `infer` across the factory panics, later calls succeed
    PanicOnFirstInference,
}

/// Mock segmentation backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    behavior: MockBehavior,
    preprocessing: PreprocessingConfig,
    initialized: bool,
    inferences: Arc<AtomicUsize>,
}

impl MockBackend {
    #[must_use]
    pub fn new(target_size: u32) -> Self {
        Self::with_behavior(target_size, MockBehavior::default())
    }

    #[must_use]
    pub fn with_behavior(target_size: u32, behavior: MockBehavior) -> Self {
        Self {
            behavior,
            preprocessing: PreprocessingConfig::rmbg(target_size),
            initialized: false,
            inferences: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `infer` calls made so far
    #[must_use]
    pub fn inference_count(&self) -> usize {
        self.inferences.load(Ordering::SeqCst)
    }

    fn denormalize(&self, channel: usize, value: f32) -> f32 {
        let mean = self.preprocessing.normalization_mean.get(channel).copied().unwrap_or(0.0);
        let std = self.preprocessing.normalization_std.get(channel).copied().unwrap_or(1.0);
        value * std + mean
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.behavior == MockBehavior::FailInit {
            return Err(SplicerError::model("Mock backend refused to initialize"));
        }
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(0)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(SplicerError::internal("Backend not initialized"));
        }
        let previous = self.inferences.fetch_add(1, Ordering::SeqCst);
        if self.behavior == MockBehavior::PanicOnFirstInference && previous == 0 {
            panic!("Mock backend panicked during inference");
        }
        if self.behavior == MockBehavior::FailInference {
            return Err(SplicerError::inference("Mock inference failure"));
        }

        let (batch, channels, height, width) = input.dim();
        if channels < 3 {
            return Err(SplicerError::inference(format!(
                "Expected 3 input channels, got {}",
                channels
            )));
        }

        let mut output = Array4::<f32>::zeros((batch, 1, height, width));
        for ((n, _, y, x), slot) in output.indexed_iter_mut() {
            let is_white = (0..3).all(|c| {
                input
                    .get([n, c, y, x])
                    .is_some_and(|&v| self.denormalize(c, v) > WHITE_THRESHOLD)
            });
            *slot = if is_white { 0.0 } else { 1.0 };
        }
        Ok(output)
    }

    fn preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Factory handing out [`MockBackend`]s and counting how many were created
#[derive(Debug, Clone)]
pub struct MockBackendFactory {
    target_size: u32,
    behavior: MockBehavior,
    created: Arc<AtomicUsize>,
    inferences: Arc<AtomicUsize>,
}

impl MockBackendFactory {
    #[must_use]
    pub fn new(target_size: u32) -> Self {
        Self::with_behavior(target_size, MockBehavior::default())
    }

    #[must_use]
    pub fn with_behavior(target_size: u32, behavior: MockBehavior) -> Self {
        Self {
            target_size,
            behavior,
            created: Arc::new(AtomicUsize::new(0)),
            inferences: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backends created so far (clones share the counter)
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Inferences run across all created backends
    #[must_use]
    pub fn inference_count(&self) -> usize {
        self.inferences.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendFactory for MockBackendFactory {
    async fn create_backend(&self) -> Result<Box<dyn InferenceBackend>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let mut backend = MockBackend::with_behavior(self.target_size, self.behavior);
        backend.inferences = Arc::clone(&self.inferences);
        Ok(Box::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ImagePreprocessor;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_mock_marks_non_white_as_foreground() {
        let mut image = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        image.put_pixel(1, 1, image::Rgb([200, 10, 10]));

        let mut backend = MockBackend::new(4);
        backend.initialize().unwrap();

        let (tensor, _) = ImagePreprocessor::preprocess(
            &DynamicImage::ImageRgb8(image),
            &backend.preprocessing_config(),
        )
        .unwrap();
        let output = backend.infer(&tensor).unwrap();

        assert_eq!(output.dim(), (1, 1, 4, 4));
        assert_eq!(output[[0, 0, 1, 1]], 1.0);
        assert_eq!(output[[0, 0, 0, 0]], 0.0);
        assert_eq!(backend.inference_count(), 1);
    }

    #[test]
    fn test_mock_failure_modes() {
        let mut backend = MockBackend::with_behavior(4, MockBehavior::FailInit);
        assert!(backend.initialize().is_err());
        assert!(!backend.is_initialized());

        let mut backend = MockBackend::with_behavior(4, MockBehavior::FailInference);
        backend.initialize().unwrap();
        let err = backend.infer(&Array4::zeros((1, 3, 4, 4))).unwrap_err();
        assert_eq!(err.category(), "inference");
    }
}
