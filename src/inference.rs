//! Inference backend abstraction

use crate::{error::Result, models::PreprocessingConfig};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for segmentation inference backends
///
/// Backends are driven from a blocking thread behind a mutex, hence the
/// `Send` bound and `&mut self` receivers.
pub trait InferenceBackend: Send {
    /// Initialize the backend, returning the model load time on first call
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Model loading or validation errors
    fn initialize(&mut self) -> Result<Option<Duration>>;

    /// Run inference on a preprocessed NCHW tensor
    ///
    /// Returns the raw mask tensor, shaped `[1, 1, H, W]` with values in `0..=1`.
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Unexpected output tensor shape
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Input normalization this backend's model expects
    fn preprocessing_config(&self) -> PreprocessingConfig;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}
