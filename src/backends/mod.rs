//! Inference backend implementations
//!
//! - ONNX Runtime backend for the segmentation model
//! - Deterministic mock backend for tests and model-free runs

pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use self::mock::{MockBackend, MockBackendFactory};

#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxBackend, OnnxBackendFactory};
