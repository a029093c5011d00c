//! # Classifier
//! Forward inference over a preprocessed batch.

use crate::error::PredictError;
use ndarray::Array4;

/// Execution provider selection for ONNX Runtime
#[cfg(feature = "onnx")]
pub mod execution_providers;
/// ONNX Runtime backed classifier
#[cfg(feature = "onnx")]
pub mod onnx;

/// A network whose final layer has one output per catalog label.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait Classifier: Send + Sync {
    /// Width of the final layer.
    fn num_classes(&self) -> usize;

    /// Static `(width, height)` input resolution declared by the model, if any.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Ordered labels persisted inside the model artifact, if any.
    fn embedded_labels(&self) -> Option<Vec<String>> {
        None
    }

    /// Raw class logits for a batch of one image, shape `[1, 3, H, W]`.
    fn logits(&self, batch: Array4<f32>) -> Result<Vec<f32>, PredictError>;

    /// Human readable description of where inference runs.
    fn providers(&self) -> Vec<String> {
        vec!["CPU".to_string()]
    }

    /// Whether a GPU/NPU provider was requested.
    fn accelerated(&self) -> bool {
        false
    }
}
