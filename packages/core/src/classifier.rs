//! Classifier seam
//!
//! The pipeline only sees [`Classifier`]. The ONNX Runtime backed
//! implementation lives in [`onnx`] behind the `onnx` feature so tests and
//! alternative backends can plug in their own.

use crate::error::InferenceError;
use crate::preprocess::ImageTensor;

#[cfg(feature = "onnx")]
pub mod onnx;

/// Per-label scores for one input, index-aligned with the label table
pub type ScoreVector = Vec<f32>;

/// A loaded, deterministic image classifier.
///
/// Implementations that cannot be invoked concurrently must serialize calls
/// internally. Callers may share one instance across request handlers.
pub trait Classifier: Send + Sync {
    fn infer(&self, tensor: &ImageTensor) -> Result<ScoreVector, InferenceError>;

    /// Number of scores the artifact emits, if it declares a static shape
    fn output_len(&self) -> Option<usize> {
        None
    }

    /// Short backend description for logs
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
