//! ONNX Runtime classifier backend
//!
//! Expects the Keras model exported to ONNX with its preprocessing layers
//! included: one float32 input `[1, H, W, 3]` taking raw `0..=255` pixels and
//! one output holding per-label probabilities.

use super::{Classifier, ScoreVector};
use crate::config::InputSize;
use crate::error::{InferenceError, LoadError};
use crate::preprocess::ImageTensor;
use ort::inputs;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub struct OnnxClassifier {
    /// `Session::run` needs exclusive access, so concurrent requests queue here
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    output_len: Option<usize>,
    path: PathBuf,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>, input_size: InputSize) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let model_err = |message: String| LoadError::Model {
            path: path.clone(),
            message,
        };

        let session = Session::builder()
            .map_err(|e| model_err(e.to_string()))?
            .commit_from_file(&path)
            .map_err(|e| model_err(e.to_string()))?;

        let input = match session.inputs.as_slice() {
            [input] => input,
            inputs => {
                return Err(model_err(format!(
                    "expected exactly one input, found {}",
                    inputs.len()
                )));
            }
        };
        let output = session
            .outputs
            .first()
            .ok_or_else(|| model_err("model declares no outputs".to_string()))?;

        if let Some(dims) = input.input_type.tensor_shape() {
            let dims: Vec<i64> = dims.iter().copied().collect();
            check_input_dims(&dims, input_size).map_err(model_err)?;
        }

        let output_len = output
            .output_type
            .tensor_shape()
            .and_then(|dims| dims.iter().copied().last())
            .filter(|d| *d > 0)
            .map(|d| d as usize);

        let input_name = input.name.clone();
        let output_name = output.name.clone();

        tracing::info!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            outputs = ?output_len,
            "Loaded ONNX classifier"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            output_len,
            path,
        })
    }
}

/// Validate an NHWC input declaration; negative dims are dynamic and accepted
fn check_input_dims(dims: &[i64], size: InputSize) -> Result<(), String> {
    let [_, h, w, c] = dims else {
        return Err(format!("expected a rank 4 NHWC input, found shape {dims:?}"));
    };
    let matches = |declared: i64, wanted: u32| declared < 0 || declared == wanted as i64;
    if !matches(*c, 3) {
        return Err(format!("expected 3 channels last, found shape {dims:?}"));
    }
    if !matches(*h, size.height) || !matches(*w, size.width) {
        return Err(format!(
            "input shape {dims:?} does not match configured size {}x{}",
            size.height, size.width
        ));
    }
    Ok(())
}

impl Classifier for OnnxClassifier {
    fn infer(&self, tensor: &ImageTensor) -> Result<ScoreVector, InferenceError> {
        let value = Tensor::from_array(tensor.view().to_owned())
            .map_err(|e| InferenceError::new(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![self.input_name.as_str() => value])
            .map_err(|e| InferenceError::new(e.to_string()))?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::new(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }

    fn output_len(&self) -> Option<usize> {
        self.output_len
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_static_and_dynamic_nhwc() {
        let size = InputSize::new(224, 224);
        assert!(check_input_dims(&[1, 224, 224, 3], size).is_ok());
        assert!(check_input_dims(&[-1, -1, -1, 3], size).is_ok());
    }

    #[test]
    fn rejects_nchw_and_wrong_size() {
        let size = InputSize::new(224, 224);
        assert!(check_input_dims(&[1, 3, 224, 224], size).is_err());
        assert!(check_input_dims(&[1, 256, 256, 3], size).is_err());
        assert!(check_input_dims(&[1, 224, 224], size).is_err());
    }

    #[test]
    fn missing_artifact_is_a_model_error() {
        let err = OnnxClassifier::load("does/not/exist.onnx", InputSize::default())
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Model { .. }));
    }
}
