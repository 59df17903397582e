use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Spatial size the classifier expects its input resized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl InputSize {
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(224, 224)
    }
}

/// Locations of the three startup resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Classifier artifact (ONNX)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// CSV with a `label` column, row order matches the classifier output
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,
    /// Semicolon separated CSV with `name;min;avg;max`
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,
    #[serde(default)]
    pub input_size: InputSize,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.onnx")
}
fn default_labels_path() -> PathBuf {
    PathBuf::from("data/labels.csv")
}
fn default_weights_path() -> PathBuf {
    PathBuf::from("data/weights.csv")
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            labels_path: default_labels_path(),
            weights_path: default_weights_path(),
            input_size: InputSize::default(),
        }
    }
}

impl ResourceConfig {
    pub fn from_env() -> Self {
        let defaults = InputSize::default();
        Self {
            model_path: std::env::var("PRODUCE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_model_path()),
            labels_path: std::env::var("PRODUCE_LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_labels_path()),
            weights_path: std::env::var("PRODUCE_WEIGHTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_weights_path()),
            input_size: InputSize {
                height: std::env::var("PRODUCE_INPUT_HEIGHT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(defaults.height),
                width: std::env::var("PRODUCE_INPUT_WIDTH")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(defaults.width),
            },
        }
    }
}
