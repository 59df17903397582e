//! Produce Scale core
//!
//! Classifies a photo of a fruit or vegetable and attaches reference weight
//! statistics for the predicted label. Every presentation layer goes through
//! the same pipeline:
//!
//! ```text
//! bytes -> decode -> preprocess -> classifier -> argmax -> label table -> weight lookup
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use produce_scale::{ResourceConfig, ResourceManager};
//!
//! let manager = ResourceManager::new(ResourceConfig::from_env());
//! manager.initialize()?;
//! let prediction = manager.classify(&std::fs::read("banana.jpg")?)?;
//! println!("{} ({:.2}%)", prediction.label, prediction.confidence);
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod preprocess;
pub mod reference;
pub mod resources;

pub use classifier::{Classifier, ScoreVector};
pub use config::{InputSize, ResourceConfig};
pub use error::{ClassifyError, InferenceError, LoadError, TableError};
pub use labels::LabelTable;
pub use pipeline::{PredictionResult, WeightsView, argmax, classify};
pub use preprocess::{ImageTensor, decode_image, preprocess};
pub use reference::{NOT_AVAILABLE, ReferenceDataStore, WeightStats};
pub use resources::{HealthReport, ResourceBundle, ResourceManager};

#[cfg(feature = "onnx")]
pub use classifier::onnx::OnnxClassifier;
