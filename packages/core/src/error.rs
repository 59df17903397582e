//! Error types for resource loading and classification

use std::path::PathBuf;
use thiserror::Error;

/// Failure while parsing one of the delimited reference tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    /// Row numbers are 1-based and count the header line
    #[error("Row {row} has an empty required field")]
    EmptyField { row: u64 },

    #[error("Table contains no rows")]
    Empty,
}

/// Startup failure while building the resource bundle
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to load classifier from {path:?}: {message}")]
    Model { path: PathBuf, message: String },

    #[error("Failed to load label table from {path:?}: {source}")]
    Labels {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Failed to load weight table from {path:?}: {source}")]
    Weights {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Label table has {labels} entries but the classifier emits {outputs} scores")]
    LabelMismatch { labels: usize, outputs: usize },
}

/// Opaque failure raised by a classifier backend
#[derive(Error, Debug, Clone)]
#[error("Inference failed: {0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by a single classification call
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Model or reference data not loaded")]
    NotReady,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The score vector was empty or held only NaN
    #[error("Classifier returned no usable scores ({len} values)")]
    NoScores { len: usize },

    /// The classifier and the label table disagree about the label space
    #[error("Predicted index {index} is outside the label table ({labels} labels)")]
    IndexOutOfRange { index: usize, labels: usize },
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        ClassifyError::InvalidImage(err.to_string())
    }
}
