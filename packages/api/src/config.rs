use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Request handling limits for the HTTP adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Predictions allowed to run at once; further requests get 429
    #[serde(default = "default_max_concurrent_predictions")]
    pub max_concurrent_predictions: usize,
    /// Upper bound for one prediction (seconds)
    #[serde(default = "default_prediction_timeout_secs")]
    pub prediction_timeout_secs: u64,
    /// Maximum accepted request body (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Directory holding `index.html` and the front-end assets
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_max_concurrent_predictions() -> usize {
    4
}
fn default_prediction_timeout_secs() -> u64 {
    30
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_concurrent_predictions: default_max_concurrent_predictions(),
            prediction_timeout_secs: default_prediction_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: default_static_dir(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            max_concurrent_predictions: std::env::var("PREDICT_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or_else(default_max_concurrent_predictions),
            prediction_timeout_secs: std::env::var("PREDICT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or_else(default_prediction_timeout_secs),
            max_upload_bytes: std::env::var("PREDICT_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or_else(default_max_upload_bytes),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_static_dir()),
        }
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_secs(self.prediction_timeout_secs)
    }
}
