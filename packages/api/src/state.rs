use crate::config::ApiConfig;
use crate::error::ApiError;
use produce_scale::{PredictionResult, ResourceManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub type AppState = Arc<State>;

pub struct State {
    pub resources: Arc<ResourceManager>,
    pub config: ApiConfig,
    /// Admission control in front of the classifier
    limiter: Arc<Semaphore>,
}

impl State {
    pub fn new(resources: Arc<ResourceManager>, config: ApiConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_predictions.max(1)));
        Self {
            resources,
            config,
            limiter,
        }
    }

    /// Run the pipeline on the blocking pool, bounded by the admission limit
    /// and the configured timeout.
    ///
    /// The permit travels with the blocking task, so a prediction that timed
    /// out keeps its slot until the classifier actually returns.
    pub async fn classify(&self, bytes: Vec<u8>) -> Result<PredictionResult, ApiError> {
        let bundle = self.resources.bundle()?;

        let permit = self.limiter.clone().try_acquire_owned().map_err(|_| {
            ApiError::too_many_requests("Too many predictions in flight, retry shortly")
        })?;

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            produce_scale::classify(&bundle, &bytes)
        });

        let timeout = self.config.prediction_timeout();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_err)) => Err(ApiError::internal(format!(
                "Prediction task failed: {}",
                join_err
            ))),
            Err(_) => Err(ApiError::gateway_timeout(format!(
                "Prediction exceeded {}",
                format_duration(timeout)
            ))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
