use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::{Json, Router, routing::post};
use produce_scale::{ClassifyError, WeightsView};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const FILE_FIELD: &str = "file";

pub fn routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: Prediction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
    pub weights: WeightsView,
}

/// POST /predict
///
/// Multipart upload with the image in the `file` field.
#[tracing::instrument(name = "POST /predict", skip(state, multipart))]
pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let started = Instant::now();
    let result = run_prediction(&state, multipart).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.code(),
    };
    metrics::counter!("predictions_total", "outcome" => outcome).increment(1);
    metrics::histogram!("prediction_duration_seconds").record(started.elapsed().as_secs_f64());

    result
}

async fn run_prediction(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    if !state.resources.is_ready() {
        return Err(ClassifyError::NotReady.into());
    }

    let bytes = loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(ApiError::bad_request(format!(
                "Missing '{}' field in multipart body",
                FILE_FIELD
            )));
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(ApiError::bad_request(format!(
                "File is not an image (content type '{}')",
                content_type
            )));
        }
        break field.bytes().await?;
    };

    tracing::debug!(bytes = bytes.len(), "Received upload");
    let result = state.classify(bytes.to_vec()).await?;
    let weights = result.weights_view();

    tracing::info!(
        label = %result.label,
        confidence = result.confidence,
        "Prediction complete"
    );

    Ok(Json(PredictResponse {
        success: true,
        prediction: Prediction {
            label: result.label,
            confidence: result.confidence,
            weights,
        },
    }))
}
