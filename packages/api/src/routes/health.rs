use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub labels_loaded: bool,
    pub weights_loaded: bool,
}

#[tracing::instrument(name = "GET /health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.resources.health();
    let status = if report.is_healthy() {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        model_loaded: report.model_loaded,
        labels_loaded: report.labels_loaded,
        weights_loaded: report.weights_loaded,
    })
}
