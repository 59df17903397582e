//! HTTP adapter for the produce classifier.
//!
//! Exposes `POST /predict`, `GET /health` (both also under `/api`) and the
//! bundled front-end. The binary in `apps/backend/local/api` owns process
//! setup and telemetry; everything request-shaped lives here.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower::ServiceBuilder;
use tower_http::{
    compression::{CompressionLayer, DefaultPredicate, Predicate, predicate::NotForContentType},
    cors::CorsLayer,
};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use axum;
pub use config::ApiConfig;
pub use error::ApiError;
pub use state::{AppState, State};

/// Prediction and health endpoints, mounted both at the root and under `/api`
fn service_routes() -> Router<AppState> {
    Router::new()
        .merge(routes::predict::routes())
        .merge(routes::health::routes())
}

pub fn construct_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(service_routes())
        .nest("/api", service_routes())
        .merge(routes::assets::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new().layer(CompressionLayer::new().compress_when(
                DefaultPredicate::new().and(NotForContentType::new("text/event-stream")),
            )),
        )
}
