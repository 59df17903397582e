#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use axum::{Router, routing::get};
use produce_scale::ResourceManager;
use produce_scale_api::{construct_router, state::State};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    telemetry::init_telemetry()?;

    tracing::info!("Starting produce scale prediction service");

    let config = config::Config::from_env()?;
    tracing::info!(
        model = %config.resources.model_path.display(),
        labels = %config.resources.labels_path.display(),
        weights = %config.resources.weights_path.display(),
        "Loading resources"
    );

    let resources = Arc::new(ResourceManager::new(config.resources.clone()));
    {
        let resources = resources.clone();
        tokio::task::spawn_blocking(move || resources.initialize()).await??;
    }

    let state = Arc::new(State::new(resources, config.api.clone()));

    let app = Router::new()
        .merge(construct_router(state))
        .route("/metrics", get(telemetry::handler))
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    tracing::info!("Listening on {}:{}", addr.0, addr.1);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
