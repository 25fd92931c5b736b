//! Revenue Predictor - HTTP service estimating company revenue
//!
//! Loads the configured estimator once at startup and serves single and
//! batch predictions along with a saved prediction history. A failed model
//! load leaves the server running in degraded mode so `/health` can report
//! why.

use anyhow::Result;
use predictor_lib::{
    loader, HealthRegistry, PredictionHistory, PredictionService, ServiceMetrics,
    StructuredLogger,
};
use revenue_predictor::{api, config::ApiConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting revenue-predictor");

    let config = ApiConfig::load();
    info!(config = ?config, "Predictor configured");

    let instance = std::env::var("HOSTNAME").unwrap_or_else(|_| "revenue-predictor".to_string());
    let logger = StructuredLogger::new(instance);

    // Load the estimator; failures leave the service unavailable, not dead
    let service = Arc::new(PredictionService::new(loader::load(
        &config.estimator_source(),
    )));
    logger.log_model_status(service.estimator_kind(), service.unavailable_reason());

    let metrics = ServiceMetrics::new();
    metrics.set_model(
        service.estimator_kind(),
        service.metadata().ok().map(|m| m.model_type.as_str()),
    );

    let health_registry = HealthRegistry::for_service(&service).await;
    let app_state = Arc::new(api::AppState::new(
        service.clone(),
        PredictionHistory::new(config.history_capacity),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    // Mark service as ready after initialization
    health_registry.set_ready(true).await;

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr);

    let shutdown_logger = logger.clone();
    api::serve(&addr, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
