//! HTTP API for revenue predictions, saved history, health checks and
//! Prometheus metrics

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    local_timestamp, validation, BatchEntryFailure, BatchEntryOutcome, BatchPredictionResponse,
    HealthRegistry, MessageResponse, NewSavedPrediction, PartialBatchResponse, PredictionHistory,
    PredictionService, ResponseStatus, SavedPredictionList, SavedPredictionResponse, ServiceError,
    ServiceMetrics, StructuredLogger, ValidationError,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub history: PredictionHistory,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        history: PredictionHistory,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            history,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Service error rendered as `{error, status: "error"}`
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if matches!(self.0, ServiceError::PredictionNotFound { .. }) {
            StatusCode::NOT_FOUND
        } else if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.to_string(),
            "status": ResponseStatus::Error,
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Batch handling mode selected with `?mode=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Abort at the first failing company
    #[default]
    All,
    /// Report an outcome per company
    Partial,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchParams {
    #[serde(default)]
    pub mode: BatchMode,
}

/// Diagnostics - always 200, status reflects component health
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    (StatusCode::OK, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn model_info(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let metadata = state.service.metadata().map_err(|e| state.reject("model-info", e))?;
    Ok(Json(metadata.clone()))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();

    let result = state
        .service
        .ensure_available()
        .and_then(|_| parse_body(&body))
        .and_then(|payload| state.service.predict_payload(&payload))
        .map_err(|e| state.reject("predict", e))?;

    let elapsed = started.elapsed();
    state.metrics.observe_prediction_latency(elapsed.as_secs_f64());
    state.metrics.inc_predictions(1);
    state.logger.log_prediction(
        result.input_data.region.as_str(),
        result.input_data.num_employees,
        result.predicted_revenue,
        elapsed.as_micros(),
    );

    Ok(Json(result))
}

async fn batch_predict(
    State(state): State<Arc<AppState>>,
    params: Result<Query<BatchParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let started = Instant::now();

    state
        .service
        .ensure_available()
        .map_err(|e| state.reject("batch-predict", e))?;
    let Query(params) = params
        .map_err(|_| state.reject("batch-predict", ValidationError::InvalidBatchMode.into()))?;
    let payload = parse_body(&body).map_err(|e| state.reject("batch-predict", e))?;
    let companies = validation::companies(&payload)
        .map_err(|e| state.reject("batch-predict", e.into()))?;

    state.metrics.observe_batch_size(companies.len());

    let response = match params.mode {
        BatchMode::All => {
            let predictions = state
                .service
                .predict_batch(companies)
                .map_err(|e| state.reject("batch-predict", e))?;

            state.metrics.inc_predictions(predictions.len() as u64);
            state.logger.log_batch(
                companies.len(),
                predictions.len(),
                false,
                started.elapsed().as_micros(),
            );

            Json(BatchPredictionResponse {
                total_companies: predictions.len(),
                predictions,
                timestamp: local_timestamp(),
                status: ResponseStatus::Success,
            })
            .into_response()
        }
        BatchMode::Partial => {
            let outcomes = state
                .service
                .predict_each(companies)
                .map_err(|e| state.reject("batch-predict", e))?;

            let results: Vec<BatchEntryOutcome> = outcomes
                .into_iter()
                .enumerate()
                .map(|(index, outcome)| match outcome {
                    Ok(prediction) => BatchEntryOutcome::Success(prediction),
                    Err(e) => {
                        count_failure(&state.metrics, "batch-predict", &e);
                        BatchEntryOutcome::Failure(BatchEntryFailure {
                            company_index: index,
                            error: e.to_string(),
                            status: ResponseStatus::Error,
                        })
                    }
                })
                .collect();

            let succeeded = results
                .iter()
                .filter(|r| matches!(r, BatchEntryOutcome::Success(_)))
                .count();

            state.metrics.inc_predictions(succeeded as u64);
            state.logger.log_batch(
                companies.len(),
                succeeded,
                true,
                started.elapsed().as_micros(),
            );

            Json(PartialBatchResponse {
                total_companies: results.len(),
                succeeded,
                failed: results.len() - succeeded,
                results,
                timestamp: local_timestamp(),
                status: ResponseStatus::Success,
            })
            .into_response()
        }
    };

    state
        .metrics
        .observe_prediction_latency(started.elapsed().as_secs_f64());

    Ok(response)
}

async fn list_predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let predictions = state.history.list().await;
    Json(SavedPredictionList {
        total: predictions.len(),
        predictions,
        status: ResponseStatus::Success,
    })
}

async fn save_prediction(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let new = parse_body(&body)
        .and_then(|payload| Ok(NewSavedPrediction::from_payload(&payload)?))
        .map_err(|e| state.reject("predictions", e))?;

    let saved = state.history.save(new).await;
    state.metrics.set_saved_predictions(state.history.len().await);
    state
        .logger
        .log_history_change("saved", &saved.id, &saved.company_name);

    Ok(Json(SavedPredictionResponse {
        prediction: saved,
        message: Some("Prediction saved successfully".to_string()),
        status: ResponseStatus::Success,
    }))
}

async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let prediction = state
        .history
        .get(&id)
        .await
        .map_err(|e| state.reject("predictions", e))?;

    Ok(Json(SavedPredictionResponse {
        prediction,
        message: None,
        status: ResponseStatus::Success,
    }))
}

async fn delete_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .history
        .delete(&id)
        .await
        .map_err(|e| state.reject("predictions", e))?;

    state.metrics.set_saved_predictions(state.history.len().await);
    state
        .logger
        .log_history_change("deleted", &removed.id, &removed.company_name);

    Ok(Json(MessageResponse {
        message: "Prediction deleted successfully".to_string(),
        status: ResponseStatus::Success,
    }))
}

impl AppState {
    /// Record a failed request and convert it into an HTTP error
    fn reject(&self, endpoint: &str, err: ServiceError) -> ApiError {
        count_failure(&self.metrics, endpoint, &err);
        let field = match &err {
            ServiceError::Validation(e) => e.field(),
            _ => None,
        };
        self.logger
            .log_rejected(endpoint, err.kind(), field, &err.to_string());
        ApiError(err)
    }
}

/// Client errors count as rejected requests, everything else as prediction errors
fn count_failure(metrics: &ServiceMetrics, endpoint: &str, err: &ServiceError) {
    if err.is_client_error() {
        metrics.inc_rejected(endpoint);
    } else {
        metrics.inc_prediction_error(err.kind());
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ServiceError> {
    serde_json::from_slice(body).map_err(|_| ValidationError::NotAnObject.into())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .route("/batch-predict", post(batch_predict))
        .route("/predictions", get(list_predictions).post(save_prediction))
        .route(
            "/predictions/:id",
            get(get_prediction).delete(delete_prediction),
        )
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::NoCompanies).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(ServiceError::ServiceUnavailable {
                reason: "missing".into()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(ServiceError::Estimation("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(ServiceError::BatchEntry {
                index: 3,
                source: Box::new(ServiceError::Estimation("boom".into())),
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(ServiceError::MetadataUnavailable).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(ServiceError::PredictionNotFound { id: "9".into() }).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    fn rejected_count(endpoint: &str) -> u64 {
        prometheus::gather()
            .iter()
            .filter(|family| family.get_name() == "revenue_predictor_rejected_requests_total")
            .flat_map(|family| family.get_metric().iter())
            .filter(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "endpoint" && label.get_value() == endpoint)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    #[test]
    fn test_entry_validation_failures_count_as_rejections() {
        let metrics = ServiceMetrics::new();
        let before = rejected_count("partial-entry");

        count_failure(
            &metrics,
            "partial-entry",
            &ValidationError::MissingField("region").into(),
        );
        count_failure(
            &metrics,
            "partial-entry",
            &ServiceError::Estimation("boom".into()),
        );

        assert_eq!(rejected_count("partial-entry"), before + 1);
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        let err = parse_body(&Bytes::from_static(b"not json")).unwrap_err();
        assert_eq!(err.to_string(), "Request body must be a JSON object");
    }
}
