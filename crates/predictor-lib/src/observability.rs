//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request counts, batch size, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for batch sizes (number of companies)
const BATCH_SIZE_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    batch_size: Histogram,
    predictions_total: IntCounter,
    rejected_requests: IntCounterVec,
    prediction_errors: IntCounterVec,
    model_loaded: IntGauge,
    model_info: GaugeVec,
    saved_predictions: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "revenue_predictor_prediction_latency_seconds",
                "Time spent handling a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            batch_size: register_histogram!(
                "revenue_predictor_batch_size",
                "Number of companies per batch request",
                BATCH_SIZE_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_size"),

            predictions_total: register_int_counter!(
                "revenue_predictor_predictions_total",
                "Total number of revenue predictions produced"
            )
            .expect("Failed to register predictions_total"),

            rejected_requests: register_int_counter_vec!(
                "revenue_predictor_rejected_requests_total",
                "Requests rejected because of invalid input",
                &["endpoint"]
            )
            .expect("Failed to register rejected_requests"),

            prediction_errors: register_int_counter_vec!(
                "revenue_predictor_prediction_errors_total",
                "Prediction failures by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors"),

            model_loaded: register_int_gauge!(
                "revenue_predictor_model_loaded",
                "1 if an estimator is loaded, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "revenue_predictor_model_info",
                "Information about the active estimator",
                &["estimator", "model_type"]
            )
            .expect("Failed to register model_info"),

            saved_predictions: register_int_gauge!(
                "revenue_predictor_saved_predictions",
                "Number of predictions in the saved history"
            )
            .expect("Failed to register saved_predictions"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Record the size of a batch request
    pub fn observe_batch_size(&self, companies: usize) {
        self.inner().batch_size.observe(companies as f64);
    }

    /// Add produced predictions to the counter
    pub fn inc_predictions(&self, count: u64) {
        self.inner().predictions_total.inc_by(count);
    }

    /// Count a request rejected for invalid input
    pub fn inc_rejected(&self, endpoint: &str) {
        self.inner()
            .rejected_requests
            .with_label_values(&[endpoint])
            .inc();
    }

    /// Count a failed prediction by error kind
    pub fn inc_prediction_error(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_saved_predictions(&self, count: usize) {
        self.inner().saved_predictions.set(count as i64);
    }

    /// Publish which estimator is active
    pub fn set_model(&self, estimator: Option<&str>, model_type: Option<&str>) {
        let inner = self.inner();
        inner.model_info.reset();
        match estimator {
            Some(estimator) => {
                inner.model_loaded.set(1);
                inner
                    .model_info
                    .with_label_values(&[estimator, model_type.unwrap_or("unknown")])
                    .set(1.0);
            }
            None => inner.model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, rejected
/// requests and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a single prediction
    pub fn log_prediction(
        &self,
        region: &str,
        num_employees: u64,
        predicted_revenue: f64,
        elapsed_us: u128,
    ) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            region = %region,
            num_employees = num_employees,
            predicted_revenue = predicted_revenue,
            elapsed_us = elapsed_us as u64,
            "Generated revenue prediction"
        );
    }

    /// Log a completed batch
    pub fn log_batch(&self, total: usize, succeeded: usize, partial: bool, elapsed_us: u128) {
        info!(
            event = "batch_completed",
            instance = %self.instance,
            total_companies = total,
            succeeded = succeeded,
            partial = partial,
            elapsed_us = elapsed_us as u64,
            "Completed batch prediction"
        );
    }

    /// Log a request that was refused
    pub fn log_rejected(&self, endpoint: &str, kind: &str, field: Option<&str>, error: &str) {
        warn!(
            event = "request_rejected",
            instance = %self.instance,
            endpoint = %endpoint,
            kind = %kind,
            field = field,
            error = %error,
            "Prediction request rejected"
        );
    }

    /// Log a change to the saved prediction history
    pub fn log_history_change(&self, action: &str, id: &str, company_name: &str) {
        info!(
            event = "history_changed",
            instance = %self.instance,
            action = %action,
            id = %id,
            company_name = %company_name,
            "Saved prediction history updated"
        );
    }

    /// Log the result of loading the estimator
    pub fn log_model_status(&self, estimator: Option<&str>, unavailable_reason: Option<&str>) {
        match estimator {
            Some(estimator) => info!(
                event = "model_loaded",
                instance = %self.instance,
                estimator = %estimator,
                "Estimator ready"
            ),
            None => warn!(
                event = "model_unavailable",
                instance = %self.instance,
                reason = %unavailable_reason.unwrap_or("unknown"),
                "Estimator unavailable, predictions will fail until restart"
            ),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            addr = %addr,
            "Revenue predictor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Revenue predictor shutting down"
        );
    }
}
