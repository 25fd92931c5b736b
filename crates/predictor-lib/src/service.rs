//! Prediction service
//!
//! Orchestrates validation, feature-frame construction, estimator invocation
//! and response assembly for single and batch requests. The estimator and its
//! metadata are injected once as a [`ModelState`] and never change afterwards.

use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::estimator::{Estimator, FeatureFrame};
use crate::metadata::MetadataProvider;
use crate::models::{
    local_timestamp, ModelMetadata, ModelPerformance, PredictionRequest, PredictionResult,
    ResponseStatus,
};
use crate::validation;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Estimator availability, fixed at startup
#[derive(Clone)]
pub enum ModelState {
    Ready {
        estimator: Arc<dyn Estimator>,
        metadata: MetadataProvider,
    },
    Unavailable {
        reason: String,
    },
}

impl ModelState {
    pub fn ready(estimator: Arc<dyn Estimator>, metadata: MetadataProvider) -> Self {
        ModelState::Ready {
            estimator,
            metadata,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelState::Unavailable {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Ready { estimator, metadata } => f
                .debug_struct("Ready")
                .field("estimator", &estimator.kind())
                .field("metadata_loaded", &metadata.is_loaded())
                .finish(),
            ModelState::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            }
        }
    }
}

/// Stateless prediction front-end over a load-once estimator
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: ModelState,
    empty_metadata: MetadataProvider,
}

impl PredictionService {
    pub fn new(state: ModelState) -> Self {
        Self {
            state,
            empty_metadata: MetadataProvider::empty(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    /// Reason the estimator could not be loaded, if any
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Unavailable { reason } => Some(reason),
            ModelState::Ready { .. } => None,
        }
    }

    pub fn estimator_kind(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready { estimator, .. } => Some(estimator.kind()),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// The active estimator, or `ServiceUnavailable`
    pub fn ensure_available(&self) -> ServiceResult<&dyn Estimator> {
        match &self.state {
            ModelState::Ready { estimator, .. } => Ok(estimator.as_ref()),
            ModelState::Unavailable { reason } => Err(ServiceError::ServiceUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    pub fn metadata_provider(&self) -> &MetadataProvider {
        match &self.state {
            ModelState::Ready { metadata, .. } => metadata,
            ModelState::Unavailable { .. } => &self.empty_metadata,
        }
    }

    pub fn metadata(&self) -> ServiceResult<&ModelMetadata> {
        self.metadata_provider().get()
    }

    /// Predict revenue for an already-validated request
    pub fn predict(&self, request: &PredictionRequest) -> ServiceResult<PredictionResult> {
        let estimator = self.ensure_available()?;
        self.run(estimator, request, None)
    }

    /// Validate a raw payload and predict revenue for it
    pub fn predict_payload(&self, payload: &Value) -> ServiceResult<PredictionResult> {
        let estimator = self.ensure_available()?;
        let request = validation::validate(payload)?;
        self.run(estimator, &request, None)
    }

    /// Predict every entry in order, aborting on the first failure.
    ///
    /// The error names the failing entry by its 1-based position; entries
    /// after it are never validated or estimated.
    pub fn predict_batch(&self, companies: &[Value]) -> ServiceResult<Vec<PredictionResult>> {
        let estimator = self.ensure_available()?;
        if companies.is_empty() {
            return Err(ValidationError::NoCompanies.into());
        }

        let mut predictions = Vec::with_capacity(companies.len());
        for (index, company) in companies.iter().enumerate() {
            let result = validation::validate(company)
                .map_err(ServiceError::from)
                .and_then(|request| self.run(estimator, &request, Some(index)))
                .map_err(|e| ServiceError::BatchEntry {
                    index: index + 1,
                    source: Box::new(e),
                })?;
            predictions.push(result);
        }
        Ok(predictions)
    }

    /// Predict every entry independently, one outcome per entry
    pub fn predict_each(
        &self,
        companies: &[Value],
    ) -> ServiceResult<Vec<ServiceResult<PredictionResult>>> {
        let estimator = self.ensure_available()?;
        if companies.is_empty() {
            return Err(ValidationError::NoCompanies.into());
        }

        Ok(companies
            .iter()
            .enumerate()
            .map(|(index, company)| {
                validation::validate(company)
                    .map_err(ServiceError::from)
                    .and_then(|request| self.run(estimator, &request, Some(index)))
            })
            .collect())
    }

    fn run(
        &self,
        estimator: &dyn Estimator,
        request: &PredictionRequest,
        company_index: Option<usize>,
    ) -> ServiceResult<PredictionResult> {
        let frame = FeatureFrame::from(request);
        let revenue = estimator
            .estimate(&frame)
            .map_err(|e| ServiceError::Estimation(format!("{:#}", e)))?;

        if !revenue.is_finite() {
            return Err(ServiceError::Estimation(format!(
                "estimator returned non-finite value {}",
                revenue
            )));
        }

        debug!(
            estimator = estimator.kind(),
            company_index = ?company_index,
            frame = ?frame.columns(),
            predicted_revenue = revenue,
            "Estimated revenue"
        );

        Ok(PredictionResult {
            company_index,
            predicted_revenue: revenue,
            input_data: request.clone(),
            model_performance: ModelPerformance::from_metadata(self.metadata_provider().snapshot()),
            timestamp: local_timestamp(),
            status: ResponseStatus::Success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::LinearEstimator;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and fails on a configured marketing spend
    struct CountingEstimator {
        calls: AtomicUsize,
        fail_on_marketing: Option<f64>,
        output: f64,
    }

    impl CountingEstimator {
        fn new(output: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_marketing: None,
                output,
            }
        }
    }

    impl Estimator for CountingEstimator {
        fn estimate(&self, frame: &FeatureFrame) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_marketing == Some(frame.marketing_spend) {
                anyhow::bail!("counting failure");
            }
            Ok(self.output)
        }

        fn kind(&self) -> &str {
            "counting"
        }
    }

    fn company(marketing: f64, region: &str) -> Value {
        json!({
            "marketing_spend": marketing,
            "rd_spend": 120000,
            "admin_costs": 50000,
            "num_employees": 300,
            "region": region
        })
    }

    fn linear_service() -> PredictionService {
        PredictionService::new(ModelState::ready(
            Arc::new(LinearEstimator::deterministic()),
            MetadataProvider::new(LinearEstimator::reference_metadata()),
        ))
    }

    #[test]
    fn test_single_prediction_matches_closed_form() {
        let service = linear_service();
        let result = service
            .predict_payload(&company(150000.0, "North America"))
            .unwrap();
        assert!((result.predicted_revenue - 292_750.0).abs() < 1e-6);
        assert_eq!(result.status, ResponseStatus::Success);
        assert_eq!(result.company_index, None);
        assert_eq!(result.model_performance.r2_score, Some(0.9234));
        assert_eq!(result.input_data.num_employees, 300);
    }

    #[test]
    fn test_unavailable_short_circuits_before_validation() {
        let service = PredictionService::new(ModelState::unavailable("artifact missing"));
        let err = service.predict_payload(&json!({})).unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable { .. }));

        let err = service.predict_batch(&[]).unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable { .. }));
        assert_eq!(service.unavailable_reason(), Some("artifact missing"));
        assert!(matches!(
            service.metadata(),
            Err(ServiceError::MetadataUnavailable)
        ));
    }

    #[test]
    fn test_validation_error_propagates() {
        let service = linear_service();
        let err = service.predict_payload(&company(-1.0, "Asia")).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Negative("marketing_spend"))
        ));
    }

    #[test]
    fn test_batch_keeps_order_and_indices() {
        let service = linear_service();
        let companies = vec![
            company(150000.0, "North America"),
            company(150000.0, "Europe"),
            company(150000.0, "Asia"),
        ];
        let results = service.predict_batch(&companies).unwrap();
        let indices: Vec<_> = results.iter().map(|r| r.company_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2)]);
        assert!((results[1].predicted_revenue - 287_050.0).abs() < 1e-6);
        assert!((results[2].predicted_revenue - 289_550.0).abs() < 1e-6);
    }

    #[test]
    fn test_batch_empty_is_validation_error() {
        let service = linear_service();
        let err = service.predict_batch(&[]).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::NoCompanies)
        ));
    }

    #[test]
    fn test_batch_aborts_at_first_invalid_entry() {
        let counting = Arc::new(CountingEstimator::new(100.0));
        let service =
            PredictionService::new(ModelState::ready(counting.clone(), MetadataProvider::empty()));

        let mut invalid = company(1.0, "Asia");
        invalid.as_object_mut().unwrap().remove("admin_costs");
        let companies = vec![
            company(1.0, "Asia"),
            invalid,
            company(2.0, "Asia"),
            company(3.0, "Asia"),
        ];

        let err = service.predict_batch(&companies).unwrap_err();
        assert_eq!(err.to_string(), "Company 2: Missing required field: admin_costs");
        assert!(matches!(err, ServiceError::BatchEntry { index: 2, .. }));
        // Only the entry before the failure reached the estimator
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_estimator_failure_reports_entry() {
        let counting = Arc::new(CountingEstimator {
            calls: AtomicUsize::new(0),
            fail_on_marketing: Some(2.0),
            output: 10.0,
        });
        let service =
            PredictionService::new(ModelState::ready(counting.clone(), MetadataProvider::empty()));
        let companies = vec![company(1.0, "Asia"), company(2.0, "Asia"), company(3.0, "Asia")];

        let err = service.predict_batch(&companies).unwrap_err();
        assert_eq!(err.to_string(), "Company 2: Prediction failed: counting failure");
        assert_eq!(err.kind(), "estimation");
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_predict_each_never_aborts() {
        let service = linear_service();
        let companies = vec![
            company(150000.0, "Asia"),
            company(150000.0, "Atlantis"),
            json!({ "marketing_spend": 1 }),
            company(150000.0, "Europe"),
        ];
        let outcomes = service.predict_each(&companies).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1],
            Err(ServiceError::Validation(ValidationError::InvalidRegion))
        ));
        assert!(matches!(
            outcomes[2],
            Err(ServiceError::Validation(ValidationError::MissingField("rd_spend")))
        ));
        assert_eq!(outcomes[3].as_ref().unwrap().company_index, Some(3));
    }

    #[test]
    fn test_non_finite_estimate_is_estimation_error() {
        let service = PredictionService::new(ModelState::ready(
            Arc::new(CountingEstimator::new(f64::NAN)),
            MetadataProvider::empty(),
        ));
        let err = service.predict_payload(&company(1.0, "Asia")).unwrap_err();
        assert!(matches!(err, ServiceError::Estimation(_)));
    }

    #[test]
    fn test_performance_is_null_without_metadata() {
        let service = PredictionService::new(ModelState::ready(
            Arc::new(LinearEstimator::deterministic()),
            MetadataProvider::empty(),
        ));
        let result = service.predict_payload(&company(0.0, "Asia")).unwrap();
        assert_eq!(result.model_performance.r2_score, None);
        assert_eq!(result.model_performance.mae, None);
    }

    #[test]
    fn test_service_is_shareable_across_threads() {
        let service = Arc::new(linear_service());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service
                        .predict_payload(&company(1000.0 * i as f64, "Europe"))
                        .unwrap()
                        .predicted_revenue
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 0.0);
        }
    }
}
