//! Error types for request validation and prediction

use crate::models::Region;
use thiserror::Error;

/// Caller-supplied data is malformed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid region. Must be one of: {}", Region::valid_names())]
    InvalidRegion,

    #[error("{0} must be a valid number")]
    InvalidNumber(&'static str),

    #[error("{0} must be non-negative")]
    Negative(&'static str),

    #[error("Invalid value for field: {0}")]
    InvalidValue(&'static str),

    #[error("No companies provided")]
    NoCompanies,

    #[error("Invalid mode. Must be one of: all, partial")]
    InvalidBatchMode,
}

impl ValidationError {
    /// Name of the offending field, if the error concerns one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField(f)
            | ValidationError::InvalidNumber(f)
            | ValidationError::Negative(f)
            | ValidationError::InvalidValue(f) => Some(f),
            ValidationError::InvalidRegion => Some("region"),
            ValidationError::NotAnObject
            | ValidationError::NoCompanies
            | ValidationError::InvalidBatchMode => None,
        }
    }
}

/// Errors surfaced by the prediction service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No estimator was loaded at startup
    #[error("Model not loaded")]
    ServiceUnavailable { reason: String },

    /// The estimator raised during invocation
    #[error("Prediction failed: {0}")]
    Estimation(String),

    #[error("Model metadata not available")]
    MetadataUnavailable,

    #[error("Prediction not found")]
    PredictionNotFound { id: String },

    /// A batch entry failed; `index` is 1-based
    #[error("Company {index}: {source}")]
    BatchEntry {
        index: usize,
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Short machine-readable kind, used for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::ServiceUnavailable { .. } => "unavailable",
            ServiceError::Estimation(_) => "estimation",
            ServiceError::MetadataUnavailable => "metadata_unavailable",
            ServiceError::PredictionNotFound { .. } => "not_found",
            ServiceError::BatchEntry { source, .. } => source.kind(),
        }
    }

    /// True if the failure was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_)
                | ServiceError::BatchEntry { .. }
                | ServiceError::PredictionNotFound { .. }
        )
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
