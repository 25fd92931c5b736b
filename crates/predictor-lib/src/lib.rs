//! Library for the RevenueCast prediction service
//!
//! This crate provides the core functionality for:
//! - Request validation
//! - Trained-model (ONNX) and closed-form revenue estimators
//! - Single and batch prediction orchestration
//! - Model metadata access
//! - Saved prediction history
//! - Health checks and observability

pub mod error;
pub mod estimator;
pub mod health;
pub mod history;
pub mod loader;
pub mod metadata;
pub mod models;
pub mod observability;
pub mod service;
pub mod validation;

pub use error::{ServiceError, ServiceResult, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::{
    MessageResponse, NewSavedPrediction, PredictionHistory, SavedPrediction,
    SavedPredictionList, SavedPredictionResponse,
};
pub use loader::EstimatorSource;
pub use metadata::MetadataProvider;
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use service::{ModelState, PredictionService};
