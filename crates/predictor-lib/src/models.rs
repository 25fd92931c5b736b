//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business region of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "Europe")]
    Europe,
    #[serde(rename = "Asia")]
    Asia,
}

impl Region {
    /// All recognized regions, in the order they are reported to callers
    pub const ALL: [Region; 3] = [Region::NorthAmerica, Region::Europe, Region::Asia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "North America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
        }
    }

    /// Comma-separated list of the recognized region names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    /// Exact, case-sensitive match against the recognized names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Invalid region. Must be one of: {}", Self::valid_names()))
    }
}

/// Validated inputs for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub marketing_spend: f64,
    pub rd_spend: f64,
    pub admin_costs: f64,
    pub num_employees: u64,
    pub region: Region,
}

/// Evaluation metrics of the active model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub r2_score: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Static facts about the active estimator, as served by `/model-info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub performance: PerformanceMetrics,
    pub training_date: String,
    pub dataset_size: u64,
    pub features: Vec<String>,
}

/// Performance snapshot attached to each prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub r2_score: Option<f64>,
    pub mae: Option<f64>,
}

impl ModelPerformance {
    pub fn from_metadata(metadata: Option<&ModelMetadata>) -> Self {
        Self {
            r2_score: metadata.map(|m| m.performance.r2_score),
            mae: metadata.map(|m| m.performance.mae),
        }
    }
}

/// Outcome tag carried by every response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Prediction for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Position of the company in a batch request (0-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_index: Option<usize>,
    pub predicted_revenue: f64,
    pub input_data: PredictionRequest,
    pub model_performance: ModelPerformance,
    pub timestamp: String,
    pub status: ResponseStatus,
}

/// Response body of an all-or-nothing batch prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResult>,
    pub total_companies: usize,
    pub timestamp: String,
    pub status: ResponseStatus,
}

/// Outcome for a single entry of a partial batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntryOutcome {
    Success(PredictionResult),
    Failure(BatchEntryFailure),
}

/// Failed entry of a partial batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntryFailure {
    pub company_index: usize,
    pub error: String,
    pub status: ResponseStatus,
}

/// Response body of a partial batch prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialBatchResponse {
    pub results: Vec<BatchEntryOutcome>,
    pub total_companies: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timestamp: String,
    pub status: ResponseStatus,
}

/// Current local time as an ISO-8601 string without offset
pub fn local_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
