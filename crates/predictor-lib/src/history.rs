//! Saved prediction history
//!
//! Callers can keep predictions under a company name with free-form notes.
//! Entries live in memory for the lifetime of the process and are listed
//! most recently saved first. When the store is full the oldest entry is
//! evicted.

use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::models::{ModelPerformance, PredictionRequest, ResponseStatus};
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Entries kept before the oldest is evicted
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

pub const COMPANY_NAME: &str = "companyName";
pub const INPUT_DATA: &str = "input_data";
pub const PREDICTED_REVENUE: &str = "predicted_revenue";
pub const MODEL_PERFORMANCE: &str = "model_performance";
pub const NOTES: &str = "notes";

/// Fields a save request must carry, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 4] =
    [COMPANY_NAME, INPUT_DATA, PREDICTED_REVENUE, MODEL_PERFORMANCE];

/// A prediction the caller asked to keep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavedPrediction {
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub input_data: PredictionRequest,
    pub predicted_revenue: f64,
    pub model_performance: ModelPerformance,
    #[serde(default)]
    pub notes: String,
}

impl NewSavedPrediction {
    /// Validate a raw save request
    ///
    /// Absent, null and empty-string values count as missing. `input_data`
    /// goes through the same checks as a prediction request.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let fields = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        let is_missing = |name: &str| match fields.get(name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| is_missing(**f)) {
            return Err(ValidationError::MissingField(*missing));
        }

        let company_name = fields[COMPANY_NAME]
            .as_str()
            .ok_or(ValidationError::InvalidValue(COMPANY_NAME))?
            .to_string();
        let input_data = validation::validate(&fields[INPUT_DATA])?;
        let predicted_revenue = fields[PREDICTED_REVENUE]
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(ValidationError::InvalidNumber(PREDICTED_REVENUE))?;
        let model_performance = serde_json::from_value(fields[MODEL_PERFORMANCE].clone())
            .map_err(|_| ValidationError::InvalidValue(MODEL_PERFORMANCE))?;
        let notes = match fields.get(NOTES) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ValidationError::InvalidValue(NOTES)),
        };

        Ok(Self {
            company_name,
            input_data,
            predicted_revenue,
            model_performance,
            notes,
        })
    }
}

/// A stored prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPrediction {
    pub id: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub input_data: PredictionRequest,
    pub predicted_revenue: f64,
    pub model_performance: ModelPerformance,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub notes: String,
}

/// Body of `GET /predictions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPredictionList {
    pub predictions: Vec<SavedPrediction>,
    pub total: usize,
    pub status: ResponseStatus,
}

/// Body returned when a single saved prediction is created or fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPredictionResponse {
    pub prediction: SavedPrediction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: ResponseStatus,
}

/// Body carrying only a confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub status: ResponseStatus,
}

#[derive(Debug)]
struct Entries {
    by_id: BTreeMap<u64, SavedPrediction>,
    next_id: u64,
}

/// Lock-guarded, bounded store of saved predictions
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    entries: Arc<RwLock<Entries>>,
    capacity: usize,
}

impl Default for PredictionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PredictionHistory {
    /// Create a store holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries {
                by_id: BTreeMap::new(),
                next_id: 1,
            })),
            capacity: capacity.max(1),
        }
    }

    /// Store a prediction and return it with its assigned id
    pub async fn save(&self, new: NewSavedPrediction) -> SavedPrediction {
        let mut entries = self.entries.write().await;

        let id = entries.next_id;
        entries.next_id += 1;

        while entries.by_id.len() >= self.capacity {
            entries.by_id.pop_first();
        }

        let saved = SavedPrediction {
            id: id.to_string(),
            company_name: new.company_name,
            input_data: new.input_data,
            predicted_revenue: new.predicted_revenue,
            model_performance: new.model_performance,
            created_at: Utc::now(),
            notes: new.notes,
        };
        entries.by_id.insert(id, saved.clone());
        saved
    }

    /// All entries, most recently saved first
    pub async fn list(&self) -> Vec<SavedPrediction> {
        self.entries.read().await.by_id.values().rev().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> ServiceResult<SavedPrediction> {
        let key = parse_id(id)?;
        self.entries
            .read()
            .await
            .by_id
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Remove an entry by id
    pub async fn delete(&self, id: &str) -> ServiceResult<SavedPrediction> {
        let key = parse_id(id)?;
        self.entries
            .write()
            .await
            .by_id
            .remove(&key)
            .ok_or_else(|| not_found(id))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn parse_id(id: &str) -> ServiceResult<u64> {
    id.parse().map_err(|_| not_found(id))
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::PredictionNotFound { id: id.to_string() }
}
