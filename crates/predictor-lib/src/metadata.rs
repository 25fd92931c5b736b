//! Model metadata loading and read-only access

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ModelMetadata, PerformanceMetrics};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Metadata document written next to the model artifact by the training pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataDocument {
    pub model_type: String,
    pub test_r2: f64,
    pub test_mae: f64,
    pub test_rmse: f64,
    pub training_date: String,
    pub dataset_size: u64,
    pub features: Vec<String>,
    /// Hex-encoded SHA-256 of the model artifact
    #[serde(default)]
    pub artifact_sha256: Option<String>,
}

impl MetadataDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model metadata {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model metadata {:?}", path))
    }
}

impl From<MetadataDocument> for ModelMetadata {
    fn from(doc: MetadataDocument) -> Self {
        Self {
            model_type: doc.model_type,
            performance: PerformanceMetrics {
                r2_score: doc.test_r2,
                mae: doc.test_mae,
                rmse: doc.test_rmse,
            },
            training_date: doc.training_date,
            dataset_size: doc.dataset_size,
            features: doc.features,
        }
    }
}

/// Read-only accessor over the metadata loaded at startup
#[derive(Debug, Clone, Default)]
pub struct MetadataProvider {
    metadata: Option<Arc<ModelMetadata>>,
}

impl MetadataProvider {
    pub fn new(metadata: ModelMetadata) -> Self {
        Self {
            metadata: Some(Arc::new(metadata)),
        }
    }

    /// Provider with nothing loaded
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ServiceResult<&ModelMetadata> {
        self.metadata
            .as_deref()
            .ok_or(ServiceError::MetadataUnavailable)
    }

    pub fn snapshot(&self) -> Option<&ModelMetadata> {
        self.metadata.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.metadata.is_some()
    }
}
