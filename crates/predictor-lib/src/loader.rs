//! Startup loading of the active estimator
//!
//! Loading never aborts the process: any failure is turned into
//! [`ModelState::Unavailable`] carrying the reason, so the health endpoint
//! stays reachable for diagnostics.

use crate::estimator::{GaussianNoise, LinearEstimator, OnnxEstimator};
use crate::metadata::{MetadataDocument, MetadataProvider};
use crate::models::ModelMetadata;
use crate::service::ModelState;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Largest model artifact accepted (64MB)
pub const MAX_MODEL_BYTES: u64 = 64 * 1024 * 1024;

/// Which estimator to load and where from
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorSource {
    /// Exported ONNX model plus its metadata document
    Trained {
        model_path: PathBuf,
        metadata_path: PathBuf,
    },
    /// Closed-form linear formula; `noise_std_dev` of `None` disables noise
    Linear {
        noise_std_dev: Option<f64>,
        noise_seed: Option<u64>,
    },
}

/// Build the model state for the configured source
pub fn load(source: &EstimatorSource) -> ModelState {
    let loaded = match source {
        EstimatorSource::Trained {
            model_path,
            metadata_path,
        } => load_trained(model_path, metadata_path).map(|(estimator, metadata)| {
            ModelState::ready(Arc::new(estimator), MetadataProvider::new(metadata))
        }),
        EstimatorSource::Linear {
            noise_std_dev,
            noise_seed,
        } => load_linear(*noise_std_dev, *noise_seed).map(|estimator| {
            ModelState::ready(
                Arc::new(estimator),
                MetadataProvider::new(LinearEstimator::reference_metadata()),
            )
        }),
    };

    match loaded {
        Ok(state) => {
            info!(state = ?state, "Estimator loaded");
            state
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Estimator unavailable, serving in degraded mode");
            ModelState::unavailable(format!("{:#}", e))
        }
    }
}

/// Load the ONNX estimator and its metadata, verifying the artifact checksum
pub fn load_trained(
    model_path: &Path,
    metadata_path: &Path,
) -> Result<(OnnxEstimator, ModelMetadata)> {
    let document = MetadataDocument::from_path(metadata_path)?;

    let size = std::fs::metadata(model_path)
        .with_context(|| format!("Failed to stat model artifact {:?}", model_path))?
        .len();
    if size > MAX_MODEL_BYTES {
        anyhow::bail!("Model size {} exceeds maximum {}", size, MAX_MODEL_BYTES);
    }

    let bytes = std::fs::read(model_path)
        .with_context(|| format!("Failed to read model artifact {:?}", model_path))?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = &document.artifact_sha256 {
        if !expected.eq_ignore_ascii_case(&checksum) {
            anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, checksum);
        }
        info!(checksum = %checksum, "Model checksum validated");
    }

    let estimator = OnnxEstimator::new(&bytes)
        .with_context(|| format!("Failed to load model artifact {:?}", model_path))?;

    Ok((estimator, document.into()))
}

fn load_linear(noise_std_dev: Option<f64>, noise_seed: Option<u64>) -> Result<LinearEstimator> {
    let noise = noise_std_dev
        .map(|std_dev| GaussianNoise::new(std_dev, noise_seed))
        .transpose()?;
    Ok(LinearEstimator::new(Default::default(), noise))
}

/// Hex-encoded SHA-256 of the given bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
