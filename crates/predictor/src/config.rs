//! Server configuration

use anyhow::Result;
use predictor_lib::loader::EstimatorSource;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "REVENUE_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "revenuecast";

/// Which estimator the server loads at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// Exported ONNX model
    Trained,
    /// Closed-form formula with Gaussian noise
    Linear,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_estimator")]
    pub estimator: EstimatorKind,

    /// ONNX artifact for the trained estimator
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Metadata document for the trained estimator
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Standard deviation of the linear estimator's noise term
    #[serde(default = "default_noise_std_dev")]
    pub noise_std_dev: f64,

    /// Fixed seed for reproducible noise
    #[serde(default)]
    pub noise_seed: Option<u64>,

    /// Saved predictions kept before the oldest is evicted
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_estimator() -> EstimatorKind {
    EstimatorKind::Trained
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/revenue_model.onnx")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("models/model_metadata.json")
}

fn default_noise_std_dev() -> f64 {
    predictor_lib::estimator::DEFAULT_NOISE_STD_DEV
}

fn default_history_capacity() -> usize {
    predictor_lib::history::DEFAULT_HISTORY_CAPACITY
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            estimator: default_estimator(),
            model_path: default_model_path(),
            metadata_path: default_metadata_path(),
            noise_std_dev: default_noise_std_dev(),
            noise_seed: None,
            history_capacity: default_history_capacity(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the optional config file and `REVENUE_*` variables
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::load_from(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, falling back to defaults");
            Self::default()
        })
    }

    /// Load configuration using `path` as the (optional) config file
    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("REVENUE").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Address to bind the HTTP listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the estimator comes from
    pub fn estimator_source(&self) -> EstimatorSource {
        match self.estimator {
            EstimatorKind::Trained => EstimatorSource::Trained {
                model_path: self.model_path.clone(),
                metadata_path: self.metadata_path.clone(),
            },
            EstimatorKind::Linear => EstimatorSource::Linear {
                noise_std_dev: Some(self.noise_std_dev),
                noise_seed: self.noise_seed,
            },
        }
    }
}
