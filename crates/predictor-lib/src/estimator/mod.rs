//! Revenue estimators

mod frame;
mod linear;
mod onnx;

pub use frame::{FeatureFrame, COLUMNS, ENCODED_FEATURES, NUM_ENCODED_FEATURES};
pub use linear::{Coefficients, Contribution, GaussianNoise, LinearEstimator, DEFAULT_NOISE_STD_DEV};
pub use onnx::OnnxEstimator;

#[cfg(test)]
pub(crate) use onnx::fixture as onnx_fixture;

use anyhow::Result;

/// A source of revenue estimates for a single-row feature frame
pub trait Estimator: Send + Sync {
    /// Estimate revenue for the given frame
    fn estimate(&self, frame: &FeatureFrame) -> Result<f64>;

    /// Human-readable kind of estimator, e.g. "onnx" or "linear"
    fn kind(&self) -> &str;
}
