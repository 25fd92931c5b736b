//! Trained-model inference using tract
//!
//! Runs the exported revenue regression model. The graph takes a single
//! `[1, 6]` f32 row (see [`ENCODED_FEATURES`](super::ENCODED_FEATURES)) and
//! yields the revenue estimate as its first output value.

use super::{Estimator, FeatureFrame, NUM_ENCODED_FEATURES};
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Estimator backed by an optimized ONNX graph
pub struct OnnxEstimator {
    model: TractModel,
}

impl OnnxEstimator {
    /// Create an estimator from model bytes
    pub fn new(model_bytes: &[u8]) -> Result<Self> {
        let model = Self::load_model(model_bytes)?;
        Ok(Self { model })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_ENCODED_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    /// Convert the feature frame to the model's input tensor
    fn frame_to_tensor(frame: &FeatureFrame) -> Result<Tensor> {
        let row = frame.encoded();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_ENCODED_FEATURES), row.to_vec())
            .context("Failed to shape input row")?;
        Ok(array.into())
    }
}

impl Estimator for OnnxEstimator {
    fn estimate(&self, frame: &FeatureFrame) -> Result<f64> {
        let start = Instant::now();

        let input = Self::frame_to_tensor(frame)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let revenue = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model output is empty")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(revenue as f64)
    }

    fn kind(&self) -> &str {
        "onnx"
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::Coefficients;
    use crate::models::{PredictionRequest, Region};

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        let err = OnnxEstimator::new(b"definitely not a protobuf graph").err();
        assert!(err.is_some());
    }

    fn frame(region: Region) -> FeatureFrame {
        FeatureFrame::from(&PredictionRequest {
            marketing_spend: 150_000.0,
            rd_spend: 120_000.0,
            admin_costs: 50_000.0,
            num_employees: 300,
            region,
        })
    }

    #[test]
    fn test_regression_graph_matches_closed_form() {
        let bytes = fixture::regression_graph(&Coefficients::default());
        let estimator = OnnxEstimator::new(&bytes).unwrap();
        assert_eq!(estimator.kind(), "onnx");

        for (region, expected) in [
            (Region::NorthAmerica, 292_750.0),
            (Region::Europe, 287_050.0),
            (Region::Asia, 289_550.0),
        ] {
            let revenue = estimator.estimate(&frame(region)).unwrap();
            assert!(
                (revenue - expected).abs() < 1.0,
                "{:?}: {} != {}",
                region,
                revenue,
                expected
            );
        }
    }

    #[test]
    fn test_frame_to_tensor_shape() {
        let frame = FeatureFrame::from(&PredictionRequest {
            marketing_spend: 1.0,
            rd_spend: 2.0,
            admin_costs: 3.0,
            num_employees: 4,
            region: Region::NorthAmerica,
        });
        let tensor = OnnxEstimator::frame_to_tensor(&frame).unwrap();
        assert_eq!(tensor.shape(), &[1, NUM_ENCODED_FEATURES]);
        let values: Vec<f32> = tensor.to_array_view::<f32>().unwrap().iter().copied().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 0.0, 1.0]);
    }
}
