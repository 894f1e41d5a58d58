//! ONNX classifier inference using tract
//!
//! Expects a classifier exported with a `[1, 7]` float input. Output 0 is
//! the predicted label. A second output, when present, is read as the
//! `[1, n_classes]` probability tensor (skl2onnx with `zipmap=False`).

use super::{Classifier, ProbabilityEstimator, RowPrediction};
use crate::schema::FEATURE_COUNT;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier
pub struct OnnxClassifier {
    model: TractModel,
    output_count: usize,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;
        let output_count = model.outputs.len();

        let model = model
            .with_input_fact(0, f32::fact([1, FEATURE_COUNT]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        debug!(outputs = output_count, "ONNX model ready");
        Ok(Self {
            model,
            output_count,
        })
    }

    fn features_to_tensor(features: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, data.len()), data)
            .context("Failed to shape feature row")?;
        Ok(array.into())
    }

    /// Run the graph on one row and return every output
    fn run(&self, features: &[f64]) -> Result<TVec<TValue>> {
        let start = Instant::now();
        let input = Self::features_to_tensor(features)?;
        let outputs = self.model.run(tvec!(input.into()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }
        Ok(outputs)
    }

    fn label(outputs: &[TValue]) -> Result<i64> {
        let label = outputs.first().context("No output from model")?;
        let labels = label.cast_to::<i64>()?;
        labels
            .as_slice::<i64>()?
            .first()
            .copied()
            .context("Model label output is empty")
    }

    fn probabilities(outputs: &[TValue]) -> Result<Vec<f64>> {
        let proba = outputs.get(1).context("Model has no probability output")?;
        let proba = proba.cast_to::<f32>()?;
        Ok(proba.as_slice::<f32>()?.iter().map(|p| *p as f64).collect())
    }
}

impl Classifier for OnnxClassifier {
    fn predict_category(&self, features: &[f64]) -> Result<i64> {
        Self::label(&self.run(features)?)
    }

    fn predict_row(&self, features: &[f64]) -> Result<RowPrediction> {
        let outputs = self.run(features)?;
        let category = Self::label(&outputs)?;
        let probabilities = self
            .as_probability_estimator()
            .map(|_| Self::probabilities(&outputs));
        Ok(RowPrediction {
            category,
            probabilities,
        })
    }

    fn model_type(&self) -> &str {
        "OnnxClassifier"
    }

    fn as_probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        if self.output_count >= 2 {
            Some(self)
        } else {
            None
        }
    }
}

impl ProbabilityEstimator for OnnxClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        Self::probabilities(&self.run(features)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Softmax regression over the seven features, label then probabilities
    const LOGISTIC_FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/logistic.onnx");

    const GOOD_PROFILE: [f64; 7] = [5000.0, 1.0, 36.0, 2500.0, 85.0, 60000.0, 2.0];
    const POOR_PROFILE: [f64; 7] = [15000.0, 0.0, 12.0, 8000.0, 45.0, 35000.0, 8.0];
    const STANDARD_PROFILE: [f64; 7] = [8000.0, 2.0, 24.0, 4000.0, 70.0, 50000.0, 3.0];

    #[test]
    fn test_fixture_predicts_each_profile() {
        let model = OnnxClassifier::from_bytes(LOGISTIC_FIXTURE).unwrap();
        assert_eq!(model.predict_category(&GOOD_PROFILE).unwrap(), 0);
        assert_eq!(model.predict_category(&POOR_PROFILE).unwrap(), 1);
        assert_eq!(model.predict_category(&STANDARD_PROFILE).unwrap(), 2);
        assert_eq!(model.model_type(), "OnnxClassifier");
        assert!(model.as_feature_importances().is_none());
    }

    #[test]
    fn test_fixture_probabilities() {
        let model = OnnxClassifier::from_bytes(LOGISTIC_FIXTURE).unwrap();
        assert!(model.as_probability_estimator().is_some());

        let proba = model.predict_proba(&GOOD_PROFILE).unwrap();
        let expected = [0.6731, 0.0026, 0.3244];
        assert_eq!(proba.len(), 3);
        for (p, e) in proba.iter().zip(expected) {
            assert!((p - e).abs() < 1e-3, "{:?}", proba);
        }
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_row_prediction_matches_separate_calls() {
        let model = OnnxClassifier::from_bytes(LOGISTIC_FIXTURE).unwrap();
        let row = model.predict_row(&STANDARD_PROFILE).unwrap();
        assert_eq!(row.category, 2);
        assert_eq!(
            row.probabilities.unwrap().unwrap(),
            model.predict_proba(&STANDARD_PROFILE).unwrap()
        );
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(OnnxClassifier::from_bytes(b"not an onnx graph").is_err());
        assert!(OnnxClassifier::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_features_to_tensor_shape() {
        let tensor = OnnxClassifier::features_to_tensor(&[1.0; FEATURE_COUNT]).unwrap();
        assert_eq!(tensor.shape(), &[1, FEATURE_COUNT]);
    }
}
