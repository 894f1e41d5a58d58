//! Model abstraction, loading and prediction helpers

mod forest;
mod onnx;
mod scoring;
mod validation;

pub use forest::ForestClassifier;
pub use onnx::OnnxClassifier;
pub use scoring::{ScoreConfig, ScoreConverter, MAX_SCORE, MIN_SCORE, VARIANCE_SPAN};
pub use validation::{FeatureValidator, CREDIT_MIX_LEVELS};

use crate::error::ServiceError;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// A trained classifier producing a class id from one feature row
///
/// Probability estimation and feature importances are optional
/// capabilities. Implementations advertise them by overriding the
/// `as_*` accessors.
pub trait Classifier: Send + Sync {
    /// Predict the class id for a single feature row
    fn predict_category(&self, features: &[f64]) -> Result<i64>;

    /// Class id plus, when estimable, the probabilities from one evaluation
    ///
    /// Models whose label and probabilities come from the same pass should
    /// override this so each row is evaluated once.
    fn predict_row(&self, features: &[f64]) -> Result<RowPrediction> {
        let category = self.predict_category(features)?;
        let probabilities = self
            .as_probability_estimator()
            .map(|estimator| estimator.predict_proba(features));
        Ok(RowPrediction {
            category,
            probabilities,
        })
    }

    /// Runtime type name reported to callers
    fn model_type(&self) -> &str;

    /// Optional introspection attributes
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata::default()
    }

    fn as_probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        None
    }

    fn as_feature_importances(&self) -> Option<&dyn FeatureImportances> {
        None
    }
}

/// Output of [`Classifier::predict_row`]
#[derive(Debug)]
pub struct RowPrediction {
    pub category: i64,
    /// `None` without the probability capability, `Some(Err(..))` on a fault
    pub probabilities: Option<Result<Vec<f64>>>,
}

/// Capability: per-class probabilities for one feature row
pub trait ProbabilityEstimator {
    /// Probabilities indexed by class id
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Capability: global per-feature importance weights
pub trait FeatureImportances {
    /// Weights indexed by feature position
    fn feature_importances(&self) -> Result<Vec<f64>>;
}

/// Attributes a model may expose about itself; each one is independent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

/// Load a classifier artifact, picking the format from the file extension
///
/// When `expected_sha256` is given the file digest is checked before parsing.
pub fn load_classifier(
    path: &Path,
    expected_sha256: Option<&str>,
) -> std::result::Result<Box<dyn Classifier>, ServiceError> {
    if !path.is_file() {
        warn!(path = %path.display(), "Model file not found");
        return Err(ServiceError::ModelNotFound(path.to_path_buf()));
    }

    info!(path = %path.display(), "Loading model");

    read_classifier(path, expected_sha256).map_err(|source| {
        warn!(path = %path.display(), error = %format!("{:#}", source), "Error loading model");
        ServiceError::ModelLoad {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn read_classifier(path: &Path, expected_sha256: Option<&str>) -> Result<Box<dyn Classifier>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read model file {:?}", path))?;

    if let Some(expected) = expected_sha256 {
        let computed = compute_checksum(&bytes);
        if !computed.eq_ignore_ascii_case(expected) {
            anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, computed);
        }
        info!(checksum = %computed, "Model checksum validated");
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("onnx") => Ok(Box::new(OnnxClassifier::from_bytes(&bytes)?)),
        Some("json") => Ok(Box::new(ForestClassifier::from_slice(&bytes)?)),
        other => anyhow::bail!(
            "Unsupported model format {:?}, expected .onnx or .json",
            other.unwrap_or("")
        ),
    }
}

/// SHA-256 digest of a model artifact as lowercase hex
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit_classifier.onnx");
        let err = load_classifier(&path, None).err().unwrap();
        assert!(matches!(err, ServiceError::ModelNotFound(p) if p == path));
    }

    #[test]
    fn test_directory_is_not_a_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_classifier(dir.path(), None).err().unwrap();
        assert!(matches!(err, ServiceError::ModelNotFound(_)));
    }

    #[test]
    fn test_unknown_extension_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".joblib").tempfile().unwrap();
        file.write_all(b"\x80\x04pickle").unwrap();
        let err = load_classifier(file.path(), None).err().unwrap();
        assert!(matches!(err, ServiceError::ModelLoad { .. }));
        assert!(err.to_string().contains("Unsupported model format"));
    }

    #[test]
    fn test_corrupt_onnx_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        file.write_all(b"definitely not protobuf").unwrap();
        let err = load_classifier(file.path(), None).err().unwrap();
        assert!(matches!(err, ServiceError::ModelLoad { .. }));
    }

    #[test]
    fn test_checksum_mismatch_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{}").unwrap();
        let wrong = "0".repeat(64);
        let err = load_classifier(file.path(), Some(&wrong)).err().unwrap();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_compute_checksum() {
        assert_eq!(
            compute_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
