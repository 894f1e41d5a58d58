//! Error types for the prediction service

use std::path::PathBuf;
use thiserror::Error;

/// Reason a feature vector was rejected by the validator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureViolation {
    #[error("Expected {expected} features, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("Outstanding debt cannot be negative")]
    NegativeOutstandingDebt,

    #[error("Credit mix must be 0, 1, or 2")]
    InvalidCreditMix,

    #[error("Credit history age cannot be negative")]
    NegativeCreditHistoryAge,

    #[error("Annual income cannot be negative")]
    NegativeAnnualIncome,

    #[error("Delayed payments cannot be negative")]
    NegativeDelayedPayments,
}

/// Errors raised by the prediction service
///
/// `InvalidConfig`, `ModelNotFound` and `ModelLoad` are construction
/// failures. The remaining variants are turned into failure results by the
/// predictor and never reach callers of `predict`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid configuration: {0:#}")]
    InvalidConfig(#[source] anyhow::Error),

    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load model from {}: {source:#}", .path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid features provided: {0}")]
    InvalidInput(#[from] FeatureViolation),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Model inference failed: {0:#}")]
    Inference(#[source] anyhow::Error),

    #[error("Model returned unknown credit category {0}")]
    UnknownCategory(i64),
}

impl ServiceError {
    /// Returns true for errors that leave the service unusable
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidConfig(_)
                | ServiceError::ModelNotFound(_)
                | ServiceError::ModelLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_includes_reason() {
        let err = ServiceError::from(FeatureViolation::InvalidCreditMix);
        assert_eq!(
            err.to_string(),
            "Invalid features provided: Credit mix must be 0, 1, or 2"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_load_errors_are_fatal() {
        let not_found = ServiceError::ModelNotFound(PathBuf::from("models/missing.onnx"));
        assert!(not_found.is_fatal());
        assert!(not_found.to_string().contains("models/missing.onnx"));

        let load = ServiceError::ModelLoad {
            path: PathBuf::from("models/bad.json"),
            source: anyhow::anyhow!("unexpected end of input"),
        };
        assert!(load.is_fatal());
        assert!(load.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let err = ServiceError::InvalidConfig(anyhow::anyhow!(
            "default_confidence must be within [0, 1], got 3"
        ));
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: default_confidence must be within [0, 1], got 3"
        );
    }

    #[test]
    fn test_arity_message() {
        let violation = FeatureViolation::Arity { expected: 7, actual: 5 };
        assert_eq!(violation.to_string(), "Expected 7 features, got 5");
    }
}
