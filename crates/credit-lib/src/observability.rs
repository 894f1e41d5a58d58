//! Structured logging for prediction service events
//!
//! Every event carries an `event` field and the model source so log lines
//! can be filtered the same way whether they are emitted as text or JSON.

use crate::predictor::ModelMetadata;
use tracing::{debug, info, warn};

/// Structured logger for service events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    model_source: String,
}

impl StructuredLogger {
    pub fn new(model_source: impl Into<String>) -> Self {
        Self {
            model_source: model_source.into(),
        }
    }

    pub fn model_source(&self) -> &str {
        &self.model_source
    }

    /// Log a successful model load
    pub fn log_model_loaded(
        &self,
        model_type: &str,
        metadata: &ModelMetadata,
        probabilities: bool,
        importances: bool,
    ) {
        info!(
            event = "model_loaded",
            model = %self.model_source,
            model_type = %model_type,
            n_estimators = ?metadata.n_estimators,
            probabilities = probabilities,
            feature_importances = importances,
            "Model loaded successfully"
        );
        if let Some(n) = metadata.n_estimators {
            info!(model = %self.model_source, "Model details: {} estimators", n);
        }
        if importances {
            info!(model = %self.model_source, "Feature importances available");
        }
    }

    /// Log a completed prediction
    pub fn log_prediction(&self, label: &str, credit_score: u32, confidence: f64, elapsed_us: u128) {
        debug!(
            event = "prediction_generated",
            model = %self.model_source,
            label = %label,
            credit_score = credit_score,
            confidence = confidence,
            elapsed_us = elapsed_us,
            "Generated credit prediction"
        );
    }

    /// Log a prediction that was turned into a failure result
    pub fn log_prediction_failed(&self, reason: &str) {
        warn!(
            event = "prediction_failed",
            model = %self.model_source,
            reason = %reason,
            "Prediction failed"
        );
    }

    /// Log an optional model capability that could not be used for a call
    pub fn log_capability_unavailable(&self, capability: &str, error: &anyhow::Error) {
        warn!(
            event = "capability_unavailable",
            model = %self.model_source,
            capability = %capability,
            error = %format!("{:#}", error),
            "Could not get {}",
            capability
        );
    }

    /// Log a batch run summary
    pub fn log_batch(&self, total: usize, failed: usize) {
        info!(
            event = "batch_completed",
            model = %self.model_source,
            total = total,
            failed = failed,
            "Batch prediction completed"
        );
    }
}
