//! Credit scoring service
//!
//! Owns the loaded classifier and runs the prediction pipeline:
//! validate → classify → probabilities / importances (best effort) →
//! score → result. Prediction never fails past this boundary; every error
//! becomes a [`PredictionResult::Failure`].

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::models::{ModelDescriptor, ModelInfo, Prediction, PredictionResult};
use crate::observability::StructuredLogger;
use crate::predictor::{load_classifier, Classifier, FeatureValidator, ScoreConverter};
use crate::schema::{CreditCategory, Feature, LabeledValues, FEATURE_COUNT, FEATURE_NAMES};
use rand::Rng;
use std::time::Instant;

/// Allowed drift of a probability sum from 1 before renormalizing
///
/// Loose enough for models that compute in f32.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Stateless prediction facade over a pre-trained classifier
pub struct CreditScoringService {
    model: Option<Box<dyn Classifier>>,
    validator: FeatureValidator,
    scorer: ScoreConverter,
    default_confidence: f64,
    logger: StructuredLogger,
}

impl CreditScoringService {
    /// Load the configured model; fails if the configuration is invalid or
    /// the model cannot be loaded
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        let model = load_classifier(&config.model_path, config.model_sha256.as_deref())?;
        let logger = StructuredLogger::new(config.model_path.display().to_string());
        Self::assemble(Some(model), config, logger)
    }

    /// Use an already constructed classifier
    pub fn with_classifier(
        model: Box<dyn Classifier>,
        config: &ServiceConfig,
    ) -> Result<Self, ServiceError> {
        let logger = StructuredLogger::new(model.model_type().to_string());
        Self::assemble(Some(model), config, logger)
    }

    /// Create a service without a model; every prediction fails
    pub fn new_without_model(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::assemble(None, config, StructuredLogger::new("none"))
    }

    fn assemble(
        model: Option<Box<dyn Classifier>>,
        config: &ServiceConfig,
        logger: StructuredLogger,
    ) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        if let Some(model) = &model {
            logger.log_model_loaded(
                model.model_type(),
                &model.metadata(),
                model.as_probability_estimator().is_some(),
                model.as_feature_importances().is_some(),
            );
        }
        Ok(Self {
            model,
            validator: FeatureValidator::new(),
            scorer: ScoreConverter::new(),
            default_confidence: config.default_confidence,
            logger,
        })
    }

    /// Replace the score converter
    pub fn with_score_converter(mut self, scorer: ScoreConverter) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn feature_names(&self) -> &'static [&'static str; FEATURE_COUNT] {
        &FEATURE_NAMES
    }

    /// Check a feature vector against the schema rules
    pub fn validate(&self, features: &[f64]) -> bool {
        self.validator.validate(features)
    }

    /// Predict using the thread-local random source for score noise
    pub fn predict(&self, features: &[f64]) -> PredictionResult {
        self.predict_with_rng(features, &mut rand::rng())
    }

    /// Predict drawing score noise from `rng`
    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        features: &[f64],
        rng: &mut R,
    ) -> PredictionResult {
        match self.try_predict(features, rng) {
            Ok(prediction) => PredictionResult::Success(prediction),
            Err(err) => {
                let message = err.to_string();
                self.logger.log_prediction_failed(&message);
                PredictionResult::failure(message)
            }
        }
    }

    /// Predict every item independently, preserving input order
    pub fn batch_predict(&self, batch: &[Vec<f64>]) -> Vec<PredictionResult> {
        self.batch_predict_with_rng(batch, &mut rand::rng())
    }

    pub fn batch_predict_with_rng<R: Rng + ?Sized>(
        &self,
        batch: &[Vec<f64>],
        rng: &mut R,
    ) -> Vec<PredictionResult> {
        let results: Vec<PredictionResult> = batch
            .iter()
            .map(|features| self.predict_with_rng(features, &mut *rng))
            .collect();
        let failed = results.iter().filter(|r| !r.is_success()).count();
        self.logger.log_batch(results.len(), failed);
        results
    }

    /// Describe the loaded model
    pub fn model_info(&self) -> ModelInfo {
        match &self.model {
            Some(model) => {
                ModelInfo::Loaded(ModelDescriptor::new(model.model_type(), model.metadata()))
            }
            None => ModelInfo::NotLoaded,
        }
    }

    fn try_predict<R: Rng + ?Sized>(
        &self,
        features: &[f64],
        rng: &mut R,
    ) -> Result<Prediction, ServiceError> {
        let start = Instant::now();
        self.validator.check(features)?;
        let model = self.model.as_deref().ok_or(ServiceError::ModelNotLoaded)?;

        let row = model.predict_row(features).map_err(ServiceError::Inference)?;
        let category_id = row.category;
        let category =
            CreditCategory::from_id(category_id).ok_or(ServiceError::UnknownCategory(category_id))?;

        let probabilities = row
            .probabilities
            .and_then(|estimated| self.probabilities(estimated));
        let confidence = probabilities
            .as_ref()
            .map(|p| p.values().fold(f64::NEG_INFINITY, f64::max))
            .unwrap_or(self.default_confidence);

        let feature_importance = self.feature_importance(model);
        let credit_score = self.scorer.score(category_id, confidence, rng);

        self.logger.log_prediction(
            category.label(),
            credit_score,
            confidence,
            start.elapsed().as_micros(),
        );

        Ok(Prediction {
            category,
            credit_score,
            confidence,
            probabilities,
            feature_importance,
            model_type: model.model_type().to_string(),
            features_used: Feature::label_values(features),
        })
    }

    /// Per-class probabilities keyed by label; `None` when unavailable
    fn probabilities(&self, estimated: anyhow::Result<Vec<f64>>) -> Option<LabeledValues> {
        let extracted = estimated.and_then(|proba| {
            if proba.len() != CreditCategory::ALL.len() {
                anyhow::bail!(
                    "Model returned {} probabilities for {} categories",
                    proba.len(),
                    CreditCategory::ALL.len()
                );
            }
            let sum: f64 = proba.iter().sum();
            if proba.iter().any(|p| !p.is_finite() || *p < 0.0)
                || (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE
            {
                anyhow::bail!("Model probabilities do not form a distribution: {:?}", proba);
            }
            Ok(CreditCategory::ALL
                .iter()
                .map(|c| c.label())
                .zip(proba.into_iter().map(|p| p / sum))
                .collect::<LabeledValues>())
        });
        match extracted {
            Ok(values) => Some(values),
            Err(err) => {
                self.logger.log_capability_unavailable("probabilities", &err);
                None
            }
        }
    }

    /// Importance per schema feature; `None` when unavailable
    fn feature_importance(&self, model: &dyn Classifier) -> Option<LabeledValues> {
        let source = model.as_feature_importances()?;
        let extracted = source.feature_importances().and_then(|weights| {
            if weights.len() != FEATURE_COUNT {
                anyhow::bail!(
                    "Model returned {} importances for {} features",
                    weights.len(),
                    FEATURE_COUNT
                );
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                anyhow::bail!("Model returned negative feature importance");
            }
            Ok(Feature::label_values(&weights))
        });
        match extracted {
            Ok(values) => Some(values),
            Err(err) => {
                self.logger.log_capability_unavailable("feature importance", &err);
                None
            }
        }
    }
}
