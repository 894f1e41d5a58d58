//! Core data models returned by the prediction service

use crate::predictor::ModelMetadata;
use crate::schema::{CreditCategory, LabeledValues, FEATURE_NAMES};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// A successful prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: CreditCategory,
    pub credit_score: u32,
    pub confidence: f64,
    /// Per-class probabilities keyed by label, when the model estimates them
    pub probabilities: Option<LabeledValues>,
    /// Per-feature importance keyed by feature name, when the model has them
    pub feature_importance: Option<LabeledValues>,
    pub model_type: String,
    /// Input echo keyed by feature name
    pub features_used: LabeledValues,
}

/// Outcome of a single prediction call
///
/// Serializes to the flat JSON object callers consume: a failure carries
/// the error message and explicit nulls for every prediction field.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Success(Prediction),
    Failure { error: String },
}

impl PredictionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        PredictionResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            PredictionResult::Success(prediction) => Some(prediction),
            PredictionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionResult::Success(_) => None,
            PredictionResult::Failure { error } => Some(error),
        }
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PredictionResult::Success(p) => {
                let mut map = serializer.serialize_map(Some(9))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("prediction_category", &p.category.id())?;
                map.serialize_entry("prediction_label", p.category.label())?;
                map.serialize_entry("credit_score_estimate", &p.credit_score)?;
                map.serialize_entry("confidence", &p.confidence)?;
                map.serialize_entry("probabilities", &p.probabilities)?;
                map.serialize_entry("feature_importance", &p.feature_importance)?;
                map.serialize_entry("model_type", &p.model_type)?;
                map.serialize_entry("features_used", &p.features_used)?;
                map.end()
            }
            PredictionResult::Failure { error } => {
                let mut map = serializer.serialize_map(Some(6))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("prediction_category", &None::<i64>)?;
                map.serialize_entry("prediction_label", &None::<&str>)?;
                map.serialize_entry("credit_score_estimate", &None::<u32>)?;
                map.serialize_entry("confidence", &None::<f64>)?;
                map.end()
            }
        }
    }
}

/// Description of the loaded model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInfo {
    Loaded(ModelDescriptor),
    NotLoaded,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ModelDescriptor {
    pub model_type: String,
    pub feature_names: Vec<&'static str>,
    /// Class id → label; ids serialize as string keys
    pub credit_categories: BTreeMap<i64, &'static str>,
    pub model_loaded: bool,
    #[serde(flatten)]
    pub metadata: ModelMetadata,
}

impl ModelDescriptor {
    pub fn new(model_type: impl Into<String>, metadata: ModelMetadata) -> Self {
        Self {
            model_type: model_type.into(),
            feature_names: FEATURE_NAMES.to_vec(),
            credit_categories: CreditCategory::ALL
                .iter()
                .map(|c| (c.id(), c.label()))
                .collect(),
            model_loaded: true,
            metadata,
        }
    }
}

impl Serialize for ModelInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModelInfo::Loaded(descriptor) => descriptor.serialize(serializer),
            ModelInfo::NotLoaded => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", "Model not loaded")?;
                map.end()
            }
        }
    }
}
