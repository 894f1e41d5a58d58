//! Credit score prediction library
//!
//! This crate provides the core functionality for:
//! - Loading pre-trained credit classifiers (ONNX or JSON forest)
//! - Validating feature vectors against the fixed schema
//! - Predicting a credit category with confidence and optional explanations
//! - Synthesizing a bounded credit score from the prediction

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod service;

pub use crate::config::ServiceConfig;
pub use error::{FeatureViolation, ServiceError};
pub use models::{ModelDescriptor, ModelInfo, Prediction, PredictionResult};
pub use observability::StructuredLogger;
pub use schema::{CreditCategory, Feature, LabeledValues, FEATURE_COUNT, FEATURE_NAMES};
pub use service::CreditScoringService;
