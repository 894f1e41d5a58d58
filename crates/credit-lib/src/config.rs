//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix (`CREDIT_MODEL_PATH`, `CREDIT_LOG_LEVEL`, ...)
pub const ENV_PREFIX: &str = "CREDIT";

/// Default location of the serialized classifier
pub const DEFAULT_MODEL_PATH: &str = "models/credit_classifier.json";

/// Confidence reported when the model cannot estimate probabilities
pub const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Path to the model artifact (`.onnx` or `.json` forest)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Expected SHA-256 hex digest of the model artifact
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Confidence used when the model has no probability estimates
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of text
    #[serde(default)]
    pub log_json: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            model_sha256: None,
            default_confidence: default_confidence(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl ServiceConfig {
    /// Configuration pointing at a specific model, everything else default
    pub fn with_model_path(path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables win over file values. A missing file is not an
    /// error.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let config: ServiceConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the predictor cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_confidence) {
            anyhow::bail!(
                "default_confidence must be within [0, 1], got {}",
                self.default_confidence
            );
        }
        if let Some(digest) = &self.model_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                anyhow::bail!("model_sha256 must be a 64 character hex digest");
            }
        }
        Ok(())
    }
}
