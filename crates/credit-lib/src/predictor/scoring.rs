//! Category to credit score conversion
//!
//! The score is synthesized from the predicted category and the model's
//! confidence. Lower confidence widens a random adjustment around the
//! category's base score; the result is always clamped to the canonical
//! 300-850 scale.

use crate::error::ServiceError;
use crate::schema::{CreditCategory, FALLBACK_BASE_SCORE};
use rand::Rng;

/// Lowest score on the output scale
pub const MIN_SCORE: i64 = 300;

/// Highest score on the output scale
pub const MAX_SCORE: i64 = 850;

/// Width of the adjustment band at zero confidence
pub const VARIANCE_SPAN: f64 = 50.0;

/// Configuration for score conversion
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub min_score: i64,
    pub max_score: i64,
    /// Adjustment band is `floor((1 - confidence) * variance_span)`
    pub variance_span: f64,
    /// Base score for class ids outside the category map
    pub fallback_base_score: i64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            min_score: MIN_SCORE,
            max_score: MAX_SCORE,
            variance_span: VARIANCE_SPAN,
            fallback_base_score: FALLBACK_BASE_SCORE,
        }
    }
}

impl ScoreConfig {
    /// Reject bounds that cannot produce a score
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_score < 0 || self.min_score > self.max_score {
            anyhow::bail!(
                "score range must satisfy 0 <= min_score <= max_score, got {}..={}",
                self.min_score,
                self.max_score
            );
        }
        if self.max_score > i64::from(u32::MAX) {
            anyhow::bail!("max_score {} does not fit a u32 score", self.max_score);
        }
        if !self.variance_span.is_finite() || self.variance_span < 0.0 {
            anyhow::bail!(
                "variance_span must be finite and non-negative, got {}",
                self.variance_span
            );
        }
        Ok(())
    }
}

/// Converts a predicted category and confidence into a bounded score
#[derive(Debug, Clone, Default)]
pub struct ScoreConverter {
    config: ScoreConfig,
}

impl ScoreConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter with custom bounds; fails if the bounds are unusable
    pub fn with_config(config: ScoreConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        Ok(Self { config })
    }

    /// Base score for a raw class id
    pub fn base_score(&self, category: i64) -> i64 {
        CreditCategory::from_id(category)
            .map(CreditCategory::base_score)
            .unwrap_or(self.config.fallback_base_score)
    }

    /// Half-width of the random adjustment for a confidence value
    pub fn variance(&self, confidence: f64) -> i64 {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        ((1.0 - confidence) * self.config.variance_span).floor().max(0.0) as i64
    }

    /// Synthesize a score, drawing the adjustment from `rng`
    pub fn score<R: Rng + ?Sized>(&self, category: i64, confidence: f64, rng: &mut R) -> u32 {
        let variance = self.variance(confidence);
        let adjustment = rng.random_range(-variance..=variance);
        let score = self
            .base_score(category)
            .saturating_add(adjustment)
            .clamp(self.config.min_score, self.config.max_score);
        // Bounds are validated to lie within 0..=u32::MAX
        score as u32
    }
}
