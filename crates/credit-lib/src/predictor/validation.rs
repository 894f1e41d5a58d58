//! Input validation for feature vectors

use crate::error::FeatureViolation;
use crate::schema::{Feature, FEATURE_COUNT};
use tracing::warn;

/// Accepted encodings of the categorical Credit_Mix feature
pub const CREDIT_MIX_LEVELS: [f64; 3] = [0.0, 1.0, 2.0];

/// Range checks applied before every prediction
///
/// Monthly_Balance and Payment_Behaviour have no documented range and are
/// accepted as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureValidator;

impl FeatureValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns true when every rule passes
    pub fn validate(&self, features: &[f64]) -> bool {
        match self.check(features) {
            Ok(()) => true,
            Err(violation) => {
                warn!(reason = %violation, "Rejected feature vector");
                false
            }
        }
    }

    /// Check the rules in order and report the first violation
    pub fn check(&self, features: &[f64]) -> Result<(), FeatureViolation> {
        if features.len() != FEATURE_COUNT {
            return Err(FeatureViolation::Arity {
                expected: FEATURE_COUNT,
                actual: features.len(),
            });
        }

        let value = |feature: Feature| features[feature.index()];

        if value(Feature::OutstandingDebt) < 0.0 {
            return Err(FeatureViolation::NegativeOutstandingDebt);
        }
        if !CREDIT_MIX_LEVELS.contains(&value(Feature::CreditMix)) {
            return Err(FeatureViolation::InvalidCreditMix);
        }
        if value(Feature::CreditHistoryAge) < 0.0 {
            return Err(FeatureViolation::NegativeCreditHistoryAge);
        }
        if value(Feature::AnnualIncome) < 0.0 {
            return Err(FeatureViolation::NegativeAnnualIncome);
        }
        if value(Feature::NumOfDelayedPayment) < 0.0 {
            return Err(FeatureViolation::NegativeDelayedPayments);
        }

        Ok(())
    }
}
