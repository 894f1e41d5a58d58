//! Feature schema, credit categories and labeled value maps
//!
//! The schema is positional: a feature vector is a plain `[f64]` whose
//! slots follow [`Feature::ALL`]. Names only appear when results are
//! rendered for callers.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Number of input features expected by every model
pub const FEATURE_COUNT: usize = 7;

/// Feature names in schema order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Outstanding_Debt",
    "Credit_Mix",
    "Credit_History_Age",
    "Monthly_Balance",
    "Payment_Behaviour",
    "Annual_Income",
    "Num_of_Delayed_Payment",
];

/// One slot of the feature schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    OutstandingDebt,
    CreditMix,
    CreditHistoryAge,
    MonthlyBalance,
    PaymentBehaviour,
    AnnualIncome,
    NumOfDelayedPayment,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::OutstandingDebt,
        Feature::CreditMix,
        Feature::CreditHistoryAge,
        Feature::MonthlyBalance,
        Feature::PaymentBehaviour,
        Feature::AnnualIncome,
        Feature::NumOfDelayedPayment,
    ];

    /// Position of this feature in an input vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Pair each schema name with the value at the same position
    ///
    /// Values beyond the schema length are dropped.
    pub fn label_values(values: &[f64]) -> LabeledValues {
        FEATURE_NAMES
            .iter()
            .zip(values.iter())
            .map(|(name, value)| (*name, *value))
            .collect()
    }
}

/// Base score used when a class id has no entry in the score table
pub const FALLBACK_BASE_SCORE: i64 = 650;

/// Closed set of credit-worthiness classes produced by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditCategory {
    Good,
    Poor,
    Standard,
}

impl CreditCategory {
    /// All categories in class id order
    pub const ALL: [CreditCategory; 3] = [
        CreditCategory::Good,
        CreditCategory::Poor,
        CreditCategory::Standard,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(CreditCategory::Good),
            1 => Some(CreditCategory::Poor),
            2 => Some(CreditCategory::Standard),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            CreditCategory::Good => 0,
            CreditCategory::Poor => 1,
            CreditCategory::Standard => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CreditCategory::Good => "Good",
            CreditCategory::Poor => "Poor",
            CreditCategory::Standard => "Standard",
        }
    }

    /// Nominal credit score anchor for this category
    pub fn base_score(self) -> i64 {
        match self {
            CreditCategory::Good => 750,
            CreditCategory::Poor => 580,
            CreditCategory::Standard => 650,
        }
    }
}

impl fmt::Display for CreditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered name → value mapping
///
/// Serializes as a JSON object whose keys keep insertion order, so feature
/// maps follow the schema and probability maps follow the category ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledValues(Vec<(&'static str, f64)>);

impl LabeledValues {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.0.iter().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|(_, v)| *v)
    }
}

impl FromIterator<(&'static str, f64)> for LabeledValues {
    fn from_iter<I: IntoIterator<Item = (&'static str, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for LabeledValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_indices_follow_schema() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(feature.name(), FEATURE_NAMES[i]);
        }
        assert_eq!(Feature::CreditMix.name(), "Credit_Mix");
        assert_eq!(Feature::NumOfDelayedPayment.index(), 6);
    }

    #[test]
    fn test_category_round_trip_ids() {
        for category in CreditCategory::ALL {
            assert_eq!(CreditCategory::from_id(category.id()), Some(category));
        }
        assert_eq!(CreditCategory::from_id(0).map(|c| c.label()), Some("Good"));
        assert_eq!(CreditCategory::from_id(1).map(|c| c.label()), Some("Poor"));
        assert_eq!(CreditCategory::from_id(2).map(|c| c.label()), Some("Standard"));
        assert_eq!(CreditCategory::from_id(3), None);
        assert_eq!(CreditCategory::from_id(-1), None);
    }

    #[test]
    fn test_base_scores() {
        assert_eq!(CreditCategory::Good.base_score(), 750);
        assert_eq!(CreditCategory::Poor.base_score(), 580);
        assert_eq!(CreditCategory::Standard.base_score(), 650);
    }

    #[test]
    fn test_labeled_values_keep_order_in_json() {
        let values = Feature::label_values(&[5000.0, 1.0, 36.0, 2500.0, 85.0, 60000.0, 2.0]);
        assert_eq!(values.len(), FEATURE_COUNT);
        assert_eq!(values.get("Annual_Income"), Some(60000.0));

        let json = serde_json::to_string(&values).unwrap();
        let debt = json.find("Outstanding_Debt").unwrap();
        let delayed = json.find("Num_of_Delayed_Payment").unwrap();
        assert!(debt < delayed, "schema order lost: {}", json);
    }

    #[test]
    fn test_label_values_truncates_to_schema() {
        let values = Feature::label_values(&[1.0; 9]);
        assert_eq!(values.len(), FEATURE_COUNT);
        assert!(Feature::label_values(&[]).is_empty());
    }
}
