//! Prediction commands

use anyhow::{Context, Result};
use credit_lib::{CreditScoringService, FEATURE_COUNT};
use std::path::Path;
use tracing::debug;

use crate::output::{print_error, print_json};

/// Predict a single feature vector given as command-line values
///
/// Values beyond the seventh are ignored.
pub fn run_predict(service: &CreditScoringService, args: &[String]) -> Result<()> {
    if args.len() < FEATURE_COUNT {
        print_error(&format!("Error: Need {} feature values", FEATURE_COUNT));
        eprintln!("Features: {}", service.feature_names().join(", "));
        return Ok(());
    }

    let features = match parse_features(&args[..FEATURE_COUNT]) {
        Ok(features) => features,
        Err(e) => {
            print_error(&format!("Error parsing features: {:#}", e));
            return Ok(());
        }
    };

    let result = service.predict(&features);
    print_json(&result)
}

/// Predict every feature vector in a JSON file, preserving order
pub fn run_batch(service: &CreditScoringService, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let batch: Vec<Vec<f64>> = serde_json::from_str(&content)
        .context("Batch file must be a JSON array of feature arrays")?;

    debug!(rows = batch.len(), "Running batch prediction");
    let results = service.batch_predict(&batch);
    print_json(&results)
}

fn parse_features(values: &[String]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("could not convert {:?} to a number", v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_features() {
        let parsed = parse_features(&args(&["5000", "1", "36", "-2500.5", "85", "6e4", "2"])).unwrap();
        assert_eq!(parsed, vec![5000.0, 1.0, 36.0, -2500.5, 85.0, 60000.0, 2.0]);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = parse_features(&args(&["5000", "one"])).unwrap_err();
        assert!(err.to_string().contains("\"one\""));
    }
}
