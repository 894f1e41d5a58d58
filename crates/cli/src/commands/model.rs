//! Model introspection and smoke-test commands

use anyhow::Result;
use colored::Colorize;
use credit_lib::{CreditScoringService, Feature};

use crate::output::{
    color_confidence, color_label, print_error, print_info, print_json, print_success,
    print_warning,
};

/// Sample profiles expected to land in Good, Poor and Standard
const SAMPLE_PROFILES: [[f64; 7]; 3] = [
    [5000.0, 1.0, 36.0, 2500.0, 85.0, 60000.0, 2.0],
    [15000.0, 0.0, 12.0, 8000.0, 45.0, 35000.0, 8.0],
    [8000.0, 2.0, 24.0, 4000.0, 70.0, 50000.0, 3.0],
];

/// Show the loaded model descriptor
pub fn show_info(service: &CreditScoringService) -> Result<()> {
    print_json(&service.model_info())
}

/// Run the sample profiles and print readable summaries
pub fn run_test(service: &CreditScoringService) -> Result<()> {
    print_info("Running test prediction...");

    let mut succeeded = 0;
    for (i, features) in SAMPLE_PROFILES.iter().enumerate() {
        println!();
        println!("{}", format!("Test case {}:", i + 1).bold());
        println!(
            "Features: {}",
            serde_json::to_string(&Feature::label_values(features))?
        );

        let result = service.predict(features);
        match (result.prediction(), result.error()) {
            (Some(prediction), _) => {
                succeeded += 1;
                println!(
                    "Prediction: {} (Category {})",
                    color_label(prediction.category),
                    prediction.category.id()
                );
                println!("Credit Score Estimate: {}", prediction.credit_score);
                println!("Confidence: {}", color_confidence(prediction.confidence));
            }
            (None, error) => {
                print_error(&format!("Error: {}", error.unwrap_or("unknown error")));
            }
        }
    }

    println!();
    let summary = format!(
        "{}/{} test predictions succeeded",
        succeeded,
        SAMPLE_PROFILES.len()
    );
    if succeeded == SAMPLE_PROFILES.len() {
        print_success(&summary);
    } else {
        print_warning(&summary);
    }

    Ok(())
}
