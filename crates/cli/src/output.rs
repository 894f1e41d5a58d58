//! Output formatting utilities

use colored::Colorize;
use credit_lib::CreditCategory;
use serde::Serialize;

/// Print a value as indented JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a credit category label
pub fn color_label(category: CreditCategory) -> String {
    match category {
        CreditCategory::Good => category.label().green().bold().to_string(),
        CreditCategory::Standard => category.label().yellow().bold().to_string(),
        CreditCategory::Poor => category.label().red().bold().to_string(),
    }
}
