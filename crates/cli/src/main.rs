//! Credit Score Predictor CLI
//!
//! A command-line tool for scoring feature vectors against a trained
//! credit classifier and inspecting the loaded model.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{model, predict};
use credit_lib::{CreditScoringService, ServiceConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Credit Score Predictor CLI
#[derive(Parser)]
#[command(name = "credit-ml")]
#[command(author, version, about = "CLI for the Credit Score Predictor", long_about = None)]
pub struct Cli {
    /// Model artifact to load, .onnx or .json forest (can also be set via CREDIT_MODEL_PATH)
    #[arg(long, global = true, env = "CREDIT_MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/credit-ml/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict a credit score from seven feature values
    Predict {
        /// Outstanding_Debt Credit_Mix Credit_History_Age Monthly_Balance
        /// Payment_Behaviour Annual_Income Num_of_Delayed_Payment
        #[arg(allow_negative_numbers = true)]
        features: Vec<String>,
    },

    /// Get model information
    Info,

    /// Run test predictions on sample profiles
    Test,

    /// Predict every feature vector in a JSON file
    Batch {
        /// JSON file holding an array of feature arrays
        file: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref(), cli.model) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Invalid configuration: {:#}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    init_tracing(&config);

    let service = match CreditScoringService::new(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to initialize ML service: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    match cli.command {
        Commands::Predict { features } => predict::run_predict(&service, &features)?,
        Commands::Info => model::show_info(&service)?,
        Commands::Test => model::run_test(&service)?,
        Commands::Batch { file } => predict::run_batch(&service, &file)?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr so stdout carries only command output
fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (json_layer, text_layer) = if config.log_json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
