//! Configuration management for the CLI

use anyhow::{Context, Result};
use credit_lib::ServiceConfig;
use std::path::{Path, PathBuf};

/// Resolve and load the service configuration
///
/// An explicit `--config` file must exist; the per-user default is optional.
/// A `--model` override wins over both the file and the environment.
pub fn load(explicit: Option<&Path>, model_override: Option<PathBuf>) -> Result<ServiceConfig> {
    if let Some(path) = explicit {
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }

    let path = explicit.map(Path::to_path_buf).or_else(default_config_path);
    let mut config = ServiceConfig::load(path.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;

    if let Some(model_path) = model_override {
        config.model_path = model_path;
    }

    Ok(config)
}

/// Get the per-user configuration file path
fn default_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(home.join(".config").join("credit-ml").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_path_under_home() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".config/credit-ml/config.toml"));
        }
    }

    #[test]
    fn test_missing_explicit_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_model_override_wins_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "model_path = \"from_file.json\"\ndefault_confidence = 0.7").unwrap();

        let config = load(Some(file.path()), Some(PathBuf::from("override.onnx"))).unwrap();
        assert_eq!(config.model_path, PathBuf::from("override.onnx"));
        assert_eq!(config.default_confidence, 0.7);
    }
}
