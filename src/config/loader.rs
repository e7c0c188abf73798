//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::MetricsConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable toggling collection (`1`/`true` or `0`/`false`).
pub const ENV_COLLECT: &str = "USAGE_METRICS_COLLECT";

/// Environment variable overriding the raw report directory.
pub const ENV_REPORT_DIR: &str = "USAGE_METRICS_REPORT_DIR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<MetricsConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: MetricsConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides read through `lookup`.
pub fn apply_env_overrides(config: &mut MetricsConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup(ENV_COLLECT) {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.collection.enabled = true,
            "0" | "false" | "no" | "" => config.collection.enabled = false,
            other => tracing::warn!(value = %other, "Ignoring unrecognized {}", ENV_COLLECT),
        }
    }
    if let Some(dir) = lookup(ENV_REPORT_DIR).filter(|d| !d.is_empty()) {
        config.collection.report_dir = PathBuf::from(dir);
    }
}
