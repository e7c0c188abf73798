//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MetricsConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderName;
use std::fmt;

use crate::config::schema::MetricsConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &MetricsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, prefix) in [
        ("collection.raw_file_prefix", &config.collection.raw_file_prefix),
        ("aggregation.raw_file_prefix", &config.aggregation.raw_file_prefix),
    ] {
        if prefix.is_empty() {
            errors.push(ValidationError {
                field,
                message: "must not be empty".to_string(),
            });
        } else if prefix.contains(['/', '\\']) {
            errors.push(ValidationError {
                field,
                message: format!("'{}' must be a file name prefix, not a path", prefix),
            });
        }
    }

    if HeaderName::from_bytes(config.collection.internal_header.as_bytes()).is_err() {
        errors.push(ValidationError {
            field: "collection.internal_header",
            message: format!("'{}' is not a valid header name", config.collection.internal_header),
        });
    }

    if config.collection.report_dir.as_os_str().is_empty() {
        errors.push(ValidationError {
            field: "collection.report_dir",
            message: "must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!(
                "'{}' is not one of {}",
                config.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
