//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recorder::RecorderMode;

/// Raw report file name prefix shared by the recorder and the aggregator.
pub const DEFAULT_RAW_FILE_PREFIX: &str = "metric-report-raw-data-";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Recording side: toggle, mode, raw report location.
    pub collection: CollectionConfig,

    /// Aggregation side: output location.
    pub aggregation: AggregationConfig,

    /// Service specification source.
    pub catalog: CatalogConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Recorder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Initial state of the instrumentation toggle.
    pub enabled: bool,

    /// Which pipeline stages are captured.
    pub mode: RecorderMode,

    /// Directory receiving raw report files.
    pub report_dir: PathBuf,

    /// Raw report file name prefix.
    pub raw_file_prefix: String,

    /// Request header whose presence marks an internal call.
    pub internal_header: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RecorderMode::Metrics,
            report_dir: PathBuf::from("target/metric_reports"),
            raw_file_prefix: DEFAULT_RAW_FILE_PREFIX.to_string(),
            internal_header: "x-internal-request".to_string(),
        }
    }
}

/// Aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Output directory. `None` writes to `<input>/metrics`.
    pub output_dir: Option<PathBuf>,

    /// Raw report file name prefix to discover.
    pub raw_file_prefix: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            raw_file_prefix: DEFAULT_RAW_FILE_PREFIX.to_string(),
        }
    }
}

/// Service specification source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `<service>.json` specifications.
    pub spec_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            spec_dir: PathBuf::from("specs"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
