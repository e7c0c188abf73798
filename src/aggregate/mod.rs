//! Offline aggregation of raw observation files.
//!
//! # Data Flow
//! ```text
//! root directory
//!     → discovery.rs  (every metric-report-raw-data-*.csv, recursively)
//!     → model::build_from_catalog (one skeleton, cloned into internal/external)
//!     → aggregator.rs (fold each non-xfail row into the tree for its origin)
//!     → report.rs     (two JSON documents, written via temp file + rename)
//! ```
//!
//! # Design Decisions
//! - Single pass, single threaded; file order only affects log order
//! - A row naming a service, operation or parameter missing from the
//!   skeleton aborts the run instead of being dropped
//! - Output files appear only once fully serialized

pub mod aggregator;
pub mod discovery;
pub mod report;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::SpecificationProvider;
use crate::model;

pub use aggregator::{AggregationSummary, Aggregator, Folded, UsageReports};
pub use discovery::discover_raw_reports;
pub use report::{report_timestamp, write_reports, ReportPaths};

/// Errors that abort an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{0} is not a directory")]
    InvalidRoot(PathBuf),

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: {source}")]
    Row {
        path: PathBuf,
        line: u64,
        #[source]
        source: Box<AggregateError>,
    },

    #[error("unknown service '{service}'")]
    UnknownService { service: String },

    #[error("unknown operation '{service}.{operation}'")]
    UnknownOperation { service: String, operation: String },

    #[error("unknown parameter '{parameter}' for '{service}.{operation}'")]
    UnknownParameter {
        service: String,
        operation: String,
        parameter: String,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to finalize {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate every raw report under `root` against the provider's catalog.
pub fn aggregate(
    root: &Path,
    provider: &dyn SpecificationProvider,
    raw_file_prefix: &str,
) -> Result<UsageReports, AggregateError> {
    if !root.is_dir() {
        return Err(AggregateError::InvalidRoot(root.to_path_buf()));
    }

    let skeleton = model::build_from_catalog(provider);
    let mut aggregator = Aggregator::new(skeleton);

    for path in discover_raw_reports(root, raw_file_prefix)? {
        tracing::info!(path = %path.display(), "checking");
        let folded = aggregator.fold_file(&path)?;
        tracing::debug!(path = %path.display(), rows = folded, "File folded");
    }

    Ok(aggregator.finish())
}
