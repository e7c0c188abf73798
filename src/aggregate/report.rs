//! Aggregated report output.

use chrono::Utc;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::aggregate::aggregator::UsageReports;
use crate::aggregate::AggregateError;

/// Where a run's two reports were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub external: PathBuf,
    pub internal: PathBuf,
}

/// UTC timestamp used in report file names.
pub fn report_timestamp() -> String {
    Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Write `metric-report-<stamp>.json` (external calls) and
/// `metric-report-internal-calls-<stamp>.json` into `output_dir`.
pub fn write_reports(
    output_dir: &Path,
    reports: &UsageReports,
    stamp: &str,
) -> Result<ReportPaths, AggregateError> {
    std::fs::create_dir_all(output_dir).map_err(|source| AggregateError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let paths = ReportPaths {
        external: output_dir.join(format!("metric-report-{}.json", stamp)),
        internal: output_dir.join(format!("metric-report-internal-calls-{}.json", stamp)),
    };
    write_json_atomically(&paths.external, &reports.external)?;
    write_json_atomically(&paths.internal, &reports.internal)?;

    tracing::info!(
        external = %paths.external.display(),
        internal = %paths.internal.display(),
        "Reports written"
    );
    Ok(paths)
}

/// Serialize into a temp file next to `path`, then rename it into place.
fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<(), AggregateError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source| AggregateError::Io {
        path: path.to_path_buf(),
        source,
    };

    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| AggregateError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregator::AggregationSummary;
    use crate::model::UsageModel;

    #[test]
    fn test_reports_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("metrics");
        let reports = UsageReports {
            internal: UsageModel::default(),
            external: UsageModel::default(),
            summary: AggregationSummary::default(),
        };

        let paths = write_reports(&out, &reports, "2024-01-01-00-00-00").unwrap();
        assert!(paths.external.ends_with("metric-report-2024-01-01-00-00-00.json"));
        assert!(paths.internal.ends_with("metric-report-internal-calls-2024-01-01-00-00-00.json"));
        assert_eq!(std::fs::read_to_string(&paths.external).unwrap(), "{}");

        // Only the two finished files remain, no temp leftovers
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }
}
