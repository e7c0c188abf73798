//! Raw report discovery.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::aggregate::AggregateError;

/// Every `<prefix>*.csv` file under `root`, recursively, sorted by path.
pub fn discover_raw_reports(root: &Path, prefix: &str) -> Result<Vec<PathBuf>, AggregateError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| AggregateError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(".csv") {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_recursive_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run-2").join("target");
        fs::create_dir_all(&nested).unwrap();

        fs::write(dir.path().join("metric-report-raw-data-1.csv"), "").unwrap();
        fs::write(nested.join("metric-report-raw-data-2.csv"), "").unwrap();
        fs::write(dir.path().join("metric-report-1.json"), "").unwrap();
        fs::write(dir.path().join("other.csv"), "").unwrap();

        let found = discover_raw_reports(dir.path(), "metric-report-raw-data-").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["metric-report-raw-data-1.csv", "metric-report-raw-data-2.csv"]);
    }
}
