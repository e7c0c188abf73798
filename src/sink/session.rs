//! One run's raw report lifecycle.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::CollectionConfig;
use crate::sink::buffer::ObservationBuffer;
use crate::sink::context::CurrentTest;
use crate::sink::writer::RawReportWriter;
use crate::sink::SinkError;

/// Owns the raw report file of a run plus the buffer and test context the
/// recorder writes into.
#[derive(Debug)]
pub struct ReportSession {
    buffer: Arc<ObservationBuffer>,
    current_test: Arc<CurrentTest>,
    writer: Mutex<RawReportWriter>,
}

impl ReportSession {
    /// Create `report_dir` if needed and start `<prefix><timestamp>.csv`.
    pub fn start(report_dir: &Path, prefix: &str) -> Result<Self, SinkError> {
        std::fs::create_dir_all(report_dir).map_err(|source| SinkError::Io {
            path: report_dir.to_path_buf(),
            source,
        })?;

        let stamp = Utc::now().format("%Y-%m-%d-%H-%M-%S-%3f");
        let path = report_dir.join(format!("{}{}.csv", prefix, stamp));
        let writer = RawReportWriter::create(&path)?;

        tracing::info!(path = ?path, "Raw report started");
        Ok(Self::with_writer(writer))
    }

    /// Session over an already started report writer.
    pub fn with_writer(writer: RawReportWriter) -> Self {
        Self {
            buffer: Arc::new(ObservationBuffer::new()),
            current_test: Arc::new(CurrentTest::new()),
            writer: Mutex::new(writer),
        }
    }

    /// Start a session in the configured report directory.
    pub fn from_config(config: &CollectionConfig) -> Result<Self, SinkError> {
        Self::start(&config.report_dir, &config.raw_file_prefix)
    }

    pub fn buffer(&self) -> Arc<ObservationBuffer> {
        self.buffer.clone()
    }

    pub fn current_test(&self) -> Arc<CurrentTest> {
        self.current_test.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.writer
            .lock()
            .expect("report writer mutex poisoned")
            .path()
            .to_path_buf()
    }

    /// Mark the start of a test call.
    pub fn begin_test(&self, node_id: impl Into<String>, xfail: bool) {
        self.current_test.set(node_id, xfail);
    }

    /// Flush buffered rows and clear the test context.
    pub fn end_test(&self) -> Result<usize, SinkError> {
        let written = self.checkpoint()?;
        self.current_test.clear();
        Ok(written)
    }

    /// Drain the buffer and append the drained rows to the report.
    ///
    /// On a write failure the drained rows go back to the front of the
    /// buffer and the next checkpoint retries them.
    pub fn checkpoint(&self) -> Result<usize, SinkError> {
        let mut writer = self.writer.lock().expect("report writer mutex poisoned");
        let rows = self.buffer.drain();
        if rows.is_empty() {
            return Ok(0);
        }

        if let Err(e) = writer.append(&rows) {
            tracing::warn!(rows = rows.len(), path = ?writer.path(), error = %e, "Raw report write failed, rows kept");
            self.buffer.requeue(rows);
            return Err(e);
        }
        tracing::debug!(rows = rows.len(), path = ?writer.path(), "Raw report flushed");
        Ok(rows.len())
    }
}
