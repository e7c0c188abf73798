//! Append-only raw report file.

use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::observation::{FlatObservation, RAW_DATA_HEADER};
use crate::sink::SinkError;

/// CSV writer for one run's raw observations.
///
/// Each batch is encoded in memory first and then written with a single
/// `write_all`, so a failed append leaves nothing queued in the encoder and
/// can be retried with the same rows.
pub struct RawReportWriter {
    path: PathBuf,
    sink: Box<dyn Write + Send>,
}

impl RawReportWriter {
    /// Create (or truncate) `path` and write the fixed header.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_writer(path, file)
    }

    /// Write the fixed header to `sink`; `path` names it in errors and logs.
    pub fn from_writer(
        path: impl Into<PathBuf>,
        sink: impl Write + Send + 'static,
    ) -> Result<Self, SinkError> {
        let mut writer = Self {
            path: path.into(),
            sink: Box::new(sink),
        };
        let mut encoder = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        encoder.write_record(RAW_DATA_HEADER)?;
        let header = writer.finish_encoding(encoder)?;
        writer.write_bytes(&header)?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows and flush them to disk.
    pub fn append(&mut self, rows: &[FlatObservation]) -> Result<(), SinkError> {
        let mut encoder = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        for row in rows {
            encoder.serialize(row)?;
        }
        let bytes = self.finish_encoding(encoder)?;
        self.write_bytes(&bytes)
    }

    fn finish_encoding(&self, encoder: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, SinkError> {
        encoder.into_inner().map_err(|e| SinkError::Io {
            path: self.path.clone(),
            source: e.into_error(),
        })
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.sink
            .write_all(bytes)
            .and_then(|_| self.sink.flush())
            .map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for RawReportWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawReportWriter").field("path", &self.path).finish()
    }
}
