//! Raw observation sink.
//!
//! # Data Flow
//! ```text
//! recorder (on finalize)
//!     → buffer.rs   ObservationBuffer::append (any request task)
//!
//! host checkpoint (end of a test)
//!     → session.rs  ReportSession::end_test
//!     → buffer.rs   drain (exactly the rows present at that moment)
//!     → writer.rs   append rows to metric-report-raw-data-<ts>.csv
//! ```
//!
//! # Design Decisions
//! - The buffer is an owned, injected component; nothing here is global
//! - Drain swaps the row vector out under the lock, so concurrent appends are
//!   never lost or torn and land in the next checkpoint
//! - The raw file is created with its header at session start and only ever
//!   appended to, so a crashed run loses at most the rows not yet flushed

pub mod buffer;
pub mod context;
pub mod session;
pub mod writer;

use std::path::PathBuf;
use thiserror::Error;

pub use buffer::ObservationBuffer;
pub use context::{CurrentTest, TestContext};
pub use session::ReportSession;
pub use writer::RawReportWriter;

/// Errors raised while writing raw report files.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
