//! Observation recorder subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline stage callbacks (in order, per request):
//!     on_create     → store.begin
//!     on_parsed     → operation + parameter snapshot
//!     on_dispatched → dispatch-time snapshot (tracing mode only)
//!     on_exception  → first caught error
//!     on_response   → raw response, best-effort decode
//!     on_finalize   → store.finalize → FlatObservation → ObservationBuffer
//! ```
//!
//! # Design Decisions
//! - The instrumentation toggle is read on every callback, never cached
//! - Parameters are reported from the parse-time snapshot; dispatch may rewrite them
//! - Decode failures are logged and swallowed; they never affect the row

pub mod collector;
pub mod snapshot;
pub mod toggle;

use serde::{Deserialize, Serialize};

pub use collector::ObservationRecorder;
pub use snapshot::ParameterSnapshot;
pub use toggle::InstrumentationToggle;

/// Which pipeline stages the recorder captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderMode {
    /// Parse-time parameters, exceptions and responses.
    #[default]
    Metrics,
    /// Everything in `Metrics`, plus dispatch-time parameters and a logged
    /// trace of each finalized request.
    Tracing,
}
