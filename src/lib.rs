//! API usage metrics: per-request observation recording and offline
//! aggregation into service usage reports.
//!
//! # Architecture Overview
//!
//! ```text
//!   request pipeline (host)                       test runs (many)
//!   ───────────────────────                       ────────────────
//!   create → parse → dispatch → respond                  │
//!      │        │        │         │                     │
//!      ▼        ▼        ▼         ▼                     │
//!   ┌───────────────────────────────────┐                │
//!   │ recorder (ObservationRecorder)    │                │
//!   │   └── correlation (store by id)   │                │
//!   └───────────────┬───────────────────┘                │
//!                   │ finalize                           │
//!                   ▼                                    │
//!   ┌───────────────────────────────────┐                │
//!   │ sink (buffer → raw CSV per run)   │────────────────┘
//!   └───────────────────────────────────┘
//!                   │  metric-report-raw-data-*.csv
//!                   ▼
//!   ┌───────────────────────────────────┐   ┌──────────────────────┐
//!   │ aggregate (fold rows)             │◀──│ model (skeleton from │
//!   │   internal tree / external tree   │   │ catalog specs)       │
//!   └───────────────┬───────────────────┘   └──────────────────────┘
//!                   ▼
//!        metric-report-*.json, metric-report-internal-calls-*.json
//! ```

// Recording
pub mod correlation;
pub mod http;
pub mod observation;
pub mod recorder;
pub mod sink;

// Specifications and decoding
pub mod catalog;
pub mod decode;

// Aggregation
pub mod aggregate;
pub mod model;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use aggregate::{aggregate, UsageReports};
pub use config::MetricsConfig;
pub use correlation::{CorrelationStore, RequestId};
pub use observation::{FlatObservation, Origin};
pub use recorder::ObservationRecorder;
pub use sink::ReportSession;
