//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or configured level)
//!     → whatever metrics recorder the host installs (none by default)
//! ```
//!
//! # Design Decisions
//! - Request ID is a structured field on every recorder event
//! - Counters are no-ops until a host installs a recorder

pub mod logging;
pub mod metrics;
