//! Service usage model.
//!
//! # Data Flow
//! ```text
//! SpecificationProvider
//!     → builder.rs (zero-valued skeleton: every operation, parameter, error)
//!     → stats.rs   (UsageModel → ServiceUsage → OperationStats)
//!     → aggregate  (folds observations in, serializes the result)
//! ```
//!
//! # Design Decisions
//! - The skeleton lists expected-but-unobserved parameters and errors with
//!   count 0, so the output doubles as a coverage map
//! - Ordered maps and sets everywhere: identical input gives identical bytes

pub mod builder;
pub mod stats;

pub use builder::{build, build_from_catalog};
pub use stats::{OperationStats, ServiceUsage, UsageModel, NO_PARAMETERS, SERVICE_ATTRIBUTES_KEY};
