//! Per-request correlation subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline creates request
//!     → store.rs begin(id)          (PendingRecord inserted)
//!     → store.rs update(id, ..)     (each pipeline stage fills one field)
//!     → store.rs finalize(id)       (record removed and handed back)
//!     → recorder builds FlatObservation
//! ```
//!
//! # Design Decisions
//! - Keys are explicit `RequestId` values threaded through every callback
//! - Only `begin` and `finalize` add or remove keys
//! - Each record field transitions from unset to set once and is never reset
//! - The map is sharded (DashMap) so concurrent requests never block on each other

pub mod record;
pub mod store;

pub use record::{CaughtError, PendingRecord, RequestId, ResponseSnapshot, ServiceOperation};
pub use store::{CorrelationError, CorrelationStore};
