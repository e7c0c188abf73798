//! tower/axum pipeline integration.
//!
//! # Data Flow
//! ```text
//! incoming request
//!     → SetRequestIdLayer (x-request-id, UUID v4)
//!     → UsageLayer        (fresh RequestId, on_create, RecorderHandle into extensions)
//!     → inner service     (stages report on_parsed / on_dispatched / on_exception)
//!     → UsageLayer        (buffer body, on_response or 500 on body failure, on_finalize)
//!     → PropagateRequestIdLayer (echo x-request-id on the response)
//! ```
//!
//! # Design Decisions
//! - x-request-id is client controlled and only logged; correlation keys are
//!   minted per call so reused header values cannot merge records
//! - Instrumentation failures are logged, never turned into client errors

pub mod layer;
pub mod request;

pub use layer::{RecorderHandle, UsageLayer, UsageService, BODY_ERROR_TYPE};
pub use request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt, X_REQUEST_ID};
