//! Service specification catalog.
//!
//! # Data Flow
//! ```text
//! spec_dir/*.json
//!     → provider.rs (DirectoryProvider: list + load per service)
//!     → model.rs (ServiceModel: operations, parameters, declared errors)
//!     → model::builder (zero-valued usage skeleton)
//!     → cache.rs (cached lookups for response decoding)
//! ```
//!
//! # Design Decisions
//! - Loading is per service; one broken specification never aborts the rest
//! - Operation maps are ordered so every derived structure is deterministic

pub mod cache;
pub mod model;
pub mod provider;

pub use cache::ServiceCatalog;
pub use model::{OperationModel, ServiceAttributes, ServiceModel};
pub use provider::{CatalogError, DirectoryProvider, SpecificationProvider, StaticProvider};
