//! Cached access to service specifications.

use dashmap::DashMap;
use std::sync::Arc;

use crate::catalog::model::ServiceModel;
use crate::catalog::provider::{CatalogError, SpecificationProvider};

/// Lazily loads and caches services from a provider.
///
/// Failed loads are not cached, so a later lookup retries.
#[derive(Clone)]
pub struct ServiceCatalog {
    provider: Arc<dyn SpecificationProvider>,
    loaded: Arc<DashMap<String, Arc<ServiceModel>>>,
}

impl ServiceCatalog {
    pub fn new(provider: Arc<dyn SpecificationProvider>) -> Self {
        Self {
            provider,
            loaded: Arc::new(DashMap::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SpecificationProvider> {
        &self.provider
    }

    /// Look up a service, loading it on first use.
    pub fn service(&self, name: &str) -> Result<Arc<ServiceModel>, CatalogError> {
        if let Some(model) = self.loaded.get(name) {
            return Ok(model.value().clone());
        }

        let model = Arc::new(self.provider.load(name)?);
        self.loaded.insert(name.to_string(), model.clone());
        Ok(model)
    }
}

impl std::fmt::Debug for ServiceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCatalog")
            .field("loaded", &self.loaded.len())
            .finish()
    }
}
