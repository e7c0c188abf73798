//! Sources of service specifications.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::model::ServiceModel;

/// Errors raised while loading a service specification.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("specification {path} describes '{found}', expected '{expected}'")]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("unknown service '{0}'")]
    UnknownService(String),
}

/// Provider of service specifications, queried by service name.
pub trait SpecificationProvider: Send + Sync {
    /// Every service this provider knows about, in a stable order.
    fn service_names(&self) -> Vec<String>;

    /// Load one service. May fail per service.
    fn load(&self, name: &str) -> Result<ServiceModel, CatalogError>;
}

/// Loads `<name>.json` specifications from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SpecificationProvider for DirectoryProvider {
    fn service_names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = ?self.dir, error = %e, "Cannot list specification directory");
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    fn load(&self, name: &str) -> Result<ServiceModel, CatalogError> {
        let path = self.dir.join(format!("{}.json", name));
        if !path.is_file() {
            return Err(CatalogError::UnknownService(name.to_string()));
        }

        let content = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let model: ServiceModel =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;

        if model.name != name {
            return Err(CatalogError::NameMismatch {
                path,
                expected: name.to_string(),
                found: model.name,
            });
        }
        Ok(model)
    }
}

/// In-memory provider for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    services: BTreeMap<String, ServiceModel>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, model: ServiceModel) -> Self {
        self.services.insert(model.name.clone(), model);
        self
    }
}

impl SpecificationProvider for StaticProvider {
    fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    fn load(&self, name: &str) -> Result<ServiceModel, CatalogError> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownService(name.to_string()))
    }
}
