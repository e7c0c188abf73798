//! Nested usage statistics.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::ServiceAttributes;

/// Parameter key counted when a call supplied no parameters at all.
pub const NO_PARAMETERS: &str = "_none_";

/// Reserved key holding a service's attributes next to its operations.
pub const SERVICE_ATTRIBUTES_KEY: &str = "service_attributes";

/// Counters for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct OperationStats {
    pub invoked: u64,
    pub parameters: BTreeMap<String, u64>,
    pub errors: BTreeMap<String, u64>,
    /// Observed error names the specification does not declare.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors_not_in_shape: Option<BTreeMap<String, u64>>,
    pub tests: BTreeSet<String>,
    /// Declared error names in catalog order, scanned by the body heuristic.
    #[serde(skip)]
    declared_errors: Vec<String>,
}

impl OperationStats {
    /// Count an explicit exception, in `errors` when declared, otherwise in
    /// `errors_not_in_shape`.
    pub fn record_exception(&mut self, name: &str) {
        if let Some(count) = self.errors.get_mut(name) {
            *count += 1;
            return;
        }
        *self
            .errors_not_in_shape
            .get_or_insert_with(BTreeMap::new)
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    /// Seed a declared error with a zero count.
    pub fn declare_error(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.errors.contains_key(&name) {
            return;
        }
        self.errors.insert(name.clone(), 0);
        self.declared_errors.push(name);
    }

    /// First declared error, in declaration order, whose name occurs in `body`.
    pub fn match_declared_error(&self, body: &str) -> Option<&str> {
        self.declared_errors
            .iter()
            .find(|name| body.contains(name.as_str()))
            .map(String::as_str)
    }

    pub fn record_test(&mut self, node_id: &str) {
        if !self.tests.contains(node_id) {
            self.tests.insert(node_id.to_string());
        }
    }
}

/// Attributes and operations of one service.
///
/// Serialized as a single map: the attributes under
/// [`SERVICE_ATTRIBUTES_KEY`], then one entry per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUsage {
    pub attributes: ServiceAttributes,
    pub operations: BTreeMap<String, OperationStats>,
}

impl Serialize for ServiceUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.operations.len() + 1))?;
        map.serialize_entry(SERVICE_ATTRIBUTES_KEY, &self.attributes)?;
        for (name, stats) in &self.operations {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// Service name to usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct UsageModel {
    pub services: BTreeMap<String, ServiceUsage>,
}

impl UsageModel {
    pub fn operation(&self, service: &str, operation: &str) -> Option<&OperationStats> {
        self.services.get(service)?.operations.get(operation)
    }

    pub fn operation_mut(&mut self, service: &str, operation: &str) -> Option<&mut OperationStats> {
        self.services.get_mut(service)?.operations.get_mut(operation)
    }

    pub fn contains_service(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }
}
