//! Zero-valued skeleton construction.

use crate::catalog::{ServiceModel, SpecificationProvider};
use crate::model::stats::{OperationStats, ServiceUsage, UsageModel, SERVICE_ATTRIBUTES_KEY};

/// Build the skeleton for every service the provider lists.
pub fn build_from_catalog(provider: &dyn SpecificationProvider) -> UsageModel {
    build(provider, &provider.service_names())
}

/// Build the skeleton for `service_names`.
///
/// Services that fail to load are skipped with a debug log.
pub fn build(provider: &dyn SpecificationProvider, service_names: &[String]) -> UsageModel {
    let mut model = UsageModel::default();

    for name in service_names {
        match provider.load(name) {
            Ok(service) => {
                model.services.insert(name.clone(), service_usage(&service));
            }
            Err(e) => {
                tracing::debug!(service = %name, error = %e, "cannot load service");
            }
        }
    }

    tracing::debug!(services = model.services.len(), "Usage skeleton built");
    model
}

fn service_usage(service: &ServiceModel) -> ServiceUsage {
    let mut usage = ServiceUsage {
        attributes: service.attributes,
        ..Default::default()
    };

    for (name, operation) in &service.operations {
        if name == SERVICE_ATTRIBUTES_KEY {
            tracing::warn!(service = %service.name, "Operation name collides with reserved key, skipping");
            continue;
        }

        let mut stats = OperationStats::default();
        for param in operation.input.iter().flatten() {
            stats.parameters.insert(param.clone(), 0);
        }
        for error in operation.errors.iter().flatten() {
            stats.declare_error(error.clone());
        }
        usage.operations.insert(name.clone(), stats);
    }
    usage
}
