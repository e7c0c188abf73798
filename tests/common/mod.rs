//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use usage_metrics::catalog::{
    OperationModel, ServiceAttributes, ServiceModel, SpecificationProvider, StaticProvider,
};
use usage_metrics::observation::{FlatObservation, Origin, RAW_DATA_HEADER};

/// Catalog with an S3-like and an SQS-like service.
pub fn fixture_provider() -> StaticProvider {
    StaticProvider::new()
        .with_service(
            ServiceModel::new("s3", "rest-xml")
                .with_attributes(ServiceAttributes { pro: false, community: true })
                .with_operation(
                    "GetObject",
                    OperationModel::default()
                        .with_input(["Bucket", "Key", "VersionId"])
                        .with_errors(["NoSuchKey", "AccessDenied"]),
                )
                .with_operation("ListBuckets", OperationModel::default()),
        )
        .with_service(
            ServiceModel::new("sqs", "json")
                .with_attributes(ServiceAttributes { pro: true, community: true })
                .with_operation(
                    "CreateQueue",
                    OperationModel::default()
                        .with_input(["QueueName", "Attributes"])
                        .with_output(["QueueUrl"])
                        .with_errors(["QueueAlreadyExists"]),
                ),
        )
}

#[allow(dead_code)]
pub fn shared_provider() -> Arc<dyn SpecificationProvider> {
    Arc::new(fixture_provider())
}

/// Row builder with sensible defaults.
#[allow(dead_code)]
pub fn row(service: &str, operation: &str, test: &str) -> FlatObservation {
    FlatObservation {
        service: service.into(),
        operation: operation.into(),
        request_headers: "{}".into(),
        parameters: String::new(),
        response_code: 200,
        response: String::new(),
        exception: String::new(),
        test_node_id: test.into(),
        xfail: false,
        origin: Origin::External,
    }
}

/// Write a raw report file with the standard header.
#[allow(dead_code)]
pub fn write_raw_report(path: &Path, rows: &[FlatObservation]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    writer.write_record(RAW_DATA_HEADER).unwrap();
    for row in rows {
        writer.serialize(row).unwrap();
    }
    writer.flush().unwrap();
}
