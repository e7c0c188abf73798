//! Folding observations into the usage trees.

use std::path::Path;

use crate::aggregate::AggregateError;
use crate::model::{OperationStats, UsageModel, NO_PARAMETERS};
use crate::observability::metrics;
use crate::observation::{FlatObservation, Origin};

/// Outcome of folding one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folded {
    Counted(Origin),
    /// Expected-failure rows are excluded from every counter.
    SkippedXfail,
}

/// Counts for one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    pub files: usize,
    pub rows: usize,
    pub skipped_xfail: usize,
}

/// Both filled trees plus the run summary.
#[derive(Debug, Clone)]
pub struct UsageReports {
    pub internal: UsageModel,
    pub external: UsageModel,
    pub summary: AggregationSummary,
}

/// Single-pass fold of raw rows into internal and external trees.
#[derive(Debug, Clone)]
pub struct Aggregator {
    internal: UsageModel,
    external: UsageModel,
    summary: AggregationSummary,
}

impl Aggregator {
    /// Start from a skeleton; internal and external get independent copies.
    pub fn new(skeleton: UsageModel) -> Self {
        Self {
            external: skeleton.clone(),
            internal: skeleton,
            summary: AggregationSummary::default(),
        }
    }

    pub fn internal(&self) -> &UsageModel {
        &self.internal
    }

    pub fn external(&self) -> &UsageModel {
        &self.external
    }

    pub fn summary(&self) -> AggregationSummary {
        self.summary
    }

    /// Fold one row into the tree selected by its origin.
    pub fn fold(&mut self, row: &FlatObservation) -> Result<Folded, AggregateError> {
        if row.xfail {
            tracing::debug!(test = %row.test_node_id, "test marked as xfail");
            metrics::record_skipped("xfail");
            self.summary.skipped_xfail += 1;
            return Ok(Folded::SkippedXfail);
        }

        let tree = match row.origin {
            Origin::Internal => &mut self.internal,
            Origin::External => &mut self.external,
        };
        if !tree.contains_service(&row.service) {
            return Err(AggregateError::UnknownService {
                service: row.service.clone(),
            });
        }
        let stats = tree
            .operation_mut(&row.service, &row.operation)
            .ok_or_else(|| AggregateError::UnknownOperation {
                service: row.service.clone(),
                operation: row.operation.clone(),
            })?;

        if let Some(parameter) = row
            .parameter_names()
            .find(|p| !stats.parameters.contains_key(*p))
        {
            return Err(AggregateError::UnknownParameter {
                service: row.service.clone(),
                operation: row.operation.clone(),
                parameter: parameter.to_string(),
            });
        }

        classify_error(stats, row);
        stats.invoked += 1;
        count_parameters(stats, row);
        stats.record_test(&row.test_node_id);

        metrics::record_folded(row.origin);
        self.summary.rows += 1;
        Ok(Folded::Counted(row.origin))
    }

    /// Fold every row of one raw report file. Returns the rows counted.
    pub fn fold_file(&mut self, path: &Path) -> Result<usize, AggregateError> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| AggregateError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let mut counted = 0;
        for (index, result) in reader.deserialize::<FlatObservation>().enumerate() {
            // Header is line 1
            let line = index as u64 + 2;
            let row = result.map_err(|source| AggregateError::Row {
                path: path.to_path_buf(),
                line,
                source: Box::new(AggregateError::Csv {
                    path: path.to_path_buf(),
                    source,
                }),
            })?;

            let folded = self.fold(&row).map_err(|e| AggregateError::Row {
                path: path.to_path_buf(),
                line,
                source: Box::new(e),
            })?;
            if let Folded::Counted(_) = folded {
                counted += 1;
            }
        }

        self.summary.files += 1;
        Ok(counted)
    }

    pub fn finish(self) -> UsageReports {
        UsageReports {
            internal: self.internal,
            external: self.external,
            summary: self.summary,
        }
    }
}

/// An explicit exception name wins over the status-code heuristic.
fn classify_error(stats: &mut OperationStats, row: &FlatObservation) {
    if !row.exception.is_empty() {
        stats.record_exception(&row.exception);
        return;
    }
    if !row.is_error_status() {
        return;
    }

    let matched = stats.match_declared_error(&row.response).map(str::to_string);
    if let Some(name) = matched {
        if let Some(count) = stats.errors.get_mut(&name) {
            *count += 1;
        }
    }
}

fn count_parameters(stats: &mut OperationStats, row: &FlatObservation) {
    let mut supplied = row.parameter_names().peekable();
    if supplied.peek().is_none() {
        *stats.parameters.entry(NO_PARAMETERS.to_string()).or_insert(0) += 1;
        return;
    }
    for name in supplied {
        if let Some(count) = stats.parameters.get_mut(name) {
            *count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{OperationModel, ServiceModel, StaticProvider};
    use crate::model::build_from_catalog;

    fn skeleton() -> UsageModel {
        let provider = StaticProvider::new().with_service(
            ServiceModel::new("s3", "rest-xml")
                .with_operation(
                    "GetObject",
                    OperationModel::default()
                        .with_input(["Bucket", "Key"])
                        .with_errors(["NoSuchKey", "AccessDenied"]),
                )
                .with_operation("ListBuckets", OperationModel::default()),
        );
        build_from_catalog(&provider)
    }

    fn row(operation: &str, status: u16, exception: &str, response: &str) -> FlatObservation {
        FlatObservation {
            service: "s3".into(),
            operation: operation.into(),
            request_headers: "{}".into(),
            parameters: String::new(),
            response_code: status,
            response: response.into(),
            exception: exception.into(),
            test_node_id: "tests/test_s3.py::test_get_object".into(),
            xfail: false,
            origin: Origin::External,
        }
    }

    #[test]
    fn test_error_classification_scenario() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator
            .fold(&row("GetObject", 404, "", "<Error><Code>NoSuchKey</Code></Error>"))
            .unwrap();
        aggregator.fold(&row("GetObject", 403, "AccessDenied", "")).unwrap();
        aggregator.fold(&row("GetObject", 500, "WeirdInternalError", "")).unwrap();

        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.errors["NoSuchKey"], 1);
        assert_eq!(stats.errors["AccessDenied"], 1);
        assert_eq!(stats.errors_not_in_shape.as_ref().unwrap()["WeirdInternalError"], 1);
        assert_eq!(stats.invoked, 3);
    }

    #[test]
    fn test_exception_wins_over_body_match() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator
            .fold(&row("GetObject", 404, "AccessDenied", "<Code>NoSuchKey</Code>"))
            .unwrap();

        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.errors["AccessDenied"], 1);
        assert_eq!(stats.errors["NoSuchKey"], 0);
    }

    #[test]
    fn test_body_match_follows_declaration_order() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator
            .fold(&row(
                "GetObject",
                404,
                "",
                "<Code>NoSuchKey</Code><Message>AccessDenied</Message>",
            ))
            .unwrap();

        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.errors["NoSuchKey"], 1);
        assert_eq!(stats.errors["AccessDenied"], 0);
    }

    #[test]
    fn test_unmatched_error_counts_nothing() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator.fold(&row("GetObject", 503, "", "SlowDown")).unwrap();

        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert!(stats.errors.values().all(|c| *c == 0));
        assert!(stats.errors_not_in_shape.is_none());
        assert_eq!(stats.invoked, 1);
    }

    #[test]
    fn test_success_status_ignores_body() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator.fold(&row("GetObject", 200, "", "NoSuchKey")).unwrap();
        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.errors["NoSuchKey"], 0);
    }

    #[test]
    fn test_parameter_accounting() {
        let mut aggregator = Aggregator::new(skeleton());
        let mut with_params = row("GetObject", 200, "", "");
        with_params.parameters = "Bucket,Key".into();
        aggregator.fold(&with_params).unwrap();

        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.parameters["Bucket"], 1);
        assert_eq!(stats.parameters["Key"], 1);
        assert!(!stats.parameters.contains_key(NO_PARAMETERS));

        aggregator.fold(&row("GetObject", 200, "", "")).unwrap();
        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.parameters[NO_PARAMETERS], 1);
        assert_eq!(stats.parameters["Bucket"], 1);
    }

    #[test]
    fn test_origin_selects_tree() {
        let mut aggregator = Aggregator::new(skeleton());
        let mut internal = row("ListBuckets", 200, "", "");
        internal.origin = Origin::Internal;

        assert_eq!(aggregator.fold(&internal).unwrap(), Folded::Counted(Origin::Internal));
        assert_eq!(aggregator.internal().operation("s3", "ListBuckets").unwrap().invoked, 1);
        assert_eq!(aggregator.external().operation("s3", "ListBuckets").unwrap().invoked, 0);
    }

    #[test]
    fn test_xfail_changes_nothing() {
        let mut aggregator = Aggregator::new(skeleton());
        let before = (aggregator.internal().clone(), aggregator.external().clone());

        let mut xfail = row("GetObject", 500, "WeirdInternalError", "");
        xfail.xfail = true;
        assert_eq!(aggregator.fold(&xfail).unwrap(), Folded::SkippedXfail);

        assert_eq!(aggregator.internal(), &before.0);
        assert_eq!(aggregator.external(), &before.1);
        assert_eq!(aggregator.summary().skipped_xfail, 1);
    }

    #[test]
    fn test_duplicate_tests_collapse() {
        let mut aggregator = Aggregator::new(skeleton());
        aggregator.fold(&row("ListBuckets", 200, "", "")).unwrap();
        aggregator.fold(&row("ListBuckets", 200, "", "")).unwrap();

        let stats = aggregator.external().operation("s3", "ListBuckets").unwrap();
        assert_eq!(stats.invoked, 2);
        assert_eq!(stats.tests.len(), 1);
    }

    #[test]
    fn test_unknown_references_are_fatal() {
        let mut aggregator = Aggregator::new(skeleton());

        let mut unknown_service = row("GetObject", 200, "", "");
        unknown_service.service = "dynamodb".into();
        assert!(matches!(
            aggregator.fold(&unknown_service),
            Err(AggregateError::UnknownService { .. })
        ));

        assert!(matches!(
            aggregator.fold(&row("PutObject", 200, "", "")),
            Err(AggregateError::UnknownOperation { .. })
        ));

        let mut unknown_param = row("GetObject", 200, "", "");
        unknown_param.parameters = "Bucket,Range".into();
        assert!(matches!(
            aggregator.fold(&unknown_param),
            Err(AggregateError::UnknownParameter { parameter, .. }) if parameter == "Range"
        ));
        // Rejected rows leave no partial counts
        let stats = aggregator.external().operation("s3", "GetObject").unwrap();
        assert_eq!(stats.invoked, 0);
        assert_eq!(stats.parameters["Bucket"], 0);
    }
}
