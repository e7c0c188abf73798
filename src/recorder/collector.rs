//! Pipeline-facing observation recorder.

use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::catalog::ServiceCatalog;
use crate::config::CollectionConfig;
use crate::correlation::{
    CaughtError, CorrelationError, CorrelationStore, PendingRecord, RequestId, ResponseSnapshot,
    ServiceOperation,
};
use crate::decode::{DecodeError, ParserRegistry};
use crate::observability::metrics;
use crate::observation::{serialize_headers, FlatObservation, Origin};
use crate::recorder::snapshot::ParameterSnapshot;
use crate::recorder::toggle::InstrumentationToggle;
use crate::recorder::RecorderMode;
use crate::sink::{CurrentTest, ObservationBuffer, ReportSession};

/// Records one observation per request across the pipeline's callbacks.
///
/// Cloning yields a handle onto the same store, buffer and toggle.
#[derive(Clone)]
pub struct ObservationRecorder {
    store: CorrelationStore,
    toggle: InstrumentationToggle,
    mode: RecorderMode,
    buffer: Arc<ObservationBuffer>,
    current_test: Arc<CurrentTest>,
    catalog: Option<ServiceCatalog>,
    parsers: Arc<ParserRegistry>,
}

impl ObservationRecorder {
    pub fn new(buffer: Arc<ObservationBuffer>, current_test: Arc<CurrentTest>) -> Self {
        Self {
            store: CorrelationStore::new(),
            toggle: InstrumentationToggle::default(),
            mode: RecorderMode::default(),
            buffer,
            current_test,
            catalog: None,
            parsers: Arc::new(ParserRegistry::with_defaults()),
        }
    }

    /// Recorder writing into a session's buffer and test context.
    pub fn for_session(session: &ReportSession) -> Self {
        Self::new(session.buffer(), session.current_test())
    }

    /// Session recorder with the configured mode and initial toggle state.
    pub fn from_config(session: &ReportSession, config: &CollectionConfig) -> Self {
        Self::for_session(session)
            .with_mode(config.mode)
            .with_toggle(InstrumentationToggle::new(config.enabled))
    }

    pub fn with_mode(mut self, mode: RecorderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_toggle(mut self, toggle: InstrumentationToggle) -> Self {
        self.toggle = toggle;
        self
    }

    /// Catalog used to find an operation's response shape and protocol.
    /// Without one, responses are stored but never decoded.
    pub fn with_catalog(mut self, catalog: ServiceCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Arc::new(parsers);
        self
    }

    pub fn toggle(&self) -> &InstrumentationToggle {
        &self.toggle
    }

    pub fn mode(&self) -> RecorderMode {
        self.mode
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// Request created: start tracking `id`.
    pub fn on_create(&self, id: RequestId) -> Result<(), CorrelationError> {
        if !self.toggle.is_enabled() {
            return Ok(());
        }
        self.store.begin(id)
    }

    /// Request parsed and routed to `operation`.
    pub fn on_parsed(
        &self,
        id: RequestId,
        operation: ServiceOperation,
        parameters: &Value,
    ) -> Result<(), CorrelationError> {
        if !self.toggle.is_enabled() {
            return Ok(());
        }
        let snapshot = ParameterSnapshot::capture(parameters);
        let (op_set, params_set) = self.store.update(id, |record| {
            (
                record.set_operation(operation),
                record.set_parsed_parameters(snapshot),
            )
        })?;
        if !op_set || !params_set {
            tracing::debug!(request_id = %id, "Request already parsed, keeping first snapshot");
        }
        Ok(())
    }

    /// Request handed to the service implementation. Ignored in `Metrics` mode.
    pub fn on_dispatched(&self, id: RequestId, parameters: &Value) -> Result<(), CorrelationError> {
        if !self.toggle.is_enabled() || self.mode != RecorderMode::Tracing {
            return Ok(());
        }
        let snapshot = ParameterSnapshot::capture(parameters);
        if !self.store.update(id, |record| record.set_dispatched_parameters(snapshot))? {
            tracing::debug!(request_id = %id, "Request already dispatched, keeping first snapshot");
        }
        Ok(())
    }

    /// An exception was raised. Later exceptions never replace the first.
    pub fn on_exception(&self, id: RequestId, error: CaughtError) -> Result<(), CorrelationError> {
        if !self.toggle.is_enabled() {
            return Ok(());
        }
        let name = error.type_name.clone();
        if !self.store.update(id, |record| record.set_caught_error(error))? {
            tracing::debug!(request_id = %id, exception = %name, "Ignoring later exception");
        }
        Ok(())
    }

    /// Response produced. Decoding is best effort.
    pub fn on_response(
        &self,
        id: RequestId,
        response: ResponseSnapshot,
    ) -> Result<(), CorrelationError> {
        if !self.toggle.is_enabled() {
            return Ok(());
        }

        let (stored, operation) = self.store.update(id, |record| {
            (
                record.set_http_response(response.clone()),
                record.operation().cloned(),
            )
        })?;
        if !stored {
            tracing::debug!(request_id = %id, "Response already recorded");
            return Ok(());
        }

        if response.body.is_empty() {
            return Ok(());
        }
        let Some(operation) = operation else {
            return Ok(());
        };

        match self.decode(&operation, &response) {
            Ok(Some(value)) => {
                self.store.update(id, |record| record.set_parsed_response(value))?;
            }
            Ok(None) => {}
            Err((protocol, e)) => {
                metrics::record_decode_failure(&protocol);
                tracing::warn!(
                    request_id = %id,
                    operation = %operation,
                    status = response.status.as_u16(),
                    error = %e,
                    "Error parsing response"
                );
            }
        }
        Ok(())
    }

    /// Request finished: emit its row.
    ///
    /// Returns the emitted row, or `None` when collection is off or the
    /// request never resolved to an operation. A pending record is always
    /// released, even when collection was switched off mid-request.
    pub fn on_finalize(
        &self,
        id: RequestId,
        request_headers: &HeaderMap,
        origin: Origin,
    ) -> Result<Option<FlatObservation>, CorrelationError> {
        if !self.toggle.is_enabled() {
            if self.store.finalize(id).is_ok() {
                metrics::record_dropped("collection_disabled");
            }
            return Ok(None);
        }

        let record = self.store.finalize(id)?;
        let Some(operation) = record.operation() else {
            metrics::record_dropped("unresolved_operation");
            tracing::debug!(request_id = %id, "No operation resolved, nothing recorded");
            return Ok(None);
        };

        let row = self.build_observation(&record, operation, request_headers, origin);
        if self.mode == RecorderMode::Tracing {
            log_trace(&record, operation);
        }

        self.buffer.append(row.clone());
        metrics::record_observation(origin);
        Ok(Some(row))
    }

    fn build_observation(
        &self,
        record: &PendingRecord,
        operation: &ServiceOperation,
        request_headers: &HeaderMap,
        origin: Origin,
    ) -> FlatObservation {
        let status = match record.http_response() {
            Some(response) => response.status,
            None if record.caught_error().is_some() => StatusCode::INTERNAL_SERVER_ERROR,
            None => StatusCode::OK,
        };
        let response = match record.http_response() {
            Some(r) if status.as_u16() >= 300 => r.body_text(),
            _ => String::new(),
        };
        let test = self.current_test.get();

        FlatObservation {
            service: operation.service.clone(),
            operation: operation.operation.clone(),
            request_headers: serialize_headers(request_headers),
            parameters: record
                .parsed_parameters()
                .map(ParameterSnapshot::joined_names)
                .unwrap_or_default(),
            response_code: status.as_u16(),
            response,
            exception: record
                .caught_error()
                .map(|e| e.type_name.clone())
                .unwrap_or_default(),
            test_node_id: test.node_id.clone(),
            xfail: test.xfail,
            origin,
        }
    }

    /// `Ok(None)` when there is nothing to decode against.
    fn decode(
        &self,
        operation: &ServiceOperation,
        response: &ResponseSnapshot,
    ) -> Result<Option<Value>, (String, DecodeError)> {
        let Some(catalog) = &self.catalog else {
            return Ok(None);
        };
        let service = match catalog.service(&operation.service) {
            Ok(service) => service,
            Err(e) => {
                tracing::debug!(service = %operation.service, error = %e, "No specification for response decoding");
                return Ok(None);
            }
        };
        let Some(model) = service.operation(&operation.operation) else {
            return Ok(None);
        };

        self.parsers
            .decode(&service.protocol, model, response)
            .map(Some)
            .map_err(|e| (service.protocol.clone(), e))
    }
}

impl std::fmt::Debug for ObservationRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationRecorder")
            .field("mode", &self.mode)
            .field("enabled", &self.toggle.is_enabled())
            .field("in_flight", &self.store.len())
            .finish()
    }
}

fn log_trace(record: &PendingRecord, operation: &ServiceOperation) {
    tracing::info!(
        request_id = %record.request_id(),
        operation = %operation,
        request_after_parse = ?record.parsed_parameters().map(ParameterSnapshot::value),
        request_after_dispatch = ?record.dispatched_parameters().map(ParameterSnapshot::value),
        status = ?record.http_response().map(|r| r.status.as_u16()),
        caught_exception = ?record.caught_error().map(ToString::to_string),
        parsed_response = ?record.parsed_response(),
        "Request trace"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{OperationModel, ServiceModel, StaticProvider};
    use serde_json::json;

    fn recorder() -> (ObservationRecorder, Arc<ObservationBuffer>, Arc<CurrentTest>) {
        let buffer = Arc::new(ObservationBuffer::new());
        let current = Arc::new(CurrentTest::new());
        (
            ObservationRecorder::new(buffer.clone(), current.clone()),
            buffer,
            current,
        )
    }

    fn response(status: StatusCode, body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(status, HeaderMap::new(), body)
    }

    fn sqs_catalog() -> ServiceCatalog {
        let provider = StaticProvider::new().with_service(
            ServiceModel::new("sqs", "json").with_operation(
                "CreateQueue",
                OperationModel::default()
                    .with_input(["QueueName", "Attributes"])
                    .with_output(["QueueUrl"]),
            ),
        );
        ServiceCatalog::new(Arc::new(provider))
    }

    #[test]
    fn test_full_request_lifecycle() {
        let (recorder, buffer, current) = recorder();
        current.set("tests/test_s3.py::test_get", false);
        let id = RequestId::new();

        let mut live = json!({"Bucket": "b", "Key": "k"});
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("s3", "GetObject"), &live)
            .unwrap();
        live["VersionId"] = json!("injected-by-dispatch");
        recorder
            .on_response(id, response(StatusCode::NOT_FOUND, "<Code>NoSuchKey</Code>"))
            .unwrap();

        let row = recorder
            .on_finalize(id, &HeaderMap::new(), Origin::External)
            .unwrap()
            .unwrap();

        assert_eq!(row.service, "s3");
        assert_eq!(row.operation, "GetObject");
        assert_eq!(row.parameters, "Bucket,Key");
        assert_eq!(row.response_code, 404);
        assert_eq!(row.response, "<Code>NoSuchKey</Code>");
        assert_eq!(row.exception, "");
        assert_eq!(row.test_node_id, "tests/test_s3.py::test_get");
        assert_eq!(buffer.drain(), vec![row]);
        assert!(recorder.store().is_empty());
    }

    #[test]
    fn test_success_body_not_reported() {
        let (recorder, _, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("s3", "ListBuckets"), &json!({}))
            .unwrap();
        recorder.on_response(id, response(StatusCode::OK, "<Buckets/>")).unwrap();

        let row = recorder
            .on_finalize(id, &HeaderMap::new(), Origin::Internal)
            .unwrap()
            .unwrap();
        assert_eq!(row.response, "");
        assert_eq!(row.parameters, "");
        assert_eq!(row.origin, Origin::Internal);
    }

    #[test]
    fn test_first_exception_wins() {
        let (recorder, _, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "SendMessage"), &json!({}))
            .unwrap();
        recorder.on_exception(id, CaughtError::new("QueueDoesNotExist", "")).unwrap();
        recorder.on_exception(id, CaughtError::new("InternalError", "")).unwrap();

        let row = recorder
            .on_finalize(id, &HeaderMap::new(), Origin::External)
            .unwrap()
            .unwrap();
        assert_eq!(row.exception, "QueueDoesNotExist");
        assert_eq!(row.response_code, 500);
    }

    #[test]
    fn test_unresolved_operation_emits_nothing() {
        let (recorder, buffer, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder.on_exception(id, CaughtError::new("ParseError", "")).unwrap();

        let row = recorder.on_finalize(id, &HeaderMap::new(), Origin::External).unwrap();
        assert!(row.is_none());
        assert!(buffer.is_empty());
        assert!(recorder.store().is_empty());
    }

    #[test]
    fn test_finalize_twice_is_correlation_error() {
        let (recorder, buffer, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "ListQueues"), &json!({}))
            .unwrap();
        recorder.on_finalize(id, &HeaderMap::new(), Origin::External).unwrap();

        let err = recorder
            .on_finalize(id, &HeaderMap::new(), Origin::External)
            .unwrap_err();
        assert_eq!(err, CorrelationError::UnknownKey(id));
        assert_eq!(buffer.len(), 1);
        assert_eq!(recorder.on_create(id), Ok(()));
    }

    #[test]
    fn test_disabled_toggle_is_pass_through() {
        let (recorder, buffer, _) = recorder();
        recorder.toggle().disable();
        let id = RequestId::new();

        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "ListQueues"), &json!({}))
            .unwrap();
        assert!(recorder.on_finalize(id, &HeaderMap::new(), Origin::External).unwrap().is_none());
        assert!(recorder.store().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_toggle_off_mid_request_releases_record() {
        let (recorder, buffer, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "ListQueues"), &json!({}))
            .unwrap();

        recorder.toggle().disable();
        assert!(recorder.on_finalize(id, &HeaderMap::new(), Origin::External).unwrap().is_none());
        assert!(recorder.store().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_response_decoded_with_catalog() {
        let (recorder, _, _) = recorder();
        let recorder = recorder.with_catalog(sqs_catalog());
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "CreateQueue"), &json!({"QueueName": "q"}))
            .unwrap();
        recorder
            .on_response(id, response(StatusCode::OK, r#"{"QueueUrl": "http://q", "Extra": 1}"#))
            .unwrap();

        let record = recorder.store().get(id).unwrap();
        assert_eq!(record.parsed_response(), Some(&json!({"QueueUrl": "http://q"})));
    }

    #[test]
    fn test_decode_failure_is_swallowed() {
        let (recorder, buffer, _) = recorder();
        let recorder = recorder.with_catalog(sqs_catalog());
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder
            .on_parsed(id, ServiceOperation::new("sqs", "CreateQueue"), &json!({}))
            .unwrap();
        recorder
            .on_response(id, response(StatusCode::BAD_REQUEST, "<ErrorResponse/>"))
            .unwrap();

        let record = recorder.store().get(id).unwrap();
        assert!(record.parsed_response().is_none());
        assert!(record.http_response().is_some());

        let row = recorder
            .on_finalize(id, &HeaderMap::new(), Origin::External)
            .unwrap()
            .unwrap();
        assert_eq!(row.response, "<ErrorResponse/>");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_dispatch_recorded_only_when_tracing() {
        let (recorder, _, _) = recorder();
        let id = RequestId::new();
        recorder.on_create(id).unwrap();
        recorder.on_dispatched(id, &json!({"QueueUrl": "x"})).unwrap();
        assert!(recorder.store().get(id).unwrap().dispatched_parameters().is_none());

        let tracing = recorder.clone().with_mode(RecorderMode::Tracing);
        tracing.on_dispatched(id, &json!({"QueueUrl": "x"})).unwrap();
        assert!(tracing.store().get(id).unwrap().dispatched_parameters().is_some());
    }
}
