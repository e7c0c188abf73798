//! In-flight request state.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::recorder::snapshot::ParameterSnapshot;

/// Opaque, caller-supplied identity of one in-flight request.
///
/// Used only as a correlation key. Reusing an id before its record was
/// finalized is rejected by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The service and operation a request was routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceOperation {
    pub service: String,
    pub operation: String,
}

impl ServiceOperation {
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.operation)
    }
}

/// Descriptor of an exception raised while the pipeline handled a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtError {
    /// Error type name, reported in the `exception` column.
    pub type_name: String,
    pub message: String,
}

impl CaughtError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Describe an error by the unqualified name of its type.
    pub fn from_error<E: fmt::Display>(error: &E) -> Self {
        let full = std::any::type_name::<E>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        Self::new(name, error.to_string())
    }
}

impl fmt::Display for CaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Raw HTTP response as produced by the pipeline.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Mutable per-request record owned by the correlation store.
///
/// Every optional field moves from unset to set at most once. Setters return
/// `false` when the field was already set and leave the first value intact.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    request_id: RequestId,
    operation: Option<ServiceOperation>,
    parsed_parameters: Option<ParameterSnapshot>,
    dispatched_parameters: Option<ParameterSnapshot>,
    caught_error: Option<CaughtError>,
    http_response: Option<ResponseSnapshot>,
    parsed_response: Option<Value>,
}

impl PendingRecord {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            operation: None,
            parsed_parameters: None,
            dispatched_parameters: None,
            caught_error: None,
            http_response: None,
            parsed_response: None,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn operation(&self) -> Option<&ServiceOperation> {
        self.operation.as_ref()
    }

    pub fn parsed_parameters(&self) -> Option<&ParameterSnapshot> {
        self.parsed_parameters.as_ref()
    }

    pub fn dispatched_parameters(&self) -> Option<&ParameterSnapshot> {
        self.dispatched_parameters.as_ref()
    }

    pub fn caught_error(&self) -> Option<&CaughtError> {
        self.caught_error.as_ref()
    }

    pub fn http_response(&self) -> Option<&ResponseSnapshot> {
        self.http_response.as_ref()
    }

    pub fn parsed_response(&self) -> Option<&Value> {
        self.parsed_response.as_ref()
    }

    pub fn set_operation(&mut self, operation: ServiceOperation) -> bool {
        set_once(&mut self.operation, operation)
    }

    pub fn set_parsed_parameters(&mut self, snapshot: ParameterSnapshot) -> bool {
        set_once(&mut self.parsed_parameters, snapshot)
    }

    pub fn set_dispatched_parameters(&mut self, snapshot: ParameterSnapshot) -> bool {
        set_once(&mut self.dispatched_parameters, snapshot)
    }

    /// First exception wins.
    pub fn set_caught_error(&mut self, error: CaughtError) -> bool {
        set_once(&mut self.caught_error, error)
    }

    pub fn set_http_response(&mut self, response: ResponseSnapshot) -> bool {
        set_once(&mut self.http_response, response)
    }

    pub fn set_parsed_response(&mut self, value: Value) -> bool {
        set_once(&mut self.parsed_response, value)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}
