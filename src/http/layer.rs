//! Middleware driving the recorder around an inner service.

use axum::body::Body;
use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderName, Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::CollectionConfig;
use crate::correlation::{CaughtError, RequestId, ResponseSnapshot, ServiceOperation};
use crate::http::request::RequestIdExt;
use crate::observation::Origin;
use crate::recorder::ObservationRecorder;

/// Default header marking a call as internal.
pub const DEFAULT_INTERNAL_HEADER: &str = "x-internal-request";

/// Per-request handle inserted into request extensions.
///
/// Inner pipeline stages use it to report parse, dispatch and exception
/// events. Instrumentation errors are logged and never surface to the caller.
#[derive(Clone)]
pub struct RecorderHandle {
    id: RequestId,
    recorder: ObservationRecorder,
}

impl RecorderHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn parsed(&self, operation: ServiceOperation, parameters: &Value) {
        if let Err(e) = self.recorder.on_parsed(self.id, operation, parameters) {
            tracing::error!(request_id = %self.id, error = %e, "Failed to record parsed request");
        }
    }

    pub fn dispatched(&self, parameters: &Value) {
        if let Err(e) = self.recorder.on_dispatched(self.id, parameters) {
            tracing::error!(request_id = %self.id, error = %e, "Failed to record dispatched request");
        }
    }

    pub fn exception(&self, error: CaughtError) {
        if let Err(e) = self.recorder.on_exception(self.id, error) {
            tracing::error!(request_id = %self.id, error = %e, "Failed to record exception");
        }
    }
}

impl fmt::Debug for RecorderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderHandle").field("id", &self.id).finish()
    }
}

/// Layer wrapping services with [`UsageService`].
#[derive(Clone, Debug)]
pub struct UsageLayer {
    recorder: ObservationRecorder,
    internal_header: HeaderName,
}

impl UsageLayer {
    pub fn new(recorder: ObservationRecorder) -> Self {
        Self {
            recorder,
            internal_header: HeaderName::from_static(DEFAULT_INTERNAL_HEADER),
        }
    }

    /// Layer using the configured internal-call header.
    pub fn from_config(
        recorder: ObservationRecorder,
        config: &CollectionConfig,
    ) -> Result<Self, InvalidHeaderName> {
        let header = HeaderName::from_bytes(config.internal_header.as_bytes())?;
        Ok(Self::new(recorder).with_internal_header(header))
    }

    /// Header whose presence marks a request as internal.
    pub fn with_internal_header(mut self, header: HeaderName) -> Self {
        self.internal_header = header;
        self
    }
}

impl<S> Layer<S> for UsageLayer {
    type Service = UsageService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UsageService {
            inner,
            recorder: self.recorder.clone(),
            internal_header: self.internal_header.clone(),
        }
    }
}

/// Records one observation for every request passing through.
#[derive(Clone, Debug)]
pub struct UsageService<S> {
    inner: S,
    recorder: ObservationRecorder,
    internal_header: HeaderName,
}

impl<S, B> Service<Request<B>> for UsageService<S>
where
    S: Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        // Correlation keys are minted here; x-request-id is client controlled
        let id = RequestId::new();
        let client_id = request.request_id();
        let headers = request.headers().clone();
        let origin = Origin::from_headers(&headers, self.internal_header.as_str());
        let recorder = self.recorder.clone();

        if let Err(e) = recorder.on_create(id) {
            tracing::error!(request_id = %id, x_request_id = ?client_id, error = %e, "Failed to start request record");
        }
        request.extensions_mut().insert(RecorderHandle {
            id,
            recorder: recorder.clone(),
        });

        // The clone may not be ready; call the one poll_ready was driven on
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(request).await;

            let outcome = match result {
                Ok(response) => {
                    let (parts, body) = response.into_parts();
                    match axum::body::to_bytes(body, usize::MAX).await {
                        Ok(bytes) => {
                            let snapshot =
                                ResponseSnapshot::new(parts.status, parts.headers.clone(), bytes.clone());
                            if let Err(e) = recorder.on_response(id, snapshot) {
                                tracing::error!(request_id = %id, error = %e, "Failed to record response");
                            }
                            Ok(Response::from_parts(parts, Body::from(bytes)))
                        }
                        Err(e) => {
                            tracing::error!(request_id = %id, status = parts.status.as_u16(), error = %e, "Failed to buffer response body");
                            let caught = CaughtError::new(BODY_ERROR_TYPE, e.to_string());
                            if let Err(ce) = recorder.on_exception(id, caught) {
                                tracing::error!(request_id = %id, error = %ce, "Failed to record exception");
                            }
                            Ok(body_failure_response())
                        }
                    }
                }
                Err(e) => {
                    if let Err(ce) = recorder.on_exception(id, CaughtError::from_error(&e)) {
                        tracing::error!(request_id = %id, error = %ce, "Failed to record exception");
                    }
                    Err(e)
                }
            };

            if let Err(e) = recorder.on_finalize(id, &headers, origin) {
                tracing::error!(request_id = %id, x_request_id = ?client_id, error = %e, "Failed to finalize request record");
            }
            outcome
        })
    }
}

/// Exception name recorded when the inner response body cannot be read.
pub const BODY_ERROR_TYPE: &str = "ResponseBodyError";

/// Sent when the inner body fails mid-stream.
fn body_failure_response() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
