//! Response wire-parsing.
//!
//! # Data Flow
//! ```text
//! ResponseSnapshot (status, headers, body)
//!     → ParserRegistry::parser_for(service protocol)
//!     → ResponseParser::parse(operation shape, response)
//!     → structured value stored on the pending record
//! ```
//!
//! # Design Decisions
//! - Parsers are keyed by protocol name and registered at startup
//! - Decode failures are ordinary errors; callers decide whether to log and move on

pub mod json;

use std::collections::HashMap;
use std::sync::Arc;
use serde_json::Value;
use thiserror::Error;

use crate::catalog::OperationModel;
use crate::correlation::ResponseSnapshot;

pub use json::JsonResponseParser;

/// Errors raised while decoding a response body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no response parser registered for protocol '{0}'")]
    UnsupportedProtocol(String),

    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response body is not in the declared shape: {0}")]
    ShapeMismatch(String),
}

/// Decodes a raw response into a structured value for one operation.
pub trait ResponseParser: Send + Sync {
    fn parse(
        &self,
        operation: &OperationModel,
        response: &ResponseSnapshot,
    ) -> Result<Value, DecodeError>;
}

/// Protocol name to parser mapping.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn ResponseParser>>,
}

impl ParserRegistry {
    /// Registry with no parsers; every decode fails as unsupported.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in JSON parser for `json` and `rest-json`.
    pub fn with_defaults() -> Self {
        let json: Arc<dyn ResponseParser> = Arc::new(JsonResponseParser);
        Self::empty()
            .register("json", json.clone())
            .register("rest-json", json)
    }

    pub fn register(mut self, protocol: impl Into<String>, parser: Arc<dyn ResponseParser>) -> Self {
        self.parsers.insert(protocol.into(), parser);
        self
    }

    pub fn parser_for(&self, protocol: &str) -> Result<&Arc<dyn ResponseParser>, DecodeError> {
        self.parsers
            .get(protocol)
            .ok_or_else(|| DecodeError::UnsupportedProtocol(protocol.to_string()))
    }

    /// Decode `response` with the parser registered for `protocol`.
    pub fn decode(
        &self,
        protocol: &str,
        operation: &OperationModel,
        response: &ResponseSnapshot,
    ) -> Result<Value, DecodeError> {
        self.parser_for(protocol)?.parse(operation, response)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut protocols: Vec<_> = self.parsers.keys().collect();
        protocols.sort();
        f.debug_struct("ParserRegistry").field("protocols", &protocols).finish()
    }
}
