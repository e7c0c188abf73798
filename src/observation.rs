//! Flat per-request observation rows.
//!
//! One row is emitted per finalized request and appended to the run's raw
//! report file. Rows are never mutated after being written.

use axum::http::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column order of every raw report file.
pub const RAW_DATA_HEADER: [&str; 10] = [
    "service",
    "operation",
    "request_headers",
    "parameters",
    "response_code",
    "response",
    "exception",
    "test_node_id",
    "xfail",
    "origin",
];

/// Separator used in the `parameters` column.
pub const PARAMETER_DELIMITER: char = ',';

/// Whether a call came from the system's own machinery or from outside.
///
/// Reading is lenient: anything other than `internal` is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Internal,
    External,
}

impl Origin {
    /// Internal when the marker header is present on the request.
    pub fn from_headers(headers: &HeaderMap, internal_header: &str) -> Self {
        if headers.contains_key(internal_header) {
            Origin::Internal
        } else {
            Origin::External
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Internal => "internal",
            Origin::External => "external",
        }
    }
}

impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().eq_ignore_ascii_case("internal") {
            Ok(Origin::Internal)
        } else {
            Ok(Origin::External)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the raw report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatObservation {
    pub service: String,
    pub operation: String,
    pub request_headers: String,
    /// Comma-joined names of the parameters the caller supplied.
    pub parameters: String,
    pub response_code: u16,
    /// Raw response body; empty unless `response_code >= 300`.
    pub response: String,
    /// Exception type name; empty if none was caught.
    pub exception: String,
    pub test_node_id: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub xfail: bool,
    pub origin: Origin,
}

impl FlatObservation {
    /// Iterate the supplied parameter names. Empty when none were supplied.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .split(PARAMETER_DELIMITER)
            .filter(|p| !p.is_empty())
    }

    pub fn is_error_status(&self) -> bool {
        self.response_code >= 300
    }
}

/// Serialize request headers as a JSON object with sorted keys.
///
/// Repeated headers are joined with `, `; non UTF-8 values are replaced lossily.
pub fn serialize_headers(headers: &HeaderMap) -> String {
    let mut map: BTreeMap<&str, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    serde_json::to_string(&map).unwrap_or_default()
}

/// Accept `true`/`false` in any case; older tooling wrote `True`/`False`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid xfail flag '{}'",
            other
        ))),
    }
}
