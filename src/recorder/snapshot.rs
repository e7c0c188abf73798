//! Frozen copies of request parameters.
//!
//! The pipeline keeps mutating its live parameter structure after parsing
//! (defaults filled in, values rewritten on dispatch). A snapshot is a deep,
//! independent copy taken at one stage and shared read-only afterwards.

use serde_json::Value;
use std::sync::Arc;

use crate::observation::PARAMETER_DELIMITER;

/// Immutable snapshot of a structured parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSnapshot(Arc<Value>);

impl ParameterSnapshot {
    /// Deep-copy `live` into a new snapshot.
    pub fn capture(live: &Value) -> Self {
        Self(Arc::new(live.clone()))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Names of the top-level parameters present in the snapshot.
    pub fn names(&self) -> Vec<&str> {
        match self.0.as_ref() {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Names joined with the raw report delimiter.
    pub fn joined_names(&self) -> String {
        let mut out = String::new();
        for (i, name) in self.names().into_iter().enumerate() {
            if i > 0 {
                out.push(PARAMETER_DELIMITER);
            }
            out.push_str(name);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_is_independent() {
        let mut live = json!({"Bucket": "photos", "Key": "a.png"});
        let snapshot = ParameterSnapshot::capture(&live);

        live["Key"] = json!("rewritten.png");
        live["VersionId"] = json!("v2");

        assert_eq!(snapshot.value()["Key"], "a.png");
        assert_eq!(snapshot.joined_names(), "Bucket,Key");
    }

    #[test]
    fn test_non_object_has_no_names() {
        let snapshot = ParameterSnapshot::capture(&Value::Null);
        assert!(snapshot.names().is_empty());
        assert_eq!(snapshot.joined_names(), "");
    }
}
