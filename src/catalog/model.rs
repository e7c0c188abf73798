//! Service specification types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Description of one service: its protocol, attributes and operations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceModel {
    pub name: String,

    /// Wire protocol name, used to pick a response parser.
    #[serde(default)]
    pub protocol: String,

    #[serde(default)]
    pub attributes: ServiceAttributes,

    #[serde(default)]
    pub operations: BTreeMap<String, OperationModel>,
}

impl ServiceModel {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            attributes: ServiceAttributes::default(),
            operations: BTreeMap::new(),
        }
    }

    /// Builder-style helper for adding an operation.
    pub fn with_operation(mut self, name: impl Into<String>, operation: OperationModel) -> Self {
        self.operations.insert(name.into(), operation);
        self
    }

    pub fn with_attributes(mut self, attributes: ServiceAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn operation(&self, name: &str) -> Option<&OperationModel> {
        self.operations.get(name)
    }
}

/// Distribution attributes of a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceAttributes {
    pub pro: bool,
    pub community: bool,
}

/// One operation of a service.
///
/// `None` means the operation declares no input shape (or no output shape,
/// or no error types); `Some(vec![])` is a declared but empty shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperationModel {
    pub input: Option<Vec<String>>,
    pub output: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl OperationModel {
    pub fn with_input<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_output<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_errors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specification() {
        let raw = r#"{
            "name": "s3",
            "protocol": "rest-xml",
            "attributes": {"pro": false, "community": true},
            "operations": {
                "GetObject": {"input": ["Bucket", "Key"], "errors": ["NoSuchKey"]},
                "ListBuckets": {}
            }
        }"#;
        let model: ServiceModel = serde_json::from_str(raw).unwrap();
        assert_eq!(model.protocol, "rest-xml");
        assert!(model.attributes.community);
        assert!(!model.attributes.pro);

        let get = model.operation("GetObject").unwrap();
        assert_eq!(get.input.as_deref(), Some(&["Bucket".to_string(), "Key".to_string()][..]));
        assert!(get.output.is_none());

        let list = model.operation("ListBuckets").unwrap();
        assert!(list.input.is_none());
        assert!(list.errors.is_none());
    }
}
