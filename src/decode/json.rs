//! JSON protocol response parser.

use serde_json::{Map, Value};

use crate::catalog::OperationModel;
use crate::correlation::ResponseSnapshot;
use crate::decode::{DecodeError, ResponseParser};

/// Parses JSON object bodies, keeping only the declared output members.
///
/// Operations without a declared output shape keep every member. An empty
/// body decodes to an empty object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl ResponseParser for JsonResponseParser {
    fn parse(
        &self,
        operation: &OperationModel,
        response: &ResponseSnapshot,
    ) -> Result<Value, DecodeError> {
        if response.body.is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let body: Value = serde_json::from_slice(&response.body)?;
        let Value::Object(members) = body else {
            return Err(DecodeError::ShapeMismatch(format!(
                "expected an object, got {}",
                kind_of(&body)
            )));
        };

        let Some(declared) = &operation.output else {
            return Ok(Value::Object(members));
        };

        let projected: Map<String, Value> = members
            .into_iter()
            .filter(|(name, _)| declared.iter().any(|d| d == name))
            .collect();
        Ok(Value::Object(projected))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
