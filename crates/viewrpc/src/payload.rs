//! Payload and argument encoding.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::error::RpcError;

/// Encodes a value as the nested JSON string carried in a Result payload.
pub fn encode_payload<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a Result payload. A missing payload is `null`.
pub fn decode_payload(payload: Option<&str>) -> Result<Value> {
    match payload {
        None => Ok(Value::Null),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Flattens call arguments into the positional list of an Invoke frame.
///
/// `args` must encode to a JSON list: tuples, slices and `Vec`s spread into one
/// argument per element. `()` encodes to `null` and means no arguments, so a
/// lone `null` cannot be sent this way; wrap it as `(Value::Null,)`. The same
/// goes for a single list argument: `(vec![1, 2],)`.
pub fn encode_args<T: Serialize + ?Sized>(args: &T) -> Result<Vec<Value>> {
    match serde_json::to_value(args)? {
        Value::Array(args) => Ok(args),
        Value::Null => Ok(Vec::new()),
        other => Err(RpcError::Serialization(format!(
            "arguments must encode to a list, got {}",
            json_kind(&other)
        ))),
    }
}

/// Parses raw bytes into a JSON value.
pub fn parse_message(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| RpcError::ProtocolViolation(format!("message is not JSON: {}", e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
