//! # Error Definitions
//!
//! Two distinct failure families live here:
//!
//! - [`RpcError`]: the protocol itself failed (bad frame, unencodable value).
//! - [`RemoteError`]: the far side ran a function and it raised. This is plain
//!   data that crosses the boundary and is re-hydrated on arrival.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

/// Operational failures within the RPC mechanism itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// A value could not be encoded to, or decoded from, JSON.
    Serialization(String),
    /// The frame discriminant was neither Invoke nor Result.
    UnknownKind(u64),
    /// The frame was structurally malformed.
    ProtocolViolation(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::UnknownKind(kind) => write!(f, "Unknown envelope kind: {}", kind),
            Self::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// A specialized Result type for wire operations.
pub type Result<T> = std::result::Result<T, RpcError>;

/// An error raised on the other side of the bridge.
///
/// Mirrors the shape of a script `Error`: a `name` such as `"TypeError"`, a
/// human readable `message`, and a free-form `stack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stack: String,
}

/// Scripts happily serialize `undefined` fields as `null`.
fn nullable<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

impl RemoteError {
    pub const DEFAULT_NAME: &'static str = "Error";

    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: String::new(),
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    /// The invoked method is not exposed by the receiving side.
    pub fn method_not_found(method: &str) -> Self {
        Self::new("MethodNotFound", format!("method '{}' is not exposed", method))
    }

    /// Arguments did not match what the method expects.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// A return value could not be encoded.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new("SerializationError", message)
    }

    /// The handler panicked instead of returning.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new("Panic", message)
    }

    /// Re-hydrates an error from the payload of an error Result envelope.
    ///
    /// Never fails: whatever the far side sent is turned into something a
    /// caller can look at. Objects contribute their `name`, `message` and
    /// `stack` fields; anything else becomes the message.
    pub fn from_payload(payload: Option<&str>) -> Self {
        let Some(raw) = payload else {
            return Self::new(Self::DEFAULT_NAME, "");
        };

        let mut error = match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => serde_json::from_value::<RemoteError>(value)
                .unwrap_or_else(|_| Self::new(Self::DEFAULT_NAME, raw)),
            Ok(Value::String(message)) => Self::new(Self::DEFAULT_NAME, message),
            _ => Self::new(Self::DEFAULT_NAME, raw),
        };

        if error.name.is_empty() {
            error.name = Self::DEFAULT_NAME.to_string();
        }
        error
    }

    /// Encodes this error as the nested JSON string of an error payload.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for RemoteError {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME, "")
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<anyhow::Error> for RemoteError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(remote) = e.downcast_ref::<RemoteError>() {
            return remote.clone();
        }
        Self::new(Self::DEFAULT_NAME, e.to_string()).with_stack(format!("{:?}", e))
    }
}
