//! # Envelopes
//!
//! The two frame types of the protocol and their positional JSON layout.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;

use crate::error::RemoteError;
use crate::error::Result;
use crate::error::RpcError;
use crate::payload::decode_payload;
use crate::payload::encode_payload;
use crate::payload::parse_message;

/// Discriminant of an Invoke frame.
pub const INVOKE: u64 = 0;
/// Discriminant of a Result frame.
pub const RESULT: u64 = 1;

/// Opaque token linking a request to its eventual response.
///
/// The protocol treats ids as strings and never looks inside them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A request to run `method` on the receiving side.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeEnvelope {
    pub id: CallId,
    pub method: String,
    pub args: Vec<Value>,
}

/// The settled outcome of an earlier Invoke.
///
/// `payload` is a JSON document encoded as a string. `None` stands for a
/// missing value, which is what a script `undefined` turns into on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEnvelope {
    pub id: CallId,
    pub payload: Option<String>,
    pub is_error: bool,
}

impl ResultEnvelope {
    /// A successful result carrying `value`.
    pub fn ok<T: Serialize + ?Sized>(id: CallId, value: &T) -> Result<Self> {
        Ok(Self {
            id,
            payload: Some(encode_payload(value)?),
            is_error: false,
        })
    }

    /// A failed result carrying `error`.
    pub fn err(id: CallId, error: &RemoteError) -> Result<Self> {
        Ok(Self {
            id,
            payload: Some(error.to_payload()?),
            is_error: true,
        })
    }

    /// Decodes the payload into the value or error it carries.
    ///
    /// The outer `Result` fails only when a success payload is not valid JSON;
    /// error payloads are always turned into a [`RemoteError`].
    pub fn settle(&self) -> Result<std::result::Result<Value, RemoteError>> {
        if self.is_error {
            return Ok(Err(RemoteError::from_payload(self.payload.as_deref())));
        }
        Ok(Ok(decode_payload(self.payload.as_deref())?))
    }
}

/// A single message exchanged over the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Invoke(InvokeEnvelope),
    Result(ResultEnvelope),
}

impl Envelope {
    pub fn id(&self) -> &CallId {
        match self {
            Self::Invoke(invoke) => &invoke.id,
            Self::Result(result) => &result.id,
        }
    }

    /// Encodes the envelope as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an envelope from JSON bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_value(parse_message(bytes)?)
    }

    /// Decodes an envelope from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(frame) = value else {
            return Err(RpcError::ProtocolViolation("envelope is not an array".into()));
        };
        let [kind, body]: [Value; 2] = frame.try_into().map_err(|frame: Vec<Value>| {
            RpcError::ProtocolViolation(format!("envelope has {} elements, expected 2", frame.len()))
        })?;
        let kind = kind
            .as_u64()
            .ok_or_else(|| RpcError::ProtocolViolation("envelope kind is not an integer".into()))?;

        match kind {
            INVOKE => {
                let (id, method, args): (CallId, String, Vec<Value>) = serde_json::from_value(body)
                    .map_err(|e| RpcError::ProtocolViolation(format!("malformed invoke: {}", e)))?;
                Ok(Self::Invoke(InvokeEnvelope { id, method, args }))
            }
            RESULT => {
                let (id, payload, is_error): (CallId, Option<String>, bool) = serde_json::from_value(body)
                    .map_err(|e| RpcError::ProtocolViolation(format!("malformed result: {}", e)))?;
                Ok(Self::Result(ResultEnvelope { id, payload, is_error }))
            }
            other => Err(RpcError::UnknownKind(other)),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Invoke(invoke) => (INVOKE, (&invoke.id, &invoke.method, &invoke.args)).serialize(serializer),
            Self::Result(result) => (RESULT, (&result.id, &result.payload, result.is_error)).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Reads the id of an Invoke frame without validating the rest of it.
///
/// Lets a receiver answer a malformed call with an error instead of leaving the
/// caller waiting forever. Returns `None` for anything that is not
/// recognisably an Invoke frame with a string id.
pub fn decode_invoke_id(value: &Value) -> Option<CallId> {
    let frame = value.as_array()?;
    if frame.first()?.as_u64()? != INVOKE {
        return None;
    }
    let id = frame.get(1)?.as_array()?.first()?.as_str()?;
    Some(CallId::new(id))
}
