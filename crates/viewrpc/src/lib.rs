//! # ViewRPC
//!
//! The wire format spoken between a web page and the native host embedding it.
//!
//! ## Architecture
//!
//! Every message is an [`Envelope`], encoded as a positional JSON array:
//!
//! - Invoke: `[0, [id, method, [args...]]]`
//! - Result: `[1, [id, payload, isError]]`
//!
//! The result `payload` is itself a JSON document stored as a string inside the
//! envelope. The page-side script stringifies results before posting them, so the
//! double encoding is part of the protocol and must be kept as-is.
//!
//! This crate is synchronous and runtime-free. Correlation, pending calls and
//! execution live in `viewrun`.

mod envelope;
mod error;
mod payload;

pub use envelope::decode_invoke_id;
pub use envelope::CallId;
pub use envelope::Envelope;
pub use envelope::InvokeEnvelope;
pub use envelope::ResultEnvelope;
pub use envelope::INVOKE;
pub use envelope::RESULT;
pub use error::RemoteError;
pub use error::Result;
pub use error::RpcError;
pub use payload::decode_payload;
pub use payload::encode_args;
pub use payload::encode_payload;
pub use payload::parse_message;

#[cfg(test)]
mod tests;
