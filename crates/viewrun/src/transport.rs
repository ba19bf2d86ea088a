//! # Transport Abstraction
//!
//! A minimal interface to the host's native message channel.
//!
//! ## Philosophy
//!
//! - **Message-Oriented**: The Transport knows nothing about envelopes, ids or
//!   pending calls. It moves opaque JSON messages.
//! - **Fire-and-Forget**: `send` hands a message to the channel and returns.
//!   There is no delivery confirmation; replies show up later on `recv`.

use std::fmt;

/// Errors that occur at the channel layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The other end is gone or the channel was closed.
    ConnectionLost(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// The host's message channel between page and native side.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hands a message to the channel without waiting for the other side.
    ///
    /// # invariants
    /// - Must not block on the peer processing the message.
    /// - Should not interpret the payload content.
    fn send(&self, message: Vec<u8>) -> Result<()>;

    /// Waits for the next inbound message.
    ///
    /// Returns `Ok(None)` once the channel is closed for good.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}
