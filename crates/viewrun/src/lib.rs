//! # ViewRun
//!
//! Bidirectional RPC between a web page and its native host, over whatever
//! message channel the host provides.
//!
//! A [`Bridge`] lets this side call functions on the other side as futures and
//! answers calls coming the other way from a local [`Api`]. Wire details live in
//! the `viewrpc` crate.

pub mod api;
pub mod bridge;
pub mod builder;
pub mod id;
pub mod loader;
pub mod logging;
pub mod mock_transport;
pub mod ready;
pub mod remote;
pub mod transport;

pub use api::Api;
pub use api::Handler;
pub use bridge::Bridge;
pub use bridge::Response;
pub use builder::BridgeBuilder;
pub use builder::Config;
pub use id::IdGenerator;
pub use id::UuidGenerator;
pub use loader::ScriptLoader;
pub use ready::Ready;
pub use remote::RemoteMethod;
pub use transport::Transport;
pub use viewrpc::CallId;
pub use viewrpc::RemoteError;
