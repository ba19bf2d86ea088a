//! # Exposed API
//!
//! The table of local functions the other side of the bridge may call.
//!
//! The table is assembled once, before the bridge is built, and is read-only
//! afterwards. Lookups that miss produce a `MethodNotFound` error for the
//! caller instead of being dropped.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use viewrpc::RemoteError;

use crate::remote::RemoteMethod;

/// What a handler settles to: a JSON value, or an error for the caller.
pub type HandlerResult = std::result::Result<Value, RemoteError>;

/// A locally exposed callable.
///
/// Receives the positional arguments of the Invoke frame as sent.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: Vec<Value>) -> HandlerResult;
}

/// Adapts a typed async closure to [`Handler`].
struct FnHandler<F, A, Fut, R, E> {
    f: F,
    _marker: PhantomData<fn(A) -> (Fut, R, E)>,
}

#[async_trait::async_trait]
impl<F, A, Fut, R, E> Handler for FnHandler<F, A, Fut, R, E>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    A: DeserializeOwned + Send + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<RemoteError> + Send + 'static,
{
    async fn call(&self, args: Vec<Value>) -> HandlerResult {
        let args: A = decode_args(args)?;
        let output = (self.f)(args).await.map_err(Into::into)?;
        serde_json::to_value(output).map_err(|e| RemoteError::serialization(e.to_string()))
    }
}

/// Rebuilds typed arguments from the positional list.
///
/// Tuples and sequences read the list directly; an empty list also satisfies
/// `()` and other types that accept `null`.
fn decode_args<A: DeserializeOwned>(args: Vec<Value>) -> std::result::Result<A, RemoteError> {
    if args.is_empty() {
        if let Ok(unit) = serde_json::from_value(Value::Null) {
            return Ok(unit);
        }
    }
    serde_json::from_value(Value::Array(args))
        .map_err(|e| RemoteError::type_error(format!("invalid arguments: {}", e)))
}

/// A registry of locally exposed functions, keyed by wire name.
#[derive(Clone, Default)]
pub struct Api {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Api {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes an async closure under `name`.
    ///
    /// The closure takes its arguments as one deserializable value, typically a
    /// tuple matching the positional arguments:
    ///
    /// ```
    /// use viewrun::Api;
    /// use viewrun::RemoteError;
    ///
    /// let api = Api::new().expose("add", |(a, b): (i64, i64)| async move {
    ///     Ok::<_, RemoteError>(a + b)
    /// });
    /// assert!(api.contains("add"));
    /// ```
    ///
    /// Registering a name twice replaces the earlier handler.
    pub fn expose<F, A, Fut, R, E>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        A: DeserializeOwned + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Serialize + Send + 'static,
        E: Into<RemoteError> + Send + 'static,
    {
        self.expose_handler(name, FnHandler { f, _marker: PhantomData })
    }

    /// Exposes a declared [`RemoteMethod`], checking the closure against its signature.
    pub fn implement<M, F, Fut, E>(self, f: F) -> Self
    where
        M: RemoteMethod,
        M::Args: DeserializeOwned + Send + 'static,
        M::Output: Serialize + Send + 'static,
        F: Fn(M::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<M::Output, E>> + Send + 'static,
        E: Into<RemoteError> + Send + 'static,
    {
        self.expose(M::NAME, f)
    }

    /// Exposes a hand-written [`Handler`] that works on raw JSON arguments.
    pub fn expose_handler(mut self, name: impl Into<String>, handler: impl Handler) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered under `method`.
    pub async fn dispatch(&self, method: &str, args: Vec<Value>) -> HandlerResult {
        let Some(handler) = self.handlers.get(method) else {
            return Err(RemoteError::method_not_found(method));
        };
        handler.call(args).await
    }
}
