//! # Bridge
//!
//! One end of the page/host RPC channel. A bridge plays both roles at once:
//!
//! - **Caller**: [`Bridge::invoke`] mints a correlation id, parks a pending
//!   completion under it, sends an Invoke frame and hands back a [`Response`].
//!   When the matching Result frame arrives the completion is removed and settled.
//! - **Callee**: Invoke frames from the other side run against the local
//!   [`Api`] and are answered with exactly one Result frame, success or not.
//!
//! Inbound messages reach the bridge either through [`Bridge::listen`], which
//! pumps [`Transport::recv`], or by the host calling [`Bridge::deliver`] from
//! its own message callback.
//!
//! ## Invariants
//!
//! - An id maps to at most one pending call; it is inserted on dispatch and
//!   removed exactly once when its result arrives.
//! - A Result frame for an unknown id is dropped and counted, never raised.
//! - Every Invoke frame with a readable id gets exactly one Result frame.
//! - There is no call timeout or cancellation. A call whose result never
//!   arrives stays pending until the transport closes.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::warn;
use viewrpc::CallId;
use viewrpc::Envelope;
use viewrpc::InvokeEnvelope;
use viewrpc::RemoteError;
use viewrpc::ResultEnvelope;
use viewrpc::RpcError;

use crate::api::Api;
use crate::api::HandlerResult;
use crate::builder::BridgeBuilder;
use crate::builder::Config;
use crate::id::IdGenerator;
use crate::ready::Ready;
use crate::remote::RemoteMethod;
use crate::transport;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The channel refused a message or closed underneath a pending call.
    Transport(transport::Error),
    /// Arguments or results could not be encoded, or a frame was malformed.
    Rpc(RpcError),
    /// The remote function raised.
    Remote(RemoteError),
    /// The bridge went away before the call settled.
    ChannelClosed,
    /// No tokio runtime was available to run the bridge on.
    NoRuntime,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Rpc(e) => write!(f, "RPC error: {}", e),
            Self::Remote(e) => write!(f, "Remote failure: {}", e),
            Self::ChannelClosed => write!(f, "Response channel closed"),
            Self::NoRuntime => write!(f, "No tokio runtime available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Rpc(e) => Some(e),
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Completion handle for an outstanding call.
struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Value>>,
}

/// A bridge endpoint. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: Config,
    transport: Arc<dyn Transport>,
    api: Arc<Api>,
    ids: Box<dyn IdGenerator>,
    pending: DashMap<CallId, PendingCall>,
    orphans: AtomicU64,
    ready: Ready,
    runtime: Handle,
}

impl Bridge {
    /// Creates a bridge with default settings on the current tokio runtime.
    pub fn new(transport: impl Transport, api: Api) -> Result<Self> {
        Self::builder(transport).api(api).build()
    }

    pub fn builder(transport: impl Transport) -> BridgeBuilder {
        BridgeBuilder::new(transport)
    }

    pub(crate) fn from_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        api: Api,
        ids: Box<dyn IdGenerator>,
        runtime: Handle,
    ) -> Self {
        let ready = Ready::new(config.ready_event.clone());
        Self {
            inner: Arc::new(BridgeInner {
                config,
                transport,
                api: Arc::new(api),
                ids,
                pending: DashMap::new(),
                orphans: AtomicU64::new(0),
                ready,
                runtime,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The readiness signal of this bridge.
    pub fn ready(&self) -> Ready {
        self.inner.ready.clone()
    }

    /// Announces readiness. Only needed for hosts that push messages through
    /// [`Bridge::deliver`] instead of calling [`Bridge::listen`].
    ///
    /// Returns `false` if the signal had already fired.
    pub fn mark_ready(&self) -> bool {
        self.inner.ready.fire()
    }

    /// Number of calls still waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of Result frames dropped because no call was waiting for them.
    pub fn orphan_count(&self) -> u64 {
        self.inner.orphans.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    //  Caller side
    // ------------------------------------------------------------------

    /// Calls `method` on the other side with positional `args`.
    ///
    /// The Invoke frame is sent before this returns; the returned future only
    /// waits for the result. Encoding and send failures are reported through
    /// the future as well, never by panicking here.
    ///
    /// `args` must encode to a JSON list and is usually a tuple:
    /// `bridge.invoke("add", &(2, 3))`. `&()` sends no arguments. A single
    /// `null` or list argument needs a one-element tuple, `&(value,)`, since a
    /// bare `null` means no arguments and a bare list is spread. Anything else,
    /// such as an object or a number, fails with [`RpcError::Serialization`].
    pub fn invoke<A: Serialize + ?Sized>(&self, method: &str, args: &A) -> Response<Value> {
        match viewrpc::encode_args(args) {
            Ok(args) => self.dispatch(method, args),
            Err(e) => Response::failed(e.into()),
        }
    }

    /// Calls a declared [`RemoteMethod`] and decodes its output.
    pub fn call<M: RemoteMethod>(&self, args: M::Args) -> Response<M::Output> {
        match viewrpc::encode_args(&args) {
            Ok(args) => self.dispatch(M::NAME, args),
            Err(e) => Response::failed(e.into()),
        }
    }

    fn dispatch<T>(&self, method: &str, args: Vec<Value>) -> Response<T> {
        if method.is_empty() {
            return Response::failed(Error::Rpc(RpcError::ProtocolViolation("empty method name".into())));
        }

        let (tx, rx) = oneshot::channel();
        let id = self.register(PendingCall { method: method.to_string(), tx });

        let envelope = Envelope::Invoke(InvokeEnvelope {
            id: id.clone(),
            method: method.to_string(),
            args,
        });

        if let Err(e) = self.send(&envelope) {
            self.inner.pending.remove(&id);
            return Response::failed(e);
        }

        debug!(bridge = %self.name(), %id, method, "dispatched call");
        Response::waiting(id, rx)
    }

    /// Parks `call` under a fresh id that is not currently outstanding.
    fn register(&self, call: PendingCall) -> CallId {
        loop {
            let id = self.inner.ids.next();
            match self.inner.pending.entry(id) {
                Entry::Occupied(slot) => {
                    warn!(bridge = %self.name(), id = %slot.key(), "id generator repeated an outstanding id");
                }
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    slot.insert(call);
                    return id;
                }
            }
        }
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        let message = envelope.encode()?;
        self.inner.transport.send(message)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Inbound
    // ------------------------------------------------------------------

    /// Handles one inbound message from the transport.
    ///
    /// Malformed messages are returned as errors for the host to log. A
    /// malformed Invoke frame with a readable id is still answered with an
    /// error Result so the other side does not wait forever.
    pub fn deliver(&self, message: &[u8]) -> Result<()> {
        let value = viewrpc::parse_message(message)?;
        let invoke_id = viewrpc::decode_invoke_id(&value);

        match Envelope::from_value(value) {
            Ok(Envelope::Invoke(invoke)) => {
                self.on_invoke(invoke);
                Ok(())
            }
            Ok(Envelope::Result(result)) => {
                self.on_result(result);
                Ok(())
            }
            Err(e) => {
                if let Some(id) = invoke_id {
                    let answer = Err(RemoteError::type_error(e.to_string()));
                    if let Err(reply_error) = self.reply(id.clone(), answer) {
                        error!(bridge = %self.name(), %id, error = %reply_error, "failed to answer malformed call");
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Settles the pending call a Result frame belongs to.
    fn on_result(&self, result: ResultEnvelope) {
        let Some((id, pending)) = self.inner.pending.remove(&result.id) else {
            self.inner.orphans.fetch_add(1, Ordering::Relaxed);
            warn!(bridge = %self.name(), id = %result.id, "dropping result with no pending call");
            return;
        };

        let outcome = match result.settle() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(remote)) => Err(Error::Remote(remote)),
            Err(e) => Err(Error::Rpc(e)),
        };

        debug!(bridge = %self.name(), %id, method = %pending.method, is_error = result.is_error, "settled call");

        // The caller may have dropped its Response; nothing left to do then.
        let _ = pending.tx.send(outcome);
    }

    /// Runs an inbound call on the runtime and answers it once it settles.
    fn on_invoke(&self, invoke: InvokeEnvelope) {
        debug!(bridge = %self.name(), id = %invoke.id, method = %invoke.method, "executing call");

        let bridge = self.clone();
        self.inner.runtime.spawn(async move {
            let InvokeEnvelope { id, method, args } = invoke;
            let outcome = bridge.execute(method, args).await;
            if let Err(e) = bridge.reply(id.clone(), outcome) {
                error!(bridge = %bridge.name(), %id, error = %e, "failed to send result");
            }
        });
    }

    /// Runs the handler in its own task so a panic still produces an answer.
    async fn execute(&self, method: String, args: Vec<Value>) -> HandlerResult {
        let api = self.inner.api.clone();
        let task = tokio::spawn(async move { api.dispatch(&method, args).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(RemoteError::panic(panic_message(e.into_panic()))),
            Err(e) => Err(RemoteError::new("Cancelled", e.to_string())),
        }
    }

    fn reply(&self, id: CallId, outcome: HandlerResult) -> Result<()> {
        let result = match outcome {
            Ok(value) => ResultEnvelope::ok(id, &value)?,
            Err(remote) => ResultEnvelope::err(id, &remote)?,
        };
        self.send(&Envelope::Result(result))
    }

    // ------------------------------------------------------------------
    //  Pump
    // ------------------------------------------------------------------

    /// Spawns the task that feeds inbound messages to [`Bridge::deliver`],
    /// then fires the readiness signal.
    ///
    /// When the transport closes or fails, every outstanding call is rejected
    /// with the transport error and the task ends.
    pub fn listen(&self) -> JoinHandle<()> {
        let bridge = self.clone();
        let pump = self.inner.runtime.spawn(async move {
            let error = loop {
                match bridge.inner.transport.recv().await {
                    Ok(Some(message)) => {
                        if let Err(e) = bridge.deliver(&message) {
                            warn!(bridge = %bridge.name(), error = %e, "dropping malformed message");
                        }
                    }
                    Ok(None) => break transport::Error::ConnectionLost("Stream closed".into()),
                    Err(e) => {
                        error!(bridge = %bridge.name(), error = %e, "transport error in pump");
                        break e;
                    }
                }
            };

            bridge.fail_all(Error::Transport(error));
        });

        self.mark_ready();
        pump
    }

    /// Rejects every outstanding call with `error`.
    fn fail_all(&self, error: Error) {
        let ids: Vec<CallId> = self.inner.pending.iter().map(|e| e.key().clone()).collect();
        if !ids.is_empty() {
            warn!(bridge = %self.name(), count = ids.len(), error = %error, "rejecting outstanding calls");
        }
        for id in ids {
            if let Some((_, pending)) = self.inner.pending.remove(&id) {
                let _ = pending.tx.send(Err(error.clone()));
            }
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("name", &self.name())
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "handler panicked".to_string()
}

/// The eventual result of an outbound call.
///
/// Dropping a `Response` does not cancel anything: the remote side still runs
/// the call, and the late result is discarded when it arrives.
#[must_use = "the call is already sent; await the response to observe its result"]
pub struct Response<T = Value> {
    state: State,
    _output: PhantomData<fn() -> T>,
}

enum State {
    Failed(Option<Error>),
    Waiting {
        id: CallId,
        rx: oneshot::Receiver<Result<Value>>,
    },
}

impl<T> Response<T> {
    fn failed(error: Error) -> Self {
        Self {
            state: State::Failed(Some(error)),
            _output: PhantomData,
        }
    }

    fn waiting(id: CallId, rx: oneshot::Receiver<Result<Value>>) -> Self {
        Self {
            state: State::Waiting { id, rx },
            _output: PhantomData,
        }
    }

    /// The correlation id of the call, if it was sent.
    pub fn id(&self) -> Option<&CallId> {
        match &self.state {
            State::Waiting { id, .. } => Some(id),
            State::Failed(_) => None,
        }
    }
}

impl<T: DeserializeOwned> Future for Response<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = match &mut this.state {
            State::Failed(error) => Err(error.take().unwrap_or(Error::ChannelClosed)),
            State::Waiting { rx, .. } => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(outcome)) => outcome,
                Poll::Ready(Err(_)) => Err(Error::ChannelClosed),
            },
        };

        Poll::Ready(outcome.and_then(|value| {
            serde_json::from_value(value).map_err(|e| Error::Rpc(RpcError::from(e)))
        }))
    }
}
