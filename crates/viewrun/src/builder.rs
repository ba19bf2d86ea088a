//! # Bridge Builder
//!
//! Provides a fluent API for configuring a bridge before it starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::api::Api;
use crate::bridge::Bridge;
use crate::bridge::Error;
use crate::bridge::Result;
use crate::id::IdGenerator;
use crate::id::UuidGenerator;
use crate::transport::Transport;

/// Settings for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Used in log events to tell bridges apart.
    pub name: String,
    /// Name of the readiness notification.
    pub ready_event: String,
    /// How long [`ScriptLoader`](crate::loader::ScriptLoader) waits for a script.
    /// `None` waits forever.
    pub load_timeout: Option<Duration>,
}

impl Config {
    pub const DEFAULT_READY_EVENT: &'static str = "webviewready";
    pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "bridge".to_string(),
            ready_event: Self::DEFAULT_READY_EVENT.to_string(),
            load_timeout: Some(Self::DEFAULT_LOAD_TIMEOUT),
        }
    }
}

/// Fluent builder for [`Bridge`].
pub struct BridgeBuilder {
    transport: Arc<dyn Transport>,
    api: Api,
    ids: Box<dyn IdGenerator>,
    config: Config,
    runtime: Option<Handle>,
}

impl BridgeBuilder {
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            api: Api::new(),
            ids: Box::new(UuidGenerator),
            config: Config::default(),
            runtime: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// The functions this side exposes to the other side.
    pub fn api(mut self, api: Api) -> Self {
        self.api = api;
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn ready_event(mut self, event: impl Into<String>) -> Self {
        self.config.ready_event = event.into();
        self
    }

    pub fn load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.load_timeout = timeout;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Runtime used for inbound call execution and the pump.
    ///
    /// Defaults to the runtime `build()` is called from. Set it explicitly when
    /// messages are delivered from a thread outside any runtime, such as a
    /// native UI thread.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<Bridge> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| Error::NoRuntime)?,
        };
        Ok(Bridge::from_parts(self.config, self.transport, self.api, self.ids, runtime))
    }
}
