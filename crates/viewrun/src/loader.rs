//! # Script Loader
//!
//! Asks the page to fetch and run an external script, resolving once the page
//! reports it loaded. Unlike the page helper it drives, the loader gives up
//! after the configured timeout instead of waiting forever on a script that
//! failed to load.

use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::bridge;
use crate::bridge::Bridge;

crate::remote_methods! {
    /// Page-side helper: appends a `<script>` element and resolves on `load`.
    pub FetchScript = "webview._fetchJs"(String) -> serde_json::Value;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The page did not report the script loaded in time.
    Timeout { url: String, after: Duration },
    /// The call itself failed.
    Bridge(bridge::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { url, after } => write!(f, "Script '{}' did not load within {:?}", url, after),
            Self::Bridge(e) => write!(f, "Script load failed: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bridge(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bridge::Error> for LoadError {
    fn from(e: bridge::Error) -> Self {
        Self::Bridge(e)
    }
}

/// One-shot, non-retrying script loading through a bridge.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    bridge: Bridge,
    timeout: Option<Duration>,
}

impl ScriptLoader {
    /// A loader using the bridge's configured load timeout.
    pub fn new(bridge: &Bridge) -> Self {
        Self {
            bridge: bridge.clone(),
            timeout: bridge.config().load_timeout,
        }
    }

    /// Overrides the timeout. `None` waits for as long as the page takes.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn load(&self, url: &str) -> Result<(), LoadError> {
        debug!(bridge = %self.bridge.name(), url, "loading script");
        let response = self.bridge.call::<FetchScript>((url.to_string(),));

        let Some(after) = self.timeout else {
            response.await?;
            return Ok(());
        };

        match tokio::time::timeout(after, response).await {
            Ok(outcome) => {
                outcome?;
                Ok(())
            }
            Err(_) => {
                warn!(bridge = %self.bridge.name(), url, ?after, "script load timed out");
                Err(LoadError::Timeout { url: url.to_string(), after })
            }
        }
    }
}
