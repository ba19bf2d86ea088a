//! Fire-once readiness notification.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// A named, payload-free signal that fires at most once.
///
/// Clones share the same signal. Waiting after it fired returns immediately.
#[derive(Clone, Debug)]
pub struct Ready {
    event: Arc<str>,
    tx: Arc<watch::Sender<bool>>,
}

impl Ready {
    pub fn new(event: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            event: Arc::from(event.into()),
            tx: Arc::new(tx),
        }
    }

    /// The event name announced to listeners.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Fires the signal. Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        let fired = self.tx.send_if_modified(|ready| {
            if *ready {
                return false;
            }
            *ready = true;
            true
        });
        if fired {
            info!(event = %self.event, "bridge ready");
        }
        fired
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fires_once() {
        let ready = Ready::new("webviewready");
        assert!(!ready.is_ready());
        assert!(ready.fire());
        assert!(!ready.fire());
        assert!(ready.is_ready());
    }

    #[tokio::test]
    async fn test_wait_after_fire_returns() {
        let ready = Ready::new("webviewready");
        ready.fire();
        tokio::time::timeout(Duration::from_millis(100), ready.wait())
            .await
            .expect("wait should not block once fired");
    }

    #[tokio::test]
    async fn test_wait_wakes_on_fire() {
        let ready = Ready::new("webviewready");
        let waiter = {
            let ready = ready.clone();
            tokio::spawn(async move { ready.wait().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        ready.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
    }
}
