//! In-memory transports for tests and demos.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tokio::sync::mpsc;
use viewrpc::Envelope;

use crate::transport;
use crate::transport::Transport;

/// A duplex channel transport using tokio mpsc channels.
///
/// Messages sent on one end appear on the other end's `recv()` and vice versa.
/// Dropping one end closes the other end's stream.
pub struct DuplexChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl DuplexChannelTransport {
    /// Creates a new transport from separate tx and rx channels.
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Creates a pair of transports connected to each other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (Self::new(tx_a, rx_b), Self::new(tx_b, rx_a))
    }
}

#[async_trait::async_trait]
impl Transport for DuplexChannelTransport {
    fn send(&self, message: Vec<u8>) -> transport::Result<()> {
        self.tx
            .send(message)
            .map_err(|_| transport::Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}

/// A transport that records everything sent through it.
///
/// Outbound messages are kept in order and can be read back as envelopes.
/// Inbound messages are whatever the test pushes with [`RecordingTransport::inject`].
#[derive(Clone)]
pub struct RecordingTransport {
    inner: Arc<RecordingInner>,
}

struct RecordingInner {
    sent_tx: mpsc::UnboundedSender<Vec<u8>>,
    sent_rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    inbox_tx: std::sync::Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    refuse: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(RecordingInner {
                sent_tx,
                sent_rx: Mutex::new(sent_rx),
                inbox_tx: std::sync::Mutex::new(Some(inbox_tx)),
                inbox_rx: Mutex::new(inbox_rx),
                refuse: AtomicBool::new(false),
            }),
        }
    }

    /// Makes every following `send` fail with `ConnectionLost`.
    pub fn refuse_sends(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Queues a message for the next `recv()`.
    pub fn inject(&self, message: impl Into<Vec<u8>>) {
        if let Ok(guard) = self.inner.inbox_tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(message.into());
            }
        }
    }

    /// Ends the inbound stream; `recv()` returns `None` once drained.
    pub fn close(&self) {
        if let Ok(mut guard) = self.inner.inbox_tx.lock() {
            guard.take();
        }
    }

    /// Waits for the next outbound message and decodes it.
    pub async fn next_sent(&self) -> Envelope {
        let bytes = self
            .inner
            .sent_rx
            .lock()
            .await
            .recv()
            .await
            .expect("recording channel closed");
        Envelope::decode(&bytes).expect("sent message is not an envelope")
    }

    /// Returns the next outbound message if one is already queued.
    pub async fn try_next_sent(&self) -> Option<Envelope> {
        let bytes = self.inner.sent_rx.lock().await.try_recv().ok()?;
        Some(Envelope::decode(&bytes).expect("sent message is not an envelope"))
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    fn send(&self, message: Vec<u8>) -> transport::Result<()> {
        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(transport::Error::ConnectionLost("refusing sends".into()));
        }
        self.inner
            .sent_tx
            .send(message)
            .map_err(|_| transport::Error::Io("recording channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.inner.inbox_rx.lock().await;
        Ok(rx.recv().await)
    }
}
