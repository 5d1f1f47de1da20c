use tokio::sync::mpsc;

use crate::subscription::Subscription;

/// Channel-backed subscription, for consumers that prefer to `await`
/// events instead of handling them in a callback.
///
/// Dropping the stream unsubscribes it.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<serde_json::Value>,
    subscription: Subscription,
}

impl EventStream {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<serde_json::Value>,
        subscription: Subscription,
    ) -> Self {
        Self { rx, subscription }
    }

    /// Event key this stream listens on.
    pub fn key(&self) -> &str {
        self.subscription.key()
    }

    /// Waits for the next payload. Returns `None` once the bus is gone and
    /// every buffered payload has been received.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        self.rx.recv().await
    }

    /// Returns a buffered payload without waiting.
    pub fn try_recv(&mut self) -> Option<serde_json::Value> {
        self.rx.try_recv().ok()
    }
}
