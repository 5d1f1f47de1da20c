//! Public handle to the connection driver.
//!
//! [`ConnectionManager::spawn`] starts the driver task; the handle forwards
//! commands to it and exposes the state it publishes. Inbound
//! notifications are published on the [`EventBus`] handed to `spawn`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use medialink_event_bus::EventBus;
use medialink_protocol::messages::PlayerSeekRequest;
use medialink_protocol::{ClientMessage, MessageType};

use crate::driver::{Command, Driver, Shared};
use crate::types::{ConnectionConfig, ConnectionEvent, ConnectionState};

/// Capacity of the status event channel.
const EVENTS_BUFFER: usize = 64;

/// Owns one reconnecting WebSocket connection.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    events_rx: Mutex<Option<mpsc::Receiver<ConnectionEvent>>>,
    cancel: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
    bus: EventBus,
    url: String,
}

impl ConnectionManager {
    /// Starts the driver task in [`ConnectionState::Disconnected`].
    ///
    /// Must be called from within a Tokio runtime. Nothing is opened until
    /// [`connect`](Self::connect) is called.
    pub fn spawn(config: ConnectionConfig, bus: EventBus) -> Self {
        let shared = Arc::new(Shared::new());
        let (events_tx, events_rx) = mpsc::channel(EVENTS_BUFFER);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let url = config.url.clone();

        let driver = Driver::new(
            config,
            bus.clone(),
            Arc::clone(&shared),
            events_tx,
            commands_rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(driver.run());

        Self {
            shared,
            commands: commands_tx,
            events_rx: Mutex::new(Some(events_rx)),
            cancel,
            driver: Mutex::new(Some(handle)),
            bus,
            url,
        }
    }

    /// Bus that inbound notifications are published on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watch_state()
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Opens a fresh socket, discarding the current one and any pending
    /// reconnect.
    pub fn connect(&self) {
        if self.commands.send(Command::Connect).is_err() {
            warn!(url = %self.url, "connection manager is shut down, ignoring connect");
        }
    }

    /// Sends `message` if the socket is open.
    ///
    /// Messages are never queued across reconnects: while disconnected the
    /// message is dropped and logged. Returns whether it was handed to the
    /// socket.
    pub fn send(&self, message: &ClientMessage) -> bool {
        self.shared.send(message)
    }

    /// Builds a message from a typed payload and sends it.
    pub fn send_typed<T: Serialize>(&self, message_type: MessageType, payload: &T) -> bool {
        match ClientMessage::new(message_type, payload) {
            Ok(message) => self.send(&message),
            Err(e) => {
                warn!(
                    message_type = message_type.as_str(),
                    "failed to serialize payload: {e}"
                );
                false
            }
        }
    }

    /// Asks the server to move playback of `media_id` to `position_ms`.
    pub fn seek(&self, media_id: impl Into<String>, position_ms: u64) -> bool {
        let request = PlayerSeekRequest {
            media_id: media_id.into(),
            position_ms,
        };
        self.send_typed(MessageType::PlayerSeek, &request)
    }

    /// Closes the socket gracefully, cancels every timer and moves to
    /// [`ConnectionState::Closed`]. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let Some(handle) = self.driver.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            warn!(url = %self.url, "connection driver ended abnormally: {e}");
        }
        debug!(url = %self.url, "connection manager stopped");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
