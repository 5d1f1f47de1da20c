//! One WebSocket socket handle.
//!
//! A [`WsClient`] owns the read and write pumps of a single socket. The
//! manager replaces the whole handle on every reconnect; dropping it aborts
//! both pumps, so a superseded socket can no longer deliver events.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::ConnectionConfig;

/// How long a graceful close waits for the close frame to be written.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Transport limit as a multiple of `max_message_size`. Text between the two
/// reaches the read pump and is dropped there; frames above it fail the socket.
const TRANSPORT_LIMIT_FACTOR: usize = 4;

/// Errors from a socket. Logged by the manager, never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("handshake timed out")]
    Timeout,

    #[error("no inbound traffic for {0:?}")]
    IdleTimeout(Duration),
}

/// Something that happened on a socket, reported by its pumps.
#[derive(Debug)]
pub(crate) enum SocketEvent {
    /// A text frame.
    Text(String),
    /// Any other inbound frame (binary, ping, pong, oversized text).
    Traffic,
    /// The peer closed the socket, or the stream ended.
    Closed { code: Option<u16> },
    /// Reading or writing failed.
    Error(ConnectionError),
}

/// A [`SocketEvent`] tagged with the generation of the socket it came from.
#[derive(Debug)]
pub(crate) struct SocketSignal {
    pub(crate) generation: u64,
    pub(crate) event: SocketEvent,
}

/// Forwards an event to the manager. Returns `false` once the manager is gone.
pub(crate) async fn forward(
    events_tx: &mpsc::Sender<SocketSignal>,
    generation: u64,
    event: SocketEvent,
) -> bool {
    events_tx
        .send(SocketSignal { generation, event })
        .await
        .is_ok()
}

/// Handle to one open WebSocket.
pub(crate) struct WsClient {
    generation: u64,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
    read_handle: JoinHandle<()>,
    write_handle: JoinHandle<()>,
}

impl WsClient {
    /// Opens a socket to `config.url` and starts its pumps.
    ///
    /// Events from the new socket are tagged with `generation`.
    pub(crate) async fn connect(
        config: &ConnectionConfig,
        generation: u64,
        events_tx: mpsc::Sender<SocketSignal>,
    ) -> Result<Self, ConnectionError> {
        let connecting = tokio_tungstenite::connect_async_with_config(
            config.url.as_str(),
            Some(transport_config(config)),
            false,
        );
        let (ws_stream, _) = tokio::time::timeout(config.connect_timeout, connecting)
            .await
            .map_err(|_| ConnectionError::Timeout)??;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) =
            mpsc::channel::<tungstenite::Message>(config.write_buffer.max(1));
        let cancel = CancellationToken::new();

        let write_handle = {
            let events_tx = events_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(
                write, write_rx, generation, events_tx, cancel,
            ))
        };

        let read_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read,
                generation,
                config.max_message_size,
                events_tx,
                write_tx,
                cancel,
            ))
        };

        debug!(generation, url = %config.url, "socket opened");
        Ok(Self {
            generation,
            write_tx,
            cancel,
            read_handle,
            write_handle,
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Sender feeding this socket's write pump.
    pub(crate) fn sender(&self) -> mpsc::Sender<tungstenite::Message> {
        self.write_tx.clone()
    }

    /// Gracefully closes the socket: the write pump sends a close frame
    /// before exiting.
    pub(crate) async fn close(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        let _ = tokio::time::timeout(CLOSE_GRACE, &mut self.write_handle).await;
    }
}

/// Frame and message limits for the tungstenite transport.
fn transport_config(config: &ConnectionConfig) -> WebSocketConfig {
    let limit = config
        .max_message_size
        .saturating_mul(TRANSPORT_LIMIT_FACTOR);
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(limit);
    ws_config.max_frame_size = Some(limit);
    ws_config
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        self.write_handle.abort();
    }
}
