//! The connection driver task.
//!
//! One driver owns the whole connection lifecycle: the state machine, the
//! backoff counter, the heartbeat and reconnect deadlines and the current
//! socket handle. Socket pumps and the public handle talk to it over
//! channels, so every state change happens serially on this task.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use medialink_event_bus::EventBus;
use medialink_protocol::{ClientMessage, Frame};

use crate::heartbeat::{Beat, HeartbeatMonitor};
use crate::reconnection::{Backoff, ReconnectTimer};
use crate::state::Transition;
use crate::types::{ConnectionConfig, ConnectionEvent, ConnectionState};
use crate::ws_client::{ConnectionError, SocketEvent, SocketSignal, WsClient};

/// Capacity of the pump-to-driver channel.
const SOCKET_EVENTS_BUFFER: usize = 64;

/// How long shutdown waits for room to deliver the final event.
const SHUTDOWN_EVENT_GRACE: Duration = Duration::from_secs(1);

/// State shared between the driver and the public handle.
#[derive(Debug)]
pub(crate) struct Shared {
    /// Write side of the open socket. `None` unless connected.
    link: Mutex<Option<mpsc::Sender<tungstenite::Message>>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            link: Mutex::new(None),
            state_tx,
        }
    }

    fn link(&self) -> MutexGuard<'_, Option<mpsc::Sender<tungstenite::Message>>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_link(&self, link: Option<mpsc::Sender<tungstenite::Message>>) {
        *self.link() = link;
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Hands `message` to the open socket. Returns `false` (and logs) when
    /// the socket is not open or its write buffer is full.
    pub(crate) fn send(&self, message: &ClientMessage) -> bool {
        let Some(tx) = self.link().clone() else {
            warn!(
                message_type = message.message_type.as_str(),
                "socket not open, dropping message"
            );
            return false;
        };

        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    message_type = message.message_type.as_str(),
                    "failed to serialize message: {e}"
                );
                return false;
            }
        };

        match tx.try_send(tungstenite::Message::Text(json.into())) {
            Ok(()) => {
                trace!(message_type = message.message_type.as_str(), "message queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    message_type = message.message_type.as_str(),
                    "write buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    message_type = message.message_type.as_str(),
                    "socket closing, dropping message"
                );
                false
            }
        }
    }
}

/// Requests from the public handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Connect,
}

pub(crate) struct Driver {
    config: ConnectionConfig,
    bus: EventBus,
    shared: Arc<Shared>,
    events_tx: mpsc::Sender<ConnectionEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,

    state: ConnectionState,
    backoff: Backoff,
    heartbeat: HeartbeatMonitor,
    reconnect: ReconnectTimer,
    client: Option<WsClient>,
    generation: u64,
    socket_tx: mpsc::Sender<SocketSignal>,
    socket_rx: mpsc::Receiver<SocketSignal>,
}

impl Driver {
    pub(crate) fn new(
        config: ConnectionConfig,
        bus: EventBus,
        shared: Arc<Shared>,
        events_tx: mpsc::Sender<ConnectionEvent>,
        commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) -> Self {
        let (socket_tx, socket_rx) = mpsc::channel(SOCKET_EVENTS_BUFFER);
        Self {
            backoff: Backoff::new(config.reconnect.clone()),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval, config.idle_timeout),
            config,
            bus,
            shared,
            events_tx,
            commands,
            cancel,
            state: ConnectionState::Disconnected,
            reconnect: ReconnectTimer::default(),
            client: None,
            generation: 0,
            socket_tx,
            socket_rx,
        }
    }

    /// Runs until cancelled or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!(url = %self.config.url, "connection driver started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Connect) => self.connect().await,
                    None => break,
                },
                Some(signal) = self.socket_rx.recv() => self.on_socket(signal),
                beat = self.heartbeat.next() => self.on_beat(beat),
                () = self.reconnect.elapsed() => {
                    debug!(attempt = self.backoff.attempt(), "reconnect timer fired");
                    self.connect().await;
                }
            }
        }
        self.finish().await;
    }

    /// Discards the current socket and any pending reconnect, then opens a
    /// fresh socket.
    async fn connect(&mut self) {
        self.reconnect.cancel();
        self.heartbeat.stop();
        self.drop_client();
        self.generation += 1;
        self.transition(Transition::Connect);

        info!(url = %self.config.url, generation = self.generation, "connecting");
        let attempt = WsClient::connect(&self.config, self.generation, self.socket_tx.clone());
        let result = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = attempt => result,
        };

        match result {
            Ok(client) => self.on_open(client),
            Err(e) => self.on_error(e),
        }
    }

    fn on_open(&mut self, client: WsClient) {
        self.shared.set_link(Some(client.sender()));
        self.client = Some(client);
        self.backoff.reset();
        self.heartbeat.start();
        self.transition(Transition::Opened);
        info!(url = %self.config.url, generation = self.generation, "connected");
    }

    fn on_socket(&mut self, signal: SocketSignal) {
        let current = self.client.as_ref().map(WsClient::generation);
        if current != Some(signal.generation) {
            trace!(
                generation = signal.generation,
                ?current,
                "ignoring event from stale socket"
            );
            return;
        }

        match signal.event {
            SocketEvent::Text(text) => {
                self.heartbeat.reset();
                self.dispatch(&text);
            }
            SocketEvent::Traffic => self.heartbeat.reset(),
            SocketEvent::Closed { code } => {
                info!(generation = signal.generation, ?code, "connection closed");
                self.lose_connection(Transition::Closed);
            }
            SocketEvent::Error(e) => self.on_error(e),
        }
    }

    /// Publishes a text frame on the bus if it carries a notification.
    ///
    /// A panicking subscriber is contained here: the frame is lost but the
    /// socket and the reconnect loop carry on.
    fn dispatch(&self, text: &str) {
        match Frame::classify(text) {
            Frame::Notification(n) => {
                let publish =
                    AssertUnwindSafe(|| self.bus.publish(&n.notification_type, &n.payload));
                match catch_unwind(publish) {
                    Ok(delivered) => trace!(
                        notification_type = %n.notification_type,
                        delivered,
                        "notification published"
                    ),
                    Err(_) => warn!(
                        notification_type = %n.notification_type,
                        "notification subscriber panicked"
                    ),
                }
            }
            Frame::Unrecognized(_) => {
                debug!("dropping frame without notification shape");
            }
            Frame::Malformed(e) => {
                debug!("dropping undecodable frame: {e}");
            }
        }
    }

    fn on_beat(&mut self, beat: Beat) {
        match beat {
            Beat::Tick => {
                if !self.state.is_open() {
                    return;
                }
                match ClientMessage::ping() {
                    Ok(ping) => {
                        self.shared.send(&ping);
                    }
                    Err(e) => warn!("failed to build heartbeat probe: {e}"),
                }
            }
            Beat::IdleTimeout => {
                let idle = self.config.idle_timeout.unwrap_or_default();
                self.on_error(ConnectionError::IdleTimeout(idle));
            }
        }
    }

    /// Errors force the socket closed and take the close path.
    fn on_error(&mut self, error: ConnectionError) {
        warn!(generation = self.generation, "connection error: {error}");
        self.lose_connection(Transition::Failed);
    }

    fn lose_connection(&mut self, transition: Transition) {
        self.heartbeat.stop();
        self.drop_client();
        self.transition(transition);

        let delay = self.backoff.next_delay();
        let attempt = self.backoff.attempt();
        self.reconnect.schedule(delay);
        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnecting"
        );
        self.emit(ConnectionEvent::Reconnecting { attempt, delay });
    }

    fn drop_client(&mut self) {
        self.shared.set_link(None);
        self.client = None;
    }

    async fn finish(&mut self) {
        self.reconnect.cancel();
        self.heartbeat.stop();
        self.shared.set_link(None);
        if let Some(mut client) = self.client.take() {
            client.close().await;
        }
        self.transition(Transition::Shutdown);

        // Unlike other events, wait briefly for a slow consumer.
        let sent = tokio::time::timeout(
            SHUTDOWN_EVENT_GRACE,
            self.events_tx.send(ConnectionEvent::Shutdown),
        )
        .await;
        if !matches!(sent, Ok(Ok(()))) {
            debug!("event receiver not draining, shutdown event dropped");
        }
        info!(url = %self.config.url, "connection manager shut down");
    }

    fn transition(&mut self, transition: Transition) {
        match self.state.apply(transition) {
            Ok(next) if next == self.state => {}
            Ok(next) => {
                debug!(from = %self.state, to = %next, "state changed");
                self.state = next;
                self.shared.state_tx.send_replace(next);
                self.emit(ConnectionEvent::StateChanged(next));
            }
            Err(e) => debug!("{e}"),
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events_tx.try_send(event) {
            debug!(?event, "event channel full, dropping event");
        }
    }
}
