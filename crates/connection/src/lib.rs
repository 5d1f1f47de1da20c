//! Reconnecting WebSocket connection manager for medialink clients.
//!
//! Keeps one socket to the server open, reconnects with capped exponential
//! backoff when it drops, sends heartbeat probes while connected, and
//! publishes inbound notifications on an [`medialink_event_bus::EventBus`].

mod driver;
mod heartbeat;
pub mod manager;
mod pumps;
pub(crate) mod reconnection;
pub mod state;
pub mod types;
mod ws_client;

pub use manager::ConnectionManager;
pub use state::{InvalidTransition, Transition};
pub use types::{ConnectionConfig, ConnectionEvent, ConnectionState, ReconnectConfig};
pub use ws_client::ConnectionError;
