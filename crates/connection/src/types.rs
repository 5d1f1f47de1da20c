//! Public types for the connection manager.

use std::fmt;
use std::time::Duration;

use medialink_protocol::constants::{
    HEARTBEAT_INTERVAL, RECONNECT_BASE_INTERVAL, RECONNECT_MAX_INTERVAL, WS_MAX_MESSAGE_SIZE,
    WS_WRITE_BUFFER,
};

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket. A reconnect may be pending.
    Disconnected,
    /// WebSocket handshake in progress.
    Connecting,
    /// Socket open; sends are transmitted.
    Connected,
    /// Shut down. Terminal.
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection moved to a new state.
    StateChanged(ConnectionState),
    /// A reconnect was scheduled.
    Reconnecting {
        /// Attempts scheduled since the last successful open (1-based).
        attempt: u32,
        /// Delay before the attempt starts.
        delay: Duration,
    },
    /// The manager shut down. Always the last event; delivery waits up to a
    /// second for room in the channel.
    Shutdown,
}

/// Configuration for automatic reconnection with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub base_interval: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_interval: RECONNECT_BASE_INTERVAL,
            max_interval: RECONNECT_MAX_INTERVAL,
        }
    }
}

impl ReconnectConfig {
    /// Delay for a 0-based attempt number: `min(base * 2^attempt, max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_interval.checked_mul(factor))
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }
}

/// Connection manager configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub url: String,
    pub reconnect: ReconnectConfig,
    /// Heartbeat probe period while the socket is idle.
    pub heartbeat_interval: Duration,
    /// Treat the socket as dead after this long without inbound traffic.
    /// Disabled by default: only transport close/error events trigger a
    /// reconnect.
    pub idle_timeout: Option<Duration>,
    /// Give up on a handshake after this long.
    pub connect_timeout: Duration,
    /// Inbound text frames above this size are dropped.
    pub max_message_size: usize,
    /// Outbound frames that may be queued before sends are refused.
    pub write_buffer: usize,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            idle_timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_message_size: WS_MAX_MESSAGE_SIZE,
            write_buffer: WS_WRITE_BUFFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
        assert!(ConnectionState::Connected.is_open());
        assert!(!ConnectionState::Connecting.is_open());
    }

    #[test]
    fn reconnect_config_defaults() {
        let config = ReconnectConfig::default();
        assert_eq!(config.base_interval, Duration::from_millis(1000));
        assert_eq!(config.max_interval, Duration::from_millis(10_000));
    }

    #[test]
    fn reconnect_config_delay_backoff() {
        let config = ReconnectConfig::default();
        let expected_ms = [1000, 2000, 4000, 8000, 10_000, 10_000, 10_000];
        for (attempt, &ms) in expected_ms.iter().enumerate() {
            assert_eq!(
                config.delay_for_attempt(attempt as u32),
                Duration::from_millis(ms),
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn reconnect_config_delay_saturates() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(31), config.max_interval);
        assert_eq!(config.delay_for_attempt(32), config.max_interval);
        assert_eq!(config.delay_for_attempt(u32::MAX), config.max_interval);
    }

    #[test]
    fn reconnect_config_matches_formula() {
        let config = ReconnectConfig {
            base_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(15),
        };
        for n in 0..40u32 {
            let uncapped = 250u128.saturating_mul(1u128 << n.min(100));
            let expected = uncapped.min(15_000);
            assert_eq!(config.delay_for_attempt(n).as_millis(), expected, "attempt {n}");
        }
    }

    #[test]
    fn base_above_max_is_capped() {
        let config = ReconnectConfig {
            base_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(5),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(5));
    }

    #[test]
    fn connection_config_defaults() {
        let config = ConnectionConfig::new("ws://localhost:8096/ws");
        assert_eq!(config.url, "ws://localhost:8096/ws");
        assert_eq!(config.heartbeat_interval, HEARTBEAT_INTERVAL);
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }
}
