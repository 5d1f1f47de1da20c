use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often a heartbeat probe is sent while the socket is idle.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before the first reconnection attempt.
pub const RECONNECT_BASE_INTERVAL: Duration = Duration::from_millis(1000);

/// Upper bound for the reconnection delay.
pub const RECONNECT_MAX_INTERVAL: Duration = Duration::from_millis(10_000);

/// Maximum inbound frame size in bytes (16 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Capacity of the outbound frame queue between the manager and the socket.
pub const WS_WRITE_BUFFER: usize = 256;

/// Field carrying the discriminant of an inbound server notification.
pub const NOTIFICATION_TYPE_FIELD: &str = "notification_type";

/// Field carrying the body of both message shapes.
pub const PAYLOAD_FIELD: &str = "payload";

/// Outbound (client to server) message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Heartbeat probe.
    #[serde(rename = "ping")]
    Ping,
    /// Moves the server-side playback session to a new position.
    #[serde(rename = "player_seek")]
    PlayerSeek,

    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}

impl MessageType {
    /// Wire name of the message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Ping => "ping",
            MessageType::PlayerSeek => "player_seek",
            MessageType::Unknown => "unknown",
        }
    }
}

/// Well-known inbound notification kinds.
///
/// Notifications are routed on the event bus by their raw wire name, so
/// kinds missing from this list still reach subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "library_scan_started")]
    LibraryScanStarted,
    #[serde(rename = "library_scan_progress")]
    LibraryScanProgress,
    #[serde(rename = "library_scan_completed")]
    LibraryScanCompleted,
    #[serde(rename = "media_added")]
    MediaAdded,
    #[serde(rename = "media_updated")]
    MediaUpdated,
    #[serde(rename = "media_removed")]
    MediaRemoved,
    #[serde(rename = "playback_seek")]
    PlaybackSeek,

    #[serde(other)]
    Unknown,
}

impl NotificationType {
    /// All known kinds, in declaration order.
    pub const KNOWN: [NotificationType; 7] = [
        NotificationType::LibraryScanStarted,
        NotificationType::LibraryScanProgress,
        NotificationType::LibraryScanCompleted,
        NotificationType::MediaAdded,
        NotificationType::MediaUpdated,
        NotificationType::MediaRemoved,
        NotificationType::PlaybackSeek,
    ];

    /// Wire name, also used as the event bus key.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LibraryScanStarted => "library_scan_started",
            NotificationType::LibraryScanProgress => "library_scan_progress",
            NotificationType::LibraryScanCompleted => "library_scan_completed",
            NotificationType::MediaAdded => "media_added",
            NotificationType::MediaUpdated => "media_updated",
            NotificationType::MediaRemoved => "media_removed",
            NotificationType::PlaybackSeek => "playback_seek",
            NotificationType::Unknown => "unknown",
        }
    }

    /// Maps a wire name to a known kind, [`NotificationType::Unknown`] otherwise.
    pub fn from_wire(name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .unwrap_or(NotificationType::Unknown)
    }
}
