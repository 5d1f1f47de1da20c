use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client payloads
// ---------------------------------------------------------------------------

/// Body of a heartbeat probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingPayload {
    /// Milliseconds since the Unix epoch when the probe was built.
    pub timestamp: i64,
}

impl PingPayload {
    pub fn now() -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Seeks the active playback session of a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeekRequest {
    pub media_id: String,
    pub position_ms: u64,
}

// ---------------------------------------------------------------------------
// Notification payloads
// ---------------------------------------------------------------------------

/// Progress of a library scan (`library_scan_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryScanProgress {
    pub library_id: String,
    #[serde(default)]
    pub scanned: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl LibraryScanProgress {
    /// Completion ratio in `[0.0, 1.0]`, when the total is known.
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.scanned as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// A media item was added, updated or removed (`media_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaChanged {
    pub library_id: String,
    pub media_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Another client moved a shared playback session (`playback_seek`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSeek {
    pub media_id: String,
    pub position_ms: u64,
}
