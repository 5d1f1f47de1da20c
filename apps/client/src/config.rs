//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - `$MEDIALINK_CONFIG`, when set
//! - Linux: `~/.config/medialink/client.toml`
//! - Windows: `%APPDATA%/medialink/client.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use medialink_connection::{ConnectionConfig, ReconnectConfig};
use medialink_protocol::NotificationType;

/// Environment variable overriding the configuration file location.
const CONFIG_ENV: &str = "MEDIALINK_CONFIG";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket endpoint of the media server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Heartbeat probe period in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Reconnect after this many seconds without inbound traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,

    /// Notification kinds to log.
    #[serde(default = "default_subscribe")]
    pub subscribe: Vec<String>,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8096/socket".into()
}

fn default_reconnect_base_ms() -> u64 {
    1000
}

fn default_reconnect_max_ms() -> u64 {
    10_000
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_subscribe() -> Vec<String> {
    NotificationType::KNOWN
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            heartbeat_secs: default_heartbeat_secs(),
            idle_timeout_secs: None,
            subscribe: default_subscribe(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`, owner-readable only.
    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Connection settings for the manager.
    pub fn connection(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.server_url.clone());
        config.reconnect = ReconnectConfig {
            base_interval: Duration::from_millis(self.reconnect_base_ms),
            max_interval: Duration::from_millis(self.reconnect_max_ms),
        };
        config.heartbeat_interval = Duration::from_secs(self.heartbeat_secs);
        config.idle_timeout = self.idle_timeout_secs.map(Duration::from_secs);
        config
    }
}

/// Returns the configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("medialink")
            .join("client.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("medialink").join("client.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/medialink/client.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "ws://127.0.0.1:8096/socket");
        assert_eq!(config.reconnect_base_ms, 1000);
        assert_eq!(config.reconnect_max_ms, 10_000);
        assert_eq!(config.heartbeat_secs, 30);
        assert!(config.idle_timeout_secs.is_none());
        assert_eq!(config.subscribe.len(), NotificationType::KNOWN.len());
        assert!(config.subscribe.iter().any(|k| k == "media_added"));
    }

    #[test]
    fn config_partial_toml() {
        // Only specify the URL, rest should use defaults.
        let toml_str = r#"server_url = "wss://media.example/socket""#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server_url, "wss://media.example/socket");
        assert_eq!(config.heartbeat_secs, 30);
        assert_eq!(config.subscribe, default_subscribe());
    }

    #[test]
    fn connection_settings_follow_config() {
        let config = Config {
            reconnect_base_ms: 250,
            reconnect_max_ms: 4000,
            heartbeat_secs: 5,
            idle_timeout_secs: Some(90),
            ..Config::default()
        };
        let conn = config.connection();
        assert_eq!(conn.url, config.server_url);
        assert_eq!(conn.reconnect.base_interval, Duration::from_millis(250));
        assert_eq!(conn.reconnect.max_interval, Duration::from_millis(4000));
        assert_eq!(conn.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(conn.idle_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("client.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn config_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.toml");

        let config = Config {
            server_url: "ws://10.0.0.5:8096/socket".into(),
            idle_timeout_secs: Some(120),
            subscribe: vec!["playback_seek".into()],
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.toml");
        std::fs::write(&path, "heartbeat_secs = \"soon\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
