//! Application orchestrator: wires the event bus, the connection manager
//! and the notification log together.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

use medialink_connection::{ConnectionEvent, ConnectionManager};
use medialink_event_bus::{EventBus, Subscription};
use medialink_protocol::NotificationType;
use medialink_protocol::messages::{LibraryScanProgress, MediaChanged, PlaybackSeek};

use crate::config::Config;

/// Runs the client until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let bus = EventBus::new();

    // -- Notification log --
    let subscriptions: Vec<Subscription> = config
        .subscribe
        .iter()
        .map(|key| {
            let kind = key.clone();
            bus.subscribe(key.clone(), move |payload| {
                tracing::info!(notification_type = %kind, "{}", describe(&kind, payload));
            })
        })
        .collect();
    tracing::debug!(keys = ?bus.keys(), "notification log subscribed");

    // -- Connection --
    let manager = ConnectionManager::spawn(config.connection(), bus.clone());
    let mut events = manager
        .take_events()
        .await
        .context("connection events already taken")?;

    let status = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ConnectionEvent::StateChanged(state) => {
                    tracing::info!(%state, "connection state changed");
                }
                ConnectionEvent::Reconnecting { attempt, delay } => {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retry scheduled");
                }
                ConnectionEvent::Shutdown => break,
            }
        }
    });

    manager.connect();
    tracing::info!(url = manager.url(), "client running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested");

    manager.shutdown().await;
    if let Err(e) = status.await {
        tracing::warn!("status task failed: {e}");
    }
    drop(subscriptions);
    Ok(())
}

/// One-line, human-readable summary of a notification.
fn describe(kind: &str, payload: &Value) -> String {
    let summary = match NotificationType::from_wire(kind) {
        NotificationType::LibraryScanStarted => parse::<LibraryScanProgress>(payload)
            .map(|scan| format!("library {} scan started", scan.library_id)),
        NotificationType::LibraryScanProgress => {
            parse::<LibraryScanProgress>(payload).map(|scan| match (scan.total, scan.ratio()) {
                (Some(total), Some(ratio)) => format!(
                    "library {} scanned {}/{} ({:.0}%)",
                    scan.library_id,
                    scan.scanned,
                    total,
                    ratio * 100.0
                ),
                _ => format!("library {} scanned {}", scan.library_id, scan.scanned),
            })
        }
        NotificationType::LibraryScanCompleted => parse::<LibraryScanProgress>(payload)
            .map(|scan| format!("library {} scan completed", scan.library_id)),
        kind @ (NotificationType::MediaAdded
        | NotificationType::MediaUpdated
        | NotificationType::MediaRemoved) => parse::<MediaChanged>(payload).map(|media| {
            let verb = match kind {
                NotificationType::MediaAdded => "added",
                NotificationType::MediaUpdated => "updated",
                _ => "removed",
            };
            match media.title {
                Some(title) => format!(
                    "{} \"{}\" {} in library {}",
                    media.media_id, title, verb, media.library_id
                ),
                None => format!("{} {} in library {}", media.media_id, verb, media.library_id),
            }
        }),
        NotificationType::PlaybackSeek => parse::<PlaybackSeek>(payload)
            .map(|seek| format!("playback of {} moved to {}ms", seek.media_id, seek.position_ms)),
        NotificationType::Unknown => None,
    };
    summary.unwrap_or_else(|| payload.to_string())
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Option<T> {
    T::deserialize(payload).ok()
}
