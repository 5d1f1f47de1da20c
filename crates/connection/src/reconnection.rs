//! Reconnection backoff and the single pending reconnect timer.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::ReconnectConfig;

/// Attempt counter producing capped exponential delays.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Attempts scheduled since the last reset.
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the delay for the current attempt, then counts it.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// At most one pending reconnect deadline.
///
/// Scheduling replaces the previous deadline, so superseded timers can never
/// fire.
#[derive(Debug, Default)]
pub(crate) struct ReconnectTimer {
    deadline: Option<Instant>,
}

impl ReconnectTimer {
    pub(crate) fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completes when the deadline passes; never completes while idle.
    ///
    /// Cancel-safe: the deadline is cleared only once it has fired.
    pub(crate) async fn elapsed(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
