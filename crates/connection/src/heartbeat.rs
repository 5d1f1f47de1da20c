//! Heartbeat monitor: periodic keepalive probes and the optional idle
//! deadline.
//!
//! The monitor owns plain deadlines rather than spawned timers. The driver
//! awaits [`HeartbeatMonitor::next`] inside its `select!` loop, so stopping
//! or resetting the monitor can never leave a stray timer behind.

use std::time::Duration;

use tokio::time::Instant;

/// Smallest accepted probe period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What the monitor woke up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Time to send a probe.
    Tick,
    /// No inbound traffic within the idle timeout.
    IdleTimeout,
}

#[derive(Debug)]
pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    idle_timeout: Option<Duration>,
    next_tick: Option<Instant>,
    idle_deadline: Option<Instant>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(interval: Duration, idle_timeout: Option<Duration>) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            idle_timeout,
            next_tick: None,
            idle_deadline: None,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Arms the probe interval (and the idle deadline, if configured).
    pub(crate) fn start(&mut self) {
        let now = Instant::now();
        self.next_tick = Some(now + self.interval);
        self.idle_deadline = self.idle_timeout.map(|t| now + t);
    }

    /// Restarts both deadlines from now. No-op while stopped.
    pub(crate) fn reset(&mut self) {
        if self.is_running() {
            self.start();
        }
    }

    pub(crate) fn stop(&mut self) {
        self.next_tick = None;
        self.idle_deadline = None;
    }

    /// Waits for the earliest armed deadline. Pending forever while stopped.
    ///
    /// Cancel-safe: state changes only after the deadline has fired.
    pub(crate) async fn next(&mut self) -> Beat {
        let earliest = match (self.next_tick, self.idle_deadline) {
            (Some(tick), Some(idle)) if idle <= tick => Some((idle, Beat::IdleTimeout)),
            (Some(tick), _) => Some((tick, Beat::Tick)),
            (None, Some(idle)) => Some((idle, Beat::IdleTimeout)),
            (None, None) => None,
        };

        let Some((deadline, beat)) = earliest else {
            return std::future::pending::<Beat>().await;
        };
        tokio::time::sleep_until(deadline).await;

        match beat {
            Beat::Tick => self.next_tick = Some(deadline + self.interval),
            Beat::IdleTimeout => self.idle_deadline = None,
        }
        beat
    }
}
