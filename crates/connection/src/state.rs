//! Connection lifecycle transition table.

use crate::types::ConnectionState;

/// Input to the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A connection attempt starts (explicit or after backoff).
    Connect,
    /// The handshake completed.
    Opened,
    /// The socket (or the attempt) failed.
    Failed,
    /// The socket closed.
    Closed,
    /// Explicit shutdown.
    Shutdown,
}

/// A transition the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {transition:?} from {from}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub transition: Transition,
}

impl ConnectionState {
    /// Applies `transition`, returning the next state.
    pub fn apply(self, transition: Transition) -> Result<ConnectionState, InvalidTransition> {
        use ConnectionState::*;
        use Transition as T;

        let next = match (self, transition) {
            (Closed, T::Shutdown) => Closed,
            (Closed, _) => return Err(InvalidTransition { from: self, transition }),
            (_, T::Shutdown) => Closed,
            (_, T::Connect) => Connecting,
            (Connecting, T::Opened) => Connected,
            (Connecting | Connected, T::Failed | T::Closed) => Disconnected,
            _ => return Err(InvalidTransition { from: self, transition }),
        };
        Ok(next)
    }
}
