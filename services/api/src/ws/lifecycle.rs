//! Session state machine.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The live session is being opened; the client may not be upgraded yet.
    Connecting,
    /// Both legs are open and the pumps are running.
    Active,
    /// A failure or cancellation is tearing the session down.
    Draining,
    /// Terminal.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

/// Tracks a session's state and rejects transitions the state machine does not allow.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
    history: Vec<SessionState>,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            history: vec![SessionState::Connecting],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, starting with `Connecting`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn transition(&mut self, to: SessionState) -> Result<(), InvalidTransition> {
        use SessionState::*;

        let allowed = matches!(
            (self.state, to),
            (Connecting, Active)
                | (Connecting, Closed)
                | (Active, Draining)
                | (Active, Closed)
                | (Draining, Closed)
        );
        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(from = ?self.state, ?to, "Session state changed.");
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}
