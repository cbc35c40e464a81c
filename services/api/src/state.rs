//! Shared Application State

use crate::{config::Config, ws::agent::AgentProfiles};
use gemini_realtime::LiveClient;
use std::sync::Arc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub live: LiveClient,
    pub agents: Arc<AgentProfiles>,
    /// Cancelled when the process starts shutting down; every session token is a child.
    pub shutdown: CancellationToken,
    /// Tracks running sessions so shutdown can wait for them to drain.
    pub sessions: TaskTracker,
}
