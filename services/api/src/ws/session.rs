//! Voice session endpoints: open the live session, then upgrade the browser.

use super::{agent::AgentKind, relay::SessionRelay};
use crate::{error::ApiError, models::ErrorResponse, state::AppState};
use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{Instrument, Span, error, info, instrument, warn};
use uuid::Uuid;

pub const COURSE_SESSION_PATH: &str = "/api/v1/courses/voice_sessions:start";
pub const INTERVIEW_SESSION_PATH: &str = "/api/v1/interviewers/voice_sessions:start";

/// Start a voice session with the course sales assistant.
#[utoipa::path(
    get,
    path = "/api/v1/courses/voice_sessions:start",
    responses(
        (status = 101, description = "Switching protocols to the voice session WebSocket"),
        (status = 502, description = "The live session could not be started", body = ErrorResponse)
    ),
    tag = "Voice Sessions"
)]
pub async fn course_voice_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    start_voice_session(ws, state, AgentKind::Course).await
}

/// Start a voice session with the interview agent.
#[utoipa::path(
    get,
    path = "/api/v1/interviewers/voice_sessions:start",
    responses(
        (status = 101, description = "Switching protocols to the voice session WebSocket"),
        (status = 502, description = "The live session could not be started", body = ErrorResponse)
    ),
    tag = "Voice Sessions"
)]
pub async fn interview_voice_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    start_voice_session(ws, state, AgentKind::Interview).await
}

/// Opens the live session before upgrading, so a failure can still be
/// reported to the browser as a JSON error.
#[instrument(name = "voice_session", skip_all, fields(session_id, agent = %kind))]
async fn start_voice_session(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    kind: AgentKind,
) -> Result<Response, ApiError> {
    let session_id = Uuid::new_v4();
    Span::current().record("session_id", tracing::field::display(session_id));

    let profile = state.agents.get(kind);
    let relay = SessionRelay::new(session_id, profile.dispatcher.clone(), &state.shutdown);

    let live = match state
        .live
        .connect(&state.config.live_model, &profile.live_config)
        .await
    {
        Ok(live) => live,
        Err(e) => {
            error!(error = %e, "Failed to start live session.");
            relay.abandon();
            return Err(ApiError::Upstream(format!(
                "failed to start live session: {e}"
            )));
        }
    };
    info!("Live session ready. Upgrading client connection...");

    let span = Span::current();
    let sessions = state.sessions.clone();
    Ok(ws
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed."))
        .on_upgrade(move |socket| {
            sessions.track_future(
                async move {
                    let (socket_tx, socket_rx) = socket.split();
                    relay.run((socket_tx, socket_rx), live.split()).await;
                }
                .instrument(span),
            )
        }))
}
