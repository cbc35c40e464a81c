use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("live session transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("failed to decode live session message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid live endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("live session frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("message carries no clientContent, realtimeInput or toolResponse")]
    EmptyMessage,

    #[error("live session closed before setup completed: {0}")]
    ClosedDuringSetup(String),

    /// Covers both the WebSocket handshake and the wait for `setupComplete`.
    #[error("live session did not complete setup within {0:?}")]
    SetupTimeout(Duration),

    #[error("live session closed unexpectedly with code {code}: {reason}")]
    UnexpectedClose { code: u16, reason: String },
}
