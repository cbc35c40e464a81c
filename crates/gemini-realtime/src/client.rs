//! WebSocket connection to the Gemini Live endpoint.

use crate::{
    error::LiveError,
    types::{FunctionResponse, LiveClientMessage, LiveConnectConfig, LiveServerMessage, SetupMessage},
};
use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::time::Duration;
use tokio::{net::TcpStream, time::Instant};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self, Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(15);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens live sessions. Cheap to clone and shared by every request.
#[derive(Clone)]
pub struct LiveClient {
    api_key: String,
    endpoint: String,
    setup_timeout: Duration,
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("endpoint", &self.endpoint)
            .field("setup_timeout", &self.setup_timeout)
            .finish_non_exhaustive()
    }
}

impl LiveClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_setup_timeout(mut self, setup_timeout: Duration) -> Self {
        self.setup_timeout = setup_timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Connects, sends `setup` and waits for `setupComplete`.
    ///
    /// The setup timeout bounds the whole handshake, connecting included.
    /// The returned session is ready for streaming; nothing the server sent
    /// before `setupComplete` is surfaced.
    pub async fn connect(
        &self,
        model: &str,
        config: &LiveConnectConfig,
    ) -> Result<LiveSession, LiveError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        let deadline = Instant::now() + self.setup_timeout;

        let (mut stream, _) = match tokio::time::timeout_at(deadline, connect_async(url.as_str())).await {
            Ok(connected) => connected?,
            Err(_) => return Err(LiveError::SetupTimeout(self.setup_timeout)),
        };
        debug!(endpoint = %self.endpoint, "Connected to live endpoint.");

        let setup = SetupMessage {
            setup: config.to_setup(model),
        };
        stream
            .send(Message::Text(serde_json::to_string(&setup)?.into()))
            .await?;

        match tokio::time::timeout_at(deadline, await_setup_complete(&mut stream)).await {
            Ok(result) => result?,
            Err(_) => {
                let _ = stream.close(None).await;
                return Err(LiveError::SetupTimeout(self.setup_timeout));
            }
        }
        info!(model = %setup.setup.model, "Live session setup complete.");

        Ok(LiveSession { stream })
    }
}

async fn await_setup_complete(stream: &mut WsStream) -> Result<(), LiveError> {
    loop {
        let message = match stream.next().await {
            Some(message) => message?,
            None => return Err(LiveError::ClosedDuringSetup("stream ended".to_string())),
        };
        let parsed = match message {
            Message::Text(text) => LiveServerMessage::parse(text.as_str())?,
            Message::Binary(bytes) => LiveServerMessage::from_bytes(&bytes)?,
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| format!("code {}: {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "no close frame".to_string());
                return Err(LiveError::ClosedDuringSetup(reason));
            }
            _ => continue,
        };
        if parsed.is_setup_complete() {
            return Ok(());
        }
        warn!(message = parsed.as_str(), "Ignoring live message received before setupComplete.");
    }
}

/// An established live session.
pub struct LiveSession {
    stream: WsStream,
}

impl LiveSession {
    /// Splits the session into independently owned write and read halves.
    pub fn split(self) -> (LiveSender, LiveReceiver) {
        let (sink, stream) = self.stream.split();
        (LiveSender { sink }, LiveReceiver { stream })
    }
}

/// Write side of a live session.
#[async_trait]
pub trait LiveSink: Send + 'static {
    async fn send(&mut self, message: &LiveClientMessage) -> Result<(), LiveError>;

    async fn send_tool_response(
        &mut self,
        responses: Vec<FunctionResponse>,
    ) -> Result<(), LiveError> {
        self.send(&LiveClientMessage::tool_response(responses)).await
    }

    /// Sends a normal Close frame. Closing an already closed session is not an error.
    async fn close(&mut self) -> Result<(), LiveError>;
}

/// Read side of a live session.
#[async_trait]
pub trait LiveSource: Send + 'static {
    /// The next server message, or `None` once the session closed normally.
    async fn receive(&mut self) -> Result<Option<LiveServerMessage>, LiveError>;
}

pub struct LiveSender {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl LiveSink for LiveSender {
    async fn send(&mut self, message: &LiveClientMessage) -> Result<(), LiveError> {
        let payload = serde_json::to_string(message)?;
        self.sink.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LiveError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "session ended".into(),
        };
        match self.sink.send(Message::Close(Some(frame))).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct LiveReceiver {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl LiveSource for LiveReceiver {
    async fn receive(&mut self) -> Result<Option<LiveServerMessage>, LiveError> {
        loop {
            let message = match self.stream.next().await {
                None
                | Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed)) => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(message)) => message,
            };
            match message {
                Message::Text(text) => return LiveServerMessage::parse(text.as_str()).map(Some),
                Message::Binary(bytes) => return LiveServerMessage::from_bytes(&bytes).map(Some),
                Message::Close(frame) => return close_outcome(frame),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}

fn close_outcome(frame: Option<CloseFrame>) -> Result<Option<LiveServerMessage>, LiveError> {
    match frame {
        None => Ok(None),
        Some(frame) if matches!(frame.code, CloseCode::Normal | CloseCode::Away) => Ok(None),
        Some(frame) => Err(LiveError::UnexpectedClose {
            code: u16::from(frame.code),
            reason: frame.reason.to_string(),
        }),
    }
}
