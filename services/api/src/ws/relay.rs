//! Bidirectional relay between a browser WebSocket and a live session.
//!
//! Two pumps run per session. The inbound pump reads the live session and
//! writes to the browser; the outbound pump reads the browser and writes to
//! the live session. Tool calls arriving on the inbound side are resolved
//! there and the batched response is handed to the outbound pump, which is
//! the only writer on the live session. Neither connection is shared.

use super::lifecycle::{SessionLifecycle, SessionState};
use axum::extract::ws::{CloseFrame, Message, close_code};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gemini_realtime::{FunctionResponse, LiveClientMessage, LiveError, LiveSink, LiveSource};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use voice_agent_core::{ToolDispatcher, ToolError, ToolInvocation, ToolResponse};

/// How long teardown waits for a pump to hand back its connection halves.
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("live session error: {0}")]
    Live(#[from] LiveError),

    #[error("client connection error: {0}")]
    ClientTransport(#[source] axum::Error),

    #[error("client closed the connection with code {code}: {reason}")]
    UnexpectedClose { code: u16, reason: String },

    #[error("malformed client message: {0}")]
    MalformedClientMessage(#[source] LiveError),

    #[error("tool call failed: {0}")]
    Tool(#[from] ToolError),
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    ClientClosed,
    AiClosed,
    Cancelled,
    Failed(RelayError),
}

impl SessionEnd {
    /// Failure details stay in the logs; the browser only sees a generic reason.
    fn close_frame(&self) -> CloseFrame {
        let (code, reason) = match self {
            SessionEnd::ClientClosed | SessionEnd::AiClosed => (close_code::NORMAL, "session ended"),
            SessionEnd::Cancelled => (close_code::NORMAL, "server shutting down"),
            SessionEnd::Failed(_) => (close_code::ERROR, "internal error"),
        };
        CloseFrame {
            code,
            reason: reason.into(),
        }
    }
}

/// How a session ended and the states it went through.
#[derive(Debug)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub states: Vec<SessionState>,
}

impl SessionReport {
    /// Whether teardown went through `Draining`.
    pub fn drained(&self) -> bool {
        self.states.contains(&SessionState::Draining)
    }
}

/// What a pump reports when it stops on its own.
#[derive(Debug)]
enum PumpOutcome {
    ClientClosed,
    AiClosed,
    Failed(RelayError),
}

/// A resolved tool batch on its way to the live session.
struct ToolReply {
    responses: Vec<ToolResponse>,
    written: oneshot::Sender<()>,
}

/// Owns one session from the moment the live session is requested until both
/// legs are closed. Consumed by [`SessionRelay::run`].
pub struct SessionRelay {
    session_id: Uuid,
    dispatcher: ToolDispatcher,
    cancel: CancellationToken,
    lifecycle: SessionLifecycle,
}

impl SessionRelay {
    /// The relay is cancelled when `shutdown` is.
    pub fn new(session_id: Uuid, dispatcher: ToolDispatcher, shutdown: &CancellationToken) -> Self {
        Self {
            session_id,
            dispatcher,
            cancel: shutdown.child_token(),
            lifecycle: SessionLifecycle::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    /// The live session could not be opened; the relay never becomes active.
    pub fn abandon(mut self) {
        self.enter(SessionState::Closed);
    }

    fn enter(&mut self, state: SessionState) {
        if let Err(e) = self.lifecycle.transition(state) {
            warn!(session_id = %self.session_id, error = %e, "Ignoring session transition.");
        }
    }

    /// Relays until either leg closes, a pump fails, or the relay is cancelled,
    /// then closes both legs.
    pub async fn run<CS, CR, AS, AR>(mut self, client: (CS, CR), ai: (AS, AR)) -> SessionReport
    where
        CS: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
        CR: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
        AS: LiveSink,
        AR: LiveSource,
    {
        let (client_tx, client_rx) = client;
        let (ai_tx, ai_rx) = ai;
        self.enter(SessionState::Active);
        info!(session_id = %self.session_id, "Voice session active.");

        let pumps = self.cancel.child_token();
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<PumpOutcome>(2);
        let (reply_tx, reply_rx) = mpsc::channel::<ToolReply>(1);
        let resolving = Arc::new(AtomicBool::new(false));

        let inbound = tokio::spawn(inbound_pump(
            client_tx,
            ai_rx,
            self.dispatcher.clone(),
            reply_tx,
            outcome_tx.clone(),
            resolving.clone(),
            pumps.clone(),
        ));
        let outbound = tokio::spawn(outbound_pump(
            client_rx,
            ai_tx,
            reply_rx,
            outcome_tx,
            pumps.clone(),
        ));

        // First outcome wins; anything reported later is dropped with the channel.
        let first = tokio::select! {
            outcome = outcome_rx.recv() => outcome,
            _ = self.cancel.cancelled() => None,
        };
        let end = match first {
            Some(PumpOutcome::ClientClosed) => SessionEnd::ClientClosed,
            Some(PumpOutcome::AiClosed) => SessionEnd::AiClosed,
            Some(PumpOutcome::Failed(e)) => SessionEnd::Failed(e),
            None => SessionEnd::Cancelled,
        };

        let clean = matches!(end, SessionEnd::ClientClosed | SessionEnd::AiClosed);
        if !clean || resolving.load(Ordering::Acquire) {
            self.enter(SessionState::Draining);
        }
        match &end {
            SessionEnd::Failed(e) => error!(session_id = %self.session_id, error = %e, "Voice session failed."),
            other => info!(session_id = %self.session_id, end = ?other, "Voice session ending."),
        }

        pumps.cancel();
        let (inbound, outbound) = tokio::join!(join_pump(inbound, "inbound"), join_pump(outbound, "outbound"));

        let frame = end.close_frame();
        if let Some((mut client_tx, _ai_rx)) = inbound {
            match tokio::time::timeout(PUMP_JOIN_TIMEOUT, client_tx.send(Message::Close(Some(frame)))).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Client connection already closed."),
                Err(_) => warn!("Timed out sending Close frame to client."),
            }
        }
        if let Some((_client_rx, mut ai_tx)) = outbound {
            match tokio::time::timeout(PUMP_JOIN_TIMEOUT, ai_tx.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Live session already closed."),
                Err(_) => warn!("Timed out closing live session."),
            }
        }

        self.enter(SessionState::Closed);
        info!(session_id = %self.session_id, "Voice session closed.");
        SessionReport {
            end,
            states: self.lifecycle.history().to_vec(),
        }
    }
}

async fn join_pump<T>(mut handle: JoinHandle<T>, pump: &'static str) -> Option<T> {
    match tokio::time::timeout(PUMP_JOIN_TIMEOUT, &mut handle).await {
        Ok(Ok(halves)) => Some(halves),
        Ok(Err(e)) => {
            error!(pump, error = %e, "Pump task panicked.");
            None
        }
        Err(_) => {
            warn!(pump, "Pump did not stop in time; aborting.");
            handle.abort();
            None
        }
    }
}

/// Live session to client. Resolves tool calls and forwards everything else verbatim.
async fn inbound_pump<CS, AR>(
    mut client_tx: CS,
    mut ai_rx: AR,
    dispatcher: ToolDispatcher,
    replies: mpsc::Sender<ToolReply>,
    outcomes: mpsc::Sender<PumpOutcome>,
    resolving: Arc<AtomicBool>,
    cancel: CancellationToken,
) -> (CS, AR)
where
    CS: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
    AR: LiveSource,
{
    let outcome = loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break None,
            received = ai_rx.receive() => received,
        };
        let message = match received {
            Ok(Some(message)) => message,
            Ok(None) => break Some(PumpOutcome::AiClosed),
            Err(e) => break Some(PumpOutcome::Failed(RelayError::Live(e))),
        };

        if let Some(tool_call) = message.tool_call() {
            let invocations: Vec<ToolInvocation> =
                tool_call.function_calls.iter().map(ToolInvocation::from).collect();
            if invocations.is_empty() {
                continue;
            }
            debug!(calls = invocations.len(), "Resolving tool call batch.");

            resolving.store(true, Ordering::Release);
            let resolved = tokio::select! {
                _ = cancel.cancelled() => break None,
                resolved = dispatcher.resolve_batch(&invocations) => resolved,
            };
            resolving.store(false, Ordering::Release);
            let responses = match resolved {
                Ok(responses) => responses,
                Err(e) => break Some(PumpOutcome::Failed(RelayError::Tool(e))),
            };

            let (written_tx, written_rx) = oneshot::channel();
            let reply = ToolReply {
                responses,
                written: written_tx,
            };
            if replies.send(reply).await.is_err() {
                break None;
            }
            // Keep reading only once the response is on the wire.
            tokio::select! {
                _ = cancel.cancelled() => break None,
                written = written_rx => if written.is_err() { break None },
            }
            continue;
        }

        let forwarded = tokio::select! {
            _ = cancel.cancelled() => break None,
            sent = client_tx.send(Message::Text(message.into_text().into())) => sent,
        };
        if let Err(e) = forwarded {
            break Some(PumpOutcome::Failed(RelayError::ClientTransport(e)));
        }
    };

    if let Some(outcome) = outcome {
        let _ = outcomes.try_send(outcome);
    }
    (client_tx, ai_rx)
}

/// Client to live session, plus tool responses handed over by the inbound pump.
async fn outbound_pump<CR, AS>(
    mut client_rx: CR,
    mut ai_tx: AS,
    mut replies: mpsc::Receiver<ToolReply>,
    outcomes: mpsc::Sender<PumpOutcome>,
    cancel: CancellationToken,
) -> (CR, AS)
where
    CR: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
    AS: LiveSink,
{
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break None,
            Some(reply) = replies.recv() => {
                let responses: Vec<FunctionResponse> =
                    reply.responses.into_iter().map(FunctionResponse::from).collect();
                if let Err(e) = ai_tx.send_tool_response(responses).await {
                    break Some(PumpOutcome::Failed(RelayError::Live(e)));
                }
                let _ = reply.written.send(());
            }
            frame = client_rx.next() => match read_client_frame(frame) {
                ClientFrame::Forward(message) => {
                    if let Err(e) = ai_tx.send(&message).await {
                        break Some(PumpOutcome::Failed(RelayError::Live(e)));
                    }
                }
                ClientFrame::Skip => {}
                ClientFrame::Closed => break Some(PumpOutcome::ClientClosed),
                ClientFrame::Failed(e) => break Some(PumpOutcome::Failed(e)),
            },
        }
    };

    if let Some(outcome) = outcome {
        let _ = outcomes.try_send(outcome);
    }
    (client_rx, ai_tx)
}

enum ClientFrame {
    Forward(LiveClientMessage),
    Skip,
    Closed,
    Failed(RelayError),
}

fn read_client_frame(frame: Option<Result<Message, axum::Error>>) -> ClientFrame {
    let message = match frame {
        None => return ClientFrame::Closed,
        Some(Err(e)) => return ClientFrame::Failed(RelayError::ClientTransport(e)),
        Some(Ok(message)) => message,
    };
    let parsed = match message {
        Message::Text(text) => LiveClientMessage::from_slice(text.as_str().as_bytes()),
        Message::Binary(bytes) => LiveClientMessage::from_slice(&bytes),
        Message::Close(None) => return ClientFrame::Closed,
        Message::Close(Some(frame)) => {
            return if matches!(frame.code, close_code::NORMAL | close_code::AWAY) {
                ClientFrame::Closed
            } else {
                ClientFrame::Failed(RelayError::UnexpectedClose {
                    code: frame.code,
                    reason: frame.reason.to_string(),
                })
            };
        }
        Message::Ping(_) | Message::Pong(_) => return ClientFrame::Skip,
    };
    match parsed {
        Ok(message) => ClientFrame::Forward(message),
        Err(e) => ClientFrame::Failed(RelayError::MalformedClientMessage(e)),
    }
}
