//! Client for the Gemini Live bidirectional streaming protocol.

pub mod client;
pub mod error;
pub mod types;

pub use client::{LiveClient, LiveReceiver, LiveSender, LiveSession, LiveSink, LiveSource};
pub use error::LiveError;
pub use types::*;
