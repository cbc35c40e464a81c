//! WebSocket Voice Sessions
//!
//! - `agent`: per-endpoint live session configuration and tools.
//! - `lifecycle`: the session state machine.
//! - `relay`: pumps messages between the browser and the live session.
//! - `session`: the HTTP endpoints that start a session.

pub mod agent;
pub mod lifecycle;
pub mod relay;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use session::{course_voice_session, interview_voice_session};
