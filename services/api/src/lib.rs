//! Voice Agent API Library Crate
//!
//! Configuration, application state, routing and the WebSocket voice session
//! relay. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod error;
pub mod models;
pub mod router;
pub mod state;
pub mod supervisor;
pub mod ws;
