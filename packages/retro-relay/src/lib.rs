/// Retro relay: an in-memory real-time JSON document store served over HTTP
/// and WebSocket, hosting remote board sessions.
pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod watch_ws;
