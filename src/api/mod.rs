//! HTTP surface of the relay
//!
//! Serves the landing page and the WebSocket upgrade route.

pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{AppState, RelayServer};
