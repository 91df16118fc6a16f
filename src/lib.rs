//! Fanout - WebSocket Fan-out Relay
//!
//! Every message a connected client sends is broadcast to every connected
//! client, the sender included.
//!
//! ## Features
//!
//! - Connection registry with snapshot-based broadcast passes
//! - Single dispatcher draining a bounded queue, one message at a time
//! - Per-recipient write deadline; failing or stalled clients are evicted
//! - Optional origin allow-list for the upgrade route
//! - Landing page served at the root path

pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod services;

pub use config::Config;
pub use error::{RelayError, Result};
pub use hub::{Hub, HubConfig};
