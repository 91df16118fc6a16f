//! A single relay client and the write side of its transport

use std::fmt;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RelayError, Result};

/// One opaque message frame. The frame kind is preserved when relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Extract the relayable payload of a frame; control frames yield `None`.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Payload::Text(text)),
            Message::Binary(data) => Some(Payload::Binary(data)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(data) => Message::Binary(data),
        }
    }
}

/// Identity of a connection in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Write side of a client transport
#[async_trait]
pub trait Outbound: Send {
    /// Deliver one payload to the client
    async fn send(&mut self, payload: Payload) -> Result<()>;

    /// Close the transport
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl Outbound for SplitSink<WebSocket, Message> {
    async fn send(&mut self, payload: Payload) -> Result<()> {
        SinkExt::send(self, Message::from(payload)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        SinkExt::close(self).await?;
        Ok(())
    }
}

/// A registered relay client
///
/// Writes are serialized by an async mutex, so at most one task writes to
/// the transport at a time. The closed flag is a watch channel so the task
/// reading from the client can wait for a close issued elsewhere.
pub struct Connection {
    id: ConnectionId,
    outbound: Mutex<Box<dyn Outbound>>,
    closed: watch::Sender<bool>,
}

impl Connection {
    pub fn new(outbound: Box<dyn Outbound>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::new(),
            outbound: Mutex::new(outbound),
            closed,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Write one payload to the client
    pub async fn send(&self, payload: Payload) -> Result<()> {
        if self.is_closed() {
            return Err(RelayError::ConnectionClosed);
        }
        self.outbound.lock().await.send(payload).await
    }

    /// Close the transport. Only the first call does any work; it returns
    /// `true`, every later call returns `false`.
    pub async fn close(&self) -> bool {
        if self.closed.send_replace(true) {
            return false;
        }

        let mut outbound = self.outbound.lock().await;
        if let Err(e) = outbound.close().await {
            debug!(connection_id = %self.id, "Error while closing transport: {}", e);
        }
        true
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
