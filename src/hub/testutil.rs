//! In-memory transports for exercising the hub without sockets

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::connection::{Outbound, Payload};
use crate::error::{RelayError, Result};

/// Forwards every payload into a channel the test can read.
pub struct ChannelOutbound {
    tx: mpsc::UnboundedSender<Payload>,
    closes: Arc<AtomicUsize>,
}

impl ChannelOutbound {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Self {
            tx,
            closes: Arc::new(AtomicUsize::new(0)),
        };
        (outbound, rx)
    }

    /// Number of times the transport has been closed.
    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send(&mut self, payload: Payload) -> Result<()> {
        self.tx
            .send(payload)
            .map_err(|_| RelayError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every write fails, like a peer that has gone away.
pub struct FailingOutbound;

#[async_trait]
impl Outbound for FailingOutbound {
    async fn send(&mut self, _payload: Payload) -> Result<()> {
        Err(RelayError::Internal("broken pipe".into()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes and closes never complete, like a peer that stopped reading.
pub struct StalledOutbound;

#[async_trait]
impl Outbound for StalledOutbound {
    async fn send(&mut self, _payload: Payload) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
