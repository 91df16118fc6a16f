//! Relay hub
//!
//! Owns the connection registry and the producer side of the dispatch queue.
//! Built once at startup; constructing it yields the matching [`Dispatcher`],
//! which owns the consumer side.

pub mod connection;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::RelayServerConfig;
use crate::error::{RelayError, Result};
use crate::services::Dispatcher;

pub use connection::{Connection, ConnectionId, Outbound, Payload};
pub use registry::Registry;

/// Hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of messages waiting for dispatch. Producers wait when full.
    pub queue_capacity: usize,
    /// Deadline for a single write to a single recipient
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&RelayServerConfig> for HubConfig {
    fn from(config: &RelayServerConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            write_timeout: config.write_timeout(),
        }
    }
}

/// Handle shared by every connection handler
#[derive(Clone)]
pub struct Hub {
    registry: Registry,
    queue: mpsc::Sender<Payload>,
    write_timeout: Duration,
}

impl Hub {
    /// Create the hub and the dispatcher that drains its queue.
    pub fn new(config: HubConfig) -> (Self, Dispatcher) {
        let (queue, rx) = mpsc::channel(config.queue_capacity.max(1));
        let registry = Registry::new();

        let hub = Self {
            registry: registry.clone(),
            queue,
            write_timeout: config.write_timeout,
        };
        let dispatcher = Dispatcher::new(registry, rx, config.write_timeout);

        (hub, dispatcher)
    }

    /// Wrap a transport in a connection and register it for broadcasts.
    pub fn connect(&self, outbound: Box<dyn Outbound>) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(outbound));
        self.registry.register(conn.clone());
        conn
    }

    /// Queue a payload for broadcast, waiting while the queue is full.
    pub async fn submit(&self, payload: Payload) -> Result<()> {
        self.queue
            .send(payload)
            .await
            .map_err(|_| RelayError::QueueClosed)
    }

    /// Unregister and close a connection. Safe to call any number of times.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.evict(id, self.write_timeout).await;
        if removed {
            debug!(connection_id = %id, clients = self.registry.len(), "Connection removed");
        }
        removed
    }

    /// Close every registered connection. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let conns = self.registry.drain();
        let count = conns.len();

        let closes = conns.iter().map(|conn| async move {
            if tokio::time::timeout(self.write_timeout, conn.close())
                .await
                .is_err()
            {
                debug!(connection_id = %conn.id(), "Timed out closing transport");
            }
        });
        futures::future::join_all(closes).await;

        if count > 0 {
            info!("Closed {} relay connections", count);
        }
        count
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
