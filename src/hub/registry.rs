//! Set of connections currently eligible to receive broadcasts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::timeout;
use tracing::debug;

use super::connection::{Connection, ConnectionId};

/// Concurrency-safe connection registry
///
/// Cloning is cheap and every clone refers to the same set. The lock is
/// never held across an await point.
#[derive(Clone, Default)]
pub struct Registry {
    members: Arc<RwLock<HashMap<ConnectionId, Arc<Connection>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Returns `false` if it was already a member.
    pub fn register(&self, conn: Arc<Connection>) -> bool {
        let mut members = self.members.write();
        if members.contains_key(&conn.id()) {
            return false;
        }
        members.insert(conn.id(), conn);
        true
    }

    /// Remove a connection if present.
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.members.write().remove(&id)
    }

    /// Remove a connection and close its transport.
    ///
    /// Only the caller that actually removed the member closes it, so racing
    /// evictions close the transport exactly once. Returns `true` for that
    /// caller.
    pub async fn evict(&self, id: ConnectionId, deadline: Duration) -> bool {
        let Some(conn) = self.unregister(id) else {
            return false;
        };

        if timeout(deadline, conn.close()).await.is_err() {
            debug!(connection_id = %id, "Timed out closing transport");
        }
        true
    }

    /// Remove a connection now and close its transport in the background.
    ///
    /// Used on the broadcast path, where waiting for a close to a stalled
    /// peer would hold up every remaining recipient. Must be called from
    /// within a tokio runtime.
    pub fn evict_detached(&self, id: ConnectionId, deadline: Duration) -> bool {
        let Some(conn) = self.unregister(id) else {
            return false;
        };

        tokio::spawn(async move {
            if timeout(deadline, conn.close()).await.is_err() {
                debug!(connection_id = %id, "Timed out closing transport");
            }
        });
        true
    }

    /// Copy of the current members, safe to iterate while others mutate the set.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.members.read().values().cloned().collect()
    }

    /// Remove every member, returning them so the caller can close them.
    pub fn drain(&self) -> Vec<Arc<Connection>> {
        self.members.write().drain().map(|(_, conn)| conn).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}
