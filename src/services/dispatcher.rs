//! Broadcast dispatcher
//!
//! Single consumer of the dispatch queue. Every payload is written to every
//! registered connection; a recipient whose write fails or exceeds the write
//! deadline is evicted without affecting the others.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::RelayError;
use crate::hub::{Payload, Registry};

/// Outcome of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients that accepted the payload
    pub delivered: usize,
    /// Recipients removed because the write failed or timed out
    pub evicted: usize,
}

/// Drains the dispatch queue and fans payloads out to the registry
pub struct Dispatcher {
    registry: Registry,
    queue: mpsc::Receiver<Payload>,
    write_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        queue: mpsc::Receiver<Payload>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            write_timeout,
        }
    }

    /// Run the dispatcher (call in a spawned task)
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting dispatcher with {}s write timeout",
            self.write_timeout.as_secs_f64()
        );

        loop {
            tokio::select! {
                next = self.queue.recv() => {
                    let Some(payload) = next else {
                        info!("Dispatch queue closed");
                        break;
                    };
                    let report = self.broadcast(payload).await;
                    debug!(
                        delivered = report.delivered,
                        evicted = report.evicted,
                        "Broadcast pass complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Write one payload to every current member.
    pub async fn broadcast(&self, payload: Payload) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for conn in self.registry.snapshot() {
            let id = conn.id();
            let result = match timeout(self.write_timeout, conn.send(payload.clone())).await {
                Ok(result) => result,
                Err(_) => Err(RelayError::WriteTimeout),
            };

            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(connection_id = %id, "Dropping client after failed write: {}", e);
                    if self.registry.evict_detached(id, self.write_timeout) {
                        report.evicted += 1;
                    }
                }
            }
        }

        report
    }
}

/// Handle for stopping the dispatcher
pub struct DispatcherHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl DispatcherHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for DispatcherHandle {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::testutil::{ChannelOutbound, FailingOutbound, StalledOutbound};
    use crate::hub::{Hub, HubConfig};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_test::assert_ok;

    fn test_hub() -> (Hub, Dispatcher) {
        Hub::new(HubConfig {
            queue_capacity: 16,
            write_timeout: Duration::from_millis(100),
        })
    }

    fn connect_channel(hub: &Hub) -> UnboundedReceiver<Payload> {
        let (outbound, rx) = ChannelOutbound::new();
        hub.connect(Box::new(outbound));
        rx
    }

    fn text(s: &str) -> Payload {
        Payload::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_broadcast_empty_registry() {
        let (_hub, dispatcher) = test_hub();
        let report = dispatcher.broadcast(text("nobody")).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let (hub, dispatcher) = test_hub();
        let mut receivers: Vec<_> = (0..4).map(|_| connect_channel(&hub)).collect();

        let report = dispatcher.broadcast(text("hello")).await;
        assert_eq!(report.delivered, 4);
        assert_eq!(report.evicted, 0);

        for rx in &mut receivers {
            assert_eq!(rx.try_recv().ok(), Some(text("hello")));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_broadcast_preserves_binary_frames() {
        let (hub, dispatcher) = test_hub();
        let mut rx = connect_channel(&hub);

        dispatcher.broadcast(Payload::Binary(vec![0xde, 0xad])).await;
        assert_eq!(rx.try_recv().ok(), Some(Payload::Binary(vec![0xde, 0xad])));
    }

    #[tokio::test]
    async fn test_failed_recipient_is_evicted_others_still_receive() {
        let (hub, dispatcher) = test_hub();
        let mut rx_a = connect_channel(&hub);
        let broken = hub.connect(Box::new(FailingOutbound));
        let mut rx_b = connect_channel(&hub);

        let report = dispatcher.broadcast(text("hello")).await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.evicted, 1);
        assert_eq!(rx_a.try_recv().ok(), Some(text("hello")));
        assert_eq!(rx_b.try_recv().ok(), Some(text("hello")));

        assert!(!hub.registry().contains(broken.id()));
        let closed = tokio::time::timeout(Duration::from_millis(500), broken.closed()).await;
        assert!(closed.is_ok());
        assert_eq!(hub.connection_count(), 2);

        // Evicted recipients get nothing further.
        let report = dispatcher.broadcast(text("again")).await;
        assert_eq!(report, BroadcastReport { delivered: 2, evicted: 0 });
    }

    #[tokio::test]
    async fn test_stalled_recipient_times_out() {
        let (hub, dispatcher) = test_hub();
        let stalled = hub.connect(Box::new(StalledOutbound));
        let mut rx = connect_channel(&hub);

        // One write deadline (100ms) for the stalled send; its close must
        // not add a second one.
        let report = tokio::time::timeout(
            Duration::from_millis(180),
            dispatcher.broadcast(text("tick")),
        )
        .await
        .expect("broadcast pass waited on more than one write deadline");

        assert_eq!(report, BroadcastReport { delivered: 1, evicted: 1 });
        assert_eq!(rx.try_recv().ok(), Some(text("tick")));
        assert!(!hub.registry().contains(stalled.id()));

        // The close still happens, off the broadcast path.
        let closed = tokio::time::timeout(Duration::from_millis(500), stalled.closed()).await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_member_closed_by_its_handler_is_skipped() {
        let (hub, dispatcher) = test_hub();
        let (outbound, _rx) = ChannelOutbound::new();
        let conn = hub.connect(Box::new(outbound));

        // Closed but not yet unregistered: the write fails and the
        // dispatcher finishes the removal.
        conn.close().await;
        let report = dispatcher.broadcast(text("hello")).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_run_dispatches_in_queue_order() {
        let (hub, dispatcher) = test_hub();
        let (handle, shutdown) = DispatcherHandle::new();
        let mut rx = connect_channel(&hub);

        for i in 0..5 {
            assert_ok!(hub.submit(text(&format!("msg-{}", i))).await);
        }
        let task = tokio::spawn(dispatcher.run(shutdown));

        for i in 0..5 {
            assert_eq!(rx.recv().await, Some(text(&format!("msg-{}", i))));
        }

        handle.shutdown();
        assert_ok!(task.await);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_while_idle() {
        let (_hub, dispatcher) = test_hub();
        let (handle, shutdown) = DispatcherHandle::new();
        let task = tokio::spawn(dispatcher.run(shutdown));

        handle.shutdown();
        let joined = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
