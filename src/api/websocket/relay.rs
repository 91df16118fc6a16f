//! Relay WebSocket handler
//!
//! Every frame a client sends is queued for broadcast to all connected
//! clients, the sender included.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::api::server::AppState;
use crate::hub::{Hub, Payload};

/// WebSocket handler for the relay route
pub async fn relay_ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("WebSocket upgrade rejected: {}", rejection);
            return rejection.into_response();
        }
    };

    if let Err(e) = state.origins.check(&headers) {
        warn!("WebSocket upgrade rejected: {}", e);
        return e.into_response();
    }

    let hub = state.hub.clone();
    ws.on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_relay_ws(socket, hub))
}

/// Handle one relay client until it disconnects or is dropped
async fn handle_relay_ws(socket: WebSocket, hub: Hub) {
    let (sender, mut receiver) = socket.split();
    let conn = hub.connect(Box::new(sender));
    let id = conn.id();

    info!(connection_id = %id, clients = hub.connection_count(), "Relay WebSocket connected");

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection_id = %id, "Relay WebSocket received close");
                        break;
                    }
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!(connection_id = %id, "Relay WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                // Pings are answered by axum
                let Some(payload) = Payload::from_message(msg) else {
                    continue;
                };

                debug!(connection_id = %id, bytes = payload.len(), "Received message");
                if hub.submit(payload).await.is_err() {
                    debug!(connection_id = %id, "Dispatch queue closed");
                    break;
                }
            }
            _ = conn.closed() => {
                debug!(connection_id = %id, "Relay WebSocket closed by dispatcher");
                break;
            }
        }
    }

    hub.disconnect(id).await;

    info!(connection_id = %id, clients = hub.connection_count(), "Relay WebSocket disconnected");
}
