//! Relay HTTP server using Axum

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::RelayServerConfig;
use crate::error::{RelayError, Result};
use crate::hub::Hub;

use super::middleware::OriginPolicy;
use super::routes;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub origins: OriginPolicy,
}

/// Relay server
pub struct RelayServer {
    config: RelayServerConfig,
    state: AppState,
}

impl RelayServer {
    /// Create a new relay server around an existing hub
    pub fn new(config: RelayServerConfig, hub: Hub) -> Self {
        let state = AppState {
            hub,
            origins: OriginPolicy::new(&config.allowed_origins),
        };

        Self { config, state }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone(), &self.config).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                RelayError::InvalidConfig(format!(
                    "Invalid relay address {}:{}",
                    self.config.host, self.config.port
                ))
            })?;

        Ok(TcpListener::bind(addr).await?)
    }

    /// Serve on an already bound listener until shutdown is signalled
    #[instrument(skip(self, listener, shutdown))]
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let router = self.build_router();

        info!(
            "Relay server listening on {} (WebSocket path {})",
            listener.local_addr()?,
            self.config.ws_path
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        info!("Relay server shut down");
        Ok(())
    }
}
