//! Fanout Relay - Entry Point
//!
//! Starts the dispatcher and the relay server with graceful shutdown support.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fanout::api::RelayServer;
use fanout::config::{Config, LogConfig};
use fanout::hub::{Hub, HubConfig};
use fanout::services::DispatcherHandle;

#[tokio::main]
async fn main() -> fanout::Result<()> {
    // Initialize tracing
    let log_config = LogConfig::from_env();
    init_tracing(&log_config);

    info!("Starting Fanout Relay");

    // Load configuration
    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;
    info!("Configuration loaded");

    // Create hub and its dispatcher
    let (hub, dispatcher) = Hub::new(HubConfig::from(&config.relay));
    let (dispatcher_handle, dispatcher_shutdown) = DispatcherHandle::new();
    let dispatcher_task = tokio::spawn(dispatcher.run(dispatcher_shutdown));

    // Bind before spawning so a taken port ends the process
    let server = RelayServer::new(config.relay.clone(), hub.clone());
    let listener = server
        .bind()
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", config.relay_addr(), e))?;

    let (shutdown_tx, server_shutdown) = watch::channel(false);
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.serve(listener, server_shutdown).await {
            error!("Relay server error: {}", e);
        }
    });

    info!("Relay started on {}", config.relay_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    dispatcher_handle.shutdown();
    hub.close_all().await;

    let _ = tokio::join!(server_task, dispatcher_task);

    info!("Fanout Relay stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("fanout={level},tower_http={level}", level = log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if log.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
