//! Route definitions

use axum::routing::{get, get_service};
use axum::Router;
use tower_http::services::ServeFile;

use super::server::AppState;
use super::websocket;
use crate::config::RelayServerConfig;

/// Create the router: the landing page and the upgrade route
pub fn create_router(state: AppState, config: &RelayServerConfig) -> Router {
    Router::new()
        .route("/", get_service(ServeFile::new(&config.index_file)))
        .route(&config.ws_path, get(websocket::relay::relay_ws))
        .with_state(state)
}
