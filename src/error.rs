use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    // Handshake errors
    #[error("Origin not allowed: {origin}")]
    OriginRejected { origin: String },

    // Connection errors
    #[error("Transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("Write timed out")]
    WriteTimeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Dispatch queue closed")]
    QueueClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            RelayError::OriginRejected { .. } => StatusCode::FORBIDDEN,

            RelayError::WriteTimeout => StatusCode::GATEWAY_TIMEOUT,

            RelayError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,

            RelayError::Transport(_)
            | RelayError::ConnectionClosed
            | RelayError::Io(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Only reachable before the upgrade; nothing is ever sent in-band.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        RelayError::InvalidConfig(err.to_string())
    }
}
