//! Origin policy for WebSocket upgrades
//!
//! Browsers do not apply CORS to WebSocket handshakes, so the relay checks
//! the `Origin` header itself before upgrading.

use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::error::{RelayError, Result};

/// Allowed origins for the upgrade route. An empty list accepts any origin.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed_origins: &[String]) -> Self {
        if allowed_origins.is_empty() {
            debug!("Origin policy: accepting any origin");
        } else {
            debug!("Origin policy: allowing origins {:?}", allowed_origins);
        }
        Self {
            allowed: allowed_origins.to_vec(),
        }
    }

    pub fn allows_any(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Check the request's `Origin` header against the policy
    pub fn check(&self, headers: &HeaderMap) -> Result<()> {
        if self.allows_any() {
            return Ok(());
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if self.allowed.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            Err(RelayError::OriginRejected {
                origin: if origin.is_empty() {
                    "<none>".to_string()
                } else {
                    origin.to_string()
                },
            })
        }
    }
}
