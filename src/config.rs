use crate::error::{Result, RelayError};
use std::env;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay server configuration
    pub relay: RelayServerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct RelayServerConfig {
    /// Port for the relay server (default: 8080)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Path of the WebSocket upgrade route (default: /ws)
    ///
    /// The bundled landing page connects to `/ws` unless it is opened with
    /// `?ws=<path>`, e.g. `/?ws=/chat`.
    pub ws_path: String,
    /// File served at the root path (default: index.html)
    pub index_file: String,
    /// Allowed WebSocket origins (comma-separated, empty = any origin)
    pub allowed_origins: Vec<String>,
    /// Per-recipient write deadline in seconds
    pub write_timeout: u64,
    /// Maximum number of messages waiting for dispatch
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            relay: RelayServerConfig {
                port: get_env_or("RELAY_PORT", "8080").parse().map_err(|_| {
                    RelayError::InvalidConfig("RELAY_PORT must be a valid port number".into())
                })?,
                host: get_env_or("RELAY_HOST", "0.0.0.0"),
                ws_path: parse_ws_path(&get_env_or("RELAY_WS_PATH", "/ws"))?,
                index_file: get_env_or("RELAY_INDEX_FILE", "index.html"),
                allowed_origins: parse_origins(&get_env_or("RELAY_ALLOWED_ORIGINS", ""))?,
                write_timeout: parse_positive("RELAY_WRITE_TIMEOUT_SECS", "10")?,
                queue_capacity: parse_positive("RELAY_QUEUE_CAPACITY", "1024")?,
            },
            log: LogConfig::from_env(),
        })
    }

    /// Get the relay server address
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.relay.host, self.relay.port)
    }
}

impl RelayServerConfig {
    /// Per-recipient write deadline
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }
}

impl LogConfig {
    /// Load logging configuration on its own, so tracing can start before
    /// the rest of the configuration is validated.
    pub fn from_env() -> Self {
        LogConfig {
            level: get_env_or("LOG_LEVEL", "info"),
            format: get_env_or("LOG_FORMAT", "pretty"),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn parse_ws_path(raw: &str) -> Result<String> {
    let path = raw.trim();
    if !path.starts_with('/') || path == "/" {
        return Err(RelayError::InvalidConfig(
            "RELAY_WS_PATH must start with '/' and must not be the root path".into(),
        ));
    }
    Ok(path.to_string())
}

fn parse_origins(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|origin| {
            let url = Url::parse(origin).map_err(|e| {
                RelayError::InvalidConfig(format!(
                    "RELAY_ALLOWED_ORIGINS entry '{}' is not a valid URL: {}",
                    origin, e
                ))
            })?;
            // Browsers send the serialized origin, without any trailing slash.
            Ok(url.origin().ascii_serialization())
        })
        .collect()
}

fn parse_positive<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match get_env_or(key, default).parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(RelayError::InvalidConfig(format!(
            "{} must be a positive number",
            key
        ))),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
