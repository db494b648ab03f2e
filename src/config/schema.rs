//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::RouteMode;

/// Root configuration for the resource server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Protocol identity and advice restrictions.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Collections mounted on the root router at startup.
    pub mounts: Vec<MountConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Headers a handler may never set through advice.
pub const DEFAULT_RESTRICTED_ADVICE_NAMES: &[&str] = &[
    "Content-Type",
    "Content-Length",
    "Content-Encoding",
    "Content-Disposition",
    "Connection",
    "Transfer-Encoding",
    "Cache-Control",
    "Pragma",
    "Expires",
    "ETag",
    "Location",
    "Set-Cookie",
    "Date",
    "Server",
];

/// Protocol identity advertised in the api-version context.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub protocol_name: String,

    /// `major.minor`.
    pub protocol_version: String,

    pub restricted_advice_names: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            protocol_name: "crest".to_string(),
            protocol_version: "2.0".to_string(),
            restricted_advice_names: DEFAULT_RESTRICTED_ADVICE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// An in-memory collection mounted on the root router.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MountConfig {
    /// Route pattern, e.g. `users` or `tenants/{tenant}/users`.
    pub pattern: String,

    #[serde(default = "default_mount_mode")]
    pub mode: RouteMode,

    /// Collection name used in logs and error messages.
    pub collection: String,
}

fn default_mount_mode() -> RouteMode {
    RouteMode::StartsWith
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.api.protocol_name, "crest");
        assert!(config
            .api
            .restricted_advice_names
            .iter()
            .any(|n| n == "Content-Type"));
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [observability]
            log_format = "json"
            metrics_enabled = false

            [[mounts]]
            pattern = "users"
            collection = "users"

            [[mounts]]
            pattern = "config"
            mode = "equals"
            collection = "settings"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].mode, RouteMode::StartsWith);
        assert_eq!(config.mounts[1].mode, RouteMode::Equals);
    }
}
