//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and lifecycle settings.
    pub server: ServerConfig,

    /// Diagnostics and request-log pipeline settings.
    pub logging: LoggingConfig,

    /// Static route table, in declaration order.
    pub routes: Vec<RouteConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When present the gateway terminates TLS
    /// and forwards `X-Forwarded-Proto: https`.
    pub tls: Option<TlsConfig>,

    /// Deadline for in-flight requests during graceful shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            shutdown_timeout_secs: 5,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Output format of the diagnostic subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Capacity of the bounded request-log queue.
    pub queue_capacity: usize,

    /// Number of buffered entries that triggers an immediate flush.
    pub batch_size: usize,

    /// Periodic flush interval in seconds.
    pub flush_interval_secs: u64,
}

impl LoggingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            queue_capacity: 1000,
            batch_size: 5,
            flush_interval_secs: 5,
        }
    }
}

/// A single entry of the route table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Exact request path to expose.
    pub path: String,

    /// Absolute upstream URL the request is forwarded to.
    #[serde(alias = "targetUrl")]
    pub target_url: String,

    /// HTTP method to match.
    pub method: String,

    /// Require a `Bearer` credential before forwarding.
    #[serde(default, alias = "requireAuth")]
    pub require_auth: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tunables() {
        let config = GatewayConfig::default();
        assert_eq!(config.logging.queue_capacity, 1000);
        assert_eq!(config.logging.batch_size, 5);
        assert_eq!(config.logging.flush_interval(), Duration::from_secs(5));
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(5));
        assert!(config.routes.is_empty());
    }

    #[test]
    fn route_accepts_camel_case_keys() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[routes]]
            path = "/orders"
            targetUrl = "http://orders.internal/orders"
            method = "GET"
            requireAuth = true
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].target_url, "http://orders.internal/orders");
        assert!(config.routes[0].require_auth);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [logging]
            format = "json"
            batch_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.batch_size, 10);
        assert_eq!(config.logging.queue_capacity, 1000);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }
}
