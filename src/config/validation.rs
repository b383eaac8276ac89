//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities > 0, intervals > 0)
//! - Reject route paths the dispatcher cannot register exactly
//! - Reject upstream targets the forwarder cannot reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::Method;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};
use crate::routing::route::{is_pattern_path, method_filter, RESERVED_PATHS};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BindAddress(String),
    LogLevel(String),
    ZeroQueueCapacity,
    ZeroBatchSize,
    ZeroFlushInterval,
    ZeroShutdownTimeout,
    EmptyPath { index: usize },
    RelativePath { index: usize, path: String },
    PatternPath { index: usize, path: String },
    ReservedPath { index: usize, path: String },
    Method { index: usize, method: String },
    TargetUrl { index: usize, url: String, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BindAddress(addr) => write!(f, "invalid bind address '{}'", addr),
            ValidationError::LogLevel(level) => write!(f, "invalid log level '{}'", level),
            ValidationError::ZeroQueueCapacity => write!(f, "logging.queue_capacity must be at least 1"),
            ValidationError::ZeroBatchSize => write!(f, "logging.batch_size must be at least 1"),
            ValidationError::ZeroFlushInterval => write!(f, "logging.flush_interval_secs must be at least 1"),
            ValidationError::ZeroShutdownTimeout => write!(f, "server.shutdown_timeout_secs must be at least 1"),
            ValidationError::EmptyPath { index } => write!(f, "routes[{}]: path is empty", index),
            ValidationError::RelativePath { index, path } => {
                write!(f, "routes[{}]: path '{}' must start with '/'", index, path)
            }
            ValidationError::PatternPath { index, path } => {
                write!(f, "routes[{}]: path '{}' must be an exact path (no '{{', '}}' or '*')", index, path)
            }
            ValidationError::ReservedPath { index, path } => {
                write!(f, "routes[{}]: path '{}' is reserved by the gateway", index, path)
            }
            ValidationError::Method { index, method } => {
                write!(f, "routes[{}]: unsupported method '{}'", index, method)
            }
            ValidationError::TargetUrl { index, url, reason } => {
                write!(f, "routes[{}]: invalid target url '{}': {}", index, url, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    let logging = &config.logging;
    if EnvFilter::try_new(&logging.level).is_err() {
        errors.push(ValidationError::LogLevel(logging.level.clone()));
    }
    if logging.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if logging.batch_size == 0 {
        errors.push(ValidationError::ZeroBatchSize);
    }
    if logging.flush_interval_secs == 0 {
        errors.push(ValidationError::ZeroFlushInterval);
    }

    for (index, route) in config.routes.iter().enumerate() {
        validate_route(index, route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(index: usize, route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let path = route.path.as_str();
    if path.is_empty() {
        errors.push(ValidationError::EmptyPath { index });
    } else if !path.starts_with('/') {
        errors.push(ValidationError::RelativePath { index, path: path.to_string() });
    } else if is_pattern_path(path) {
        errors.push(ValidationError::PatternPath { index, path: path.to_string() });
    } else if RESERVED_PATHS.contains(&path) {
        errors.push(ValidationError::ReservedPath { index, path: path.to_string() });
    }

    let method_ok = Method::from_bytes(route.method.to_ascii_uppercase().as_bytes())
        .ok()
        .and_then(|m| method_filter(&m))
        .is_some();
    if !method_ok {
        errors.push(ValidationError::Method { index, method: route.method.clone() });
    }

    match Url::parse(&route.target_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::TargetUrl {
            index,
            url: route.target_url.clone(),
            reason: format!("scheme '{}' is not supported, use http or https", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::TargetUrl {
            index,
            url: route.target_url.clone(),
            reason: e.to_string(),
        }),
    }
}
