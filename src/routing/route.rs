//! Route definitions.

use axum::http::Method;
use axum::routing::MethodFilter;

use crate::config::RouteConfig;

/// Paths owned by the gateway itself; configured routes may not shadow them.
pub const RESERVED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// An immutable entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Exact inbound path.
    pub path: String,
    /// Absolute upstream URL; used verbatim as the outbound request URI.
    pub target_url: String,
    /// Inbound method this route answers to.
    pub method: Method,
    /// Whether the authorization gate runs before forwarding.
    pub require_auth: bool,
}

impl Route {
    /// Build a route from its configuration entry. Method names are case-insensitive.
    pub fn from_config(config: &RouteConfig) -> Option<Self> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes()).ok()?;
        Some(Self {
            path: config.path.clone(),
            target_url: config.target_url.clone(),
            method,
            require_auth: config.require_auth,
        })
    }
}

/// True if `path` uses capture, wildcard or legacy `:param` syntax.
pub fn is_pattern_path(path: &str) -> bool {
    path.contains(['{', '}', '*']) || path.split('/').any(|segment| segment.starts_with(':'))
}

/// True for a literal absolute path that is not owned by the gateway.
pub fn is_routable_path(path: &str) -> bool {
    path.starts_with('/') && !is_pattern_path(path) && !RESERVED_PATHS.contains(&path)
}

/// Map a method to the dispatcher's filter, if the dispatcher can register it.
pub fn method_filter(method: &Method) -> Option<MethodFilter> {
    let filter = match *method {
        Method::GET => MethodFilter::GET,
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::DELETE => MethodFilter::DELETE,
        Method::PATCH => MethodFilter::PATCH,
        Method::HEAD => MethodFilter::HEAD,
        Method::OPTIONS => MethodFilter::OPTIONS,
        Method::TRACE => MethodFilter::TRACE,
        _ => return None,
    };
    Some(filter)
}
