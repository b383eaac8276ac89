//! Authorization gate.
//!
//! Presence and scheme-prefix check on the `Authorization` header. The
//! credential itself is never validated.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Scheme prefix the credential must start with.
pub const AUTH_SCHEME_PREFIX: &str = "Bearer ";

/// Shortest accepted header value: the prefix plus at least one token byte.
pub const MIN_CREDENTIAL_LEN: usize = AUTH_SCHEME_PREFIX.len() + 1;

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    Missing,
    TooShort,
    WrongScheme,
}

/// Check the first `Authorization` value for presence, length and prefix.
pub fn check_credentials(headers: &HeaderMap) -> Result<(), GateRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .map(|v| v.as_bytes())
        .filter(|v| !v.is_empty())
        .ok_or(GateRejection::Missing)?;

    if value.len() < MIN_CREDENTIAL_LEN {
        return Err(GateRejection::TooShort);
    }
    if !value.starts_with(AUTH_SCHEME_PREFIX.as_bytes()) {
        return Err(GateRejection::WrongScheme);
    }
    Ok(())
}

/// Reject with 401 before the wrapped handler runs when the check fails.
pub async fn require_auth(req: Request<Body>, next: Next) -> Response {
    match check_credentials(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(reason) => {
            tracing::debug!(path = %req.uri().path(), ?reason, "Request rejected by auth gate");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
