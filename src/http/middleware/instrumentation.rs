//! Per-request instrumentation.
//!
//! # Responsibilities
//! - Track active requests per (method, path)
//! - Observe request size, response size and latency
//! - Count requests by status
//! - Emit exactly one access-log record per request
//!
//! # Data Flow
//! ```text
//! request → gauge +1, request size, start timer
//!     → next handler
//!     → ResponseCapture wraps the response body
//!     → body finished or dropped → CompletionGuard::drop
//!         → duration, count{status}, response size, gauge -1
//!         → RequestRecord → AccessLog::record
//! ```
//!
//! # Design Decisions
//! - Completion is tied to the response body, so streamed bytes are counted
//! - The guard runs on every exit path, including cancellation and panics
//! - A request that never produced a response is recorded as 500

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::http::capture::ResponseCapture;
use crate::net::peer_addr;
use crate::observability::entry::RequestRecord;
use crate::observability::metrics::RequestMetrics;
use crate::observability::pipeline::AccessLog;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Collaborators shared by every instrumented route.
#[derive(Clone)]
pub struct Instrumentation {
    metrics: Arc<dyn RequestMetrics>,
    access_log: Arc<dyn AccessLog>,
}

impl Instrumentation {
    pub fn new(metrics: Arc<dyn RequestMetrics>, access_log: Arc<dyn AccessLog>) -> Self {
        Self { metrics, access_log }
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Declared request body size, 0 when absent or unparsable.
fn request_size(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Middleware entry point; install with `from_fn_with_state`.
pub async fn instrument(
    State(instrumentation): State<Instrumentation>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let remote_addr = peer_addr(&mut request)
        .await
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    let headers = request.headers();
    let user_agent = header_string(headers, &header::USER_AGENT);
    let request_id = header_string(headers, &X_REQUEST_ID);
    let size = request_size(headers);

    instrumentation.metrics.increment_active_connections(&method, &path);
    instrumentation.metrics.observe_request_size(&method, &path, size as f64);

    let capture = Arc::new(ResponseCapture::new());
    let mut guard = CompletionGuard {
        instrumentation,
        capture: Arc::clone(&capture),
        start: Instant::now(),
        method,
        path,
        remote_addr,
        user_agent,
        request_id,
        responded: false,
    };

    let response = next.run(request).await;
    guard.responded = true;
    capture.wrap(response, guard)
}

/// Finishes the request's metrics and log record when dropped.
struct CompletionGuard {
    instrumentation: Instrumentation,
    capture: Arc<ResponseCapture>,
    start: Instant,
    method: String,
    path: String,
    remote_addr: String,
    user_agent: String,
    request_id: String,
    responded: bool,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.responded {
            self.capture.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }

        let duration = self.start.elapsed();
        let status = self.capture.status();
        let response_size = self.capture.bytes_written();
        let metrics = &self.instrumentation.metrics;

        metrics.observe_request_duration(&self.method, &self.path, duration.as_secs_f64());
        metrics.increment_request_count(&self.method, &self.path, &status.to_string());
        metrics.observe_response_size(&self.method, &self.path, response_size as f64);
        metrics.decrement_active_connections(&self.method, &self.path);

        let record = RequestRecord {
            timestamp: Utc::now(),
            method: std::mem::take(&mut self.method),
            path: std::mem::take(&mut self.path),
            remote_addr: std::mem::take(&mut self.remote_addr),
            duration,
            status,
            user_agent: std::mem::take(&mut self.user_agent),
            request_id: std::mem::take(&mut self.request_id),
            response_size,
        };
        self.instrumentation.access_log.record(record.into_entry());
    }
}
