//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own an explicit Prometheus registry (no process-global recorder)
//! - Register the gateway metric families exactly once per registry
//! - Expose the request-level label contract through [`RequestMetrics`]
//!
//! # Metrics
//! - `api_gateway_requests_total` (counter): method, path, status
//! - `api_gateway_request_duration_seconds` (histogram): method, path
//! - `api_gateway_request_size_bytes` (summary): method, path
//! - `api_gateway_response_size_bytes` (summary): method, path
//! - `api_gateway_active_connections` (gauge): method, path
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic handles inside the recorder)
//! - Duration buckets follow the usual web-latency defaults
//! - Re-registering a family is a construction error, not a panic

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use metrics::{Key, Label, Level, Metadata, Recorder, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const REQUESTS_TOTAL: &str = "api_gateway_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "api_gateway_request_duration_seconds";
pub const REQUEST_SIZE_BYTES: &str = "api_gateway_request_size_bytes";
pub const RESPONSE_SIZE_BYTES: &str = "api_gateway_response_size_bytes";
pub const ACTIVE_CONNECTIONS: &str = "api_gateway_active_connections";

/// Histogram buckets for request duration, in seconds.
pub const DURATION_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static METADATA: Metadata<'static> = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Request-level metric sink used by the instrumentation layer.
pub trait RequestMetrics: Send + Sync {
    fn increment_request_count(&self, method: &str, path: &str, status: &str);
    fn observe_request_duration(&self, method: &str, path: &str, seconds: f64);
    fn increment_active_connections(&self, method: &str, path: &str);
    fn decrement_active_connections(&self, method: &str, path: &str);
    fn observe_request_size(&self, method: &str, path: &str, bytes: f64);
    fn observe_response_size(&self, method: &str, path: &str, bytes: f64);
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric family '{0}' is already registered")]
    AlreadyRegistered(&'static str),

    #[error("failed to build metrics recorder: {0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Counter,
    Gauge,
    Histogram,
}

/// Explicit registry owning the Prometheus recorder and its render handle.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    families: Mutex<HashSet<&'static str>>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION_SECONDS.to_string()), &DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            recorder,
            handle,
            families: Mutex::new(HashSet::new()),
        })
    }

    /// Render every registered metric in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn register(&self, name: &'static str, kind: Kind, unit: Option<Unit>, help: &'static str) -> Result<(), MetricsError> {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        if !families.insert(name) {
            return Err(MetricsError::AlreadyRegistered(name));
        }
        match kind {
            Kind::Counter => self.recorder.describe_counter(name.into(), unit, help.into()),
            Kind::Gauge => self.recorder.describe_gauge(name.into(), unit, help.into()),
            Kind::Histogram => self.recorder.describe_histogram(name.into(), unit, help.into()),
        }
        Ok(())
    }
}

/// Prometheus-backed [`RequestMetrics`].
pub struct GatewayMetrics {
    registry: Arc<MetricsRegistry>,
}

impl GatewayMetrics {
    /// Register the gateway families into `registry`.
    pub fn new(registry: Arc<MetricsRegistry>) -> Result<Self, MetricsError> {
        registry.register(REQUESTS_TOTAL, Kind::Counter, None, "Total number of requests processed by the API Gateway")?;
        registry.register(REQUEST_DURATION_SECONDS, Kind::Histogram, Some(Unit::Seconds), "Request duration in seconds")?;
        registry.register(REQUEST_SIZE_BYTES, Kind::Histogram, Some(Unit::Bytes), "Request size in bytes")?;
        registry.register(RESPONSE_SIZE_BYTES, Kind::Histogram, Some(Unit::Bytes), "Response size in bytes")?;
        registry.register(ACTIVE_CONNECTIONS, Kind::Gauge, None, "Number of active connections")?;

        Ok(Self { registry })
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    fn key(name: &'static str, method: &str, path: &str) -> Key {
        Key::from_parts(
            name,
            vec![Label::new("method", method.to_owned()), Label::new("path", path.to_owned())],
        )
    }
}

impl RequestMetrics for GatewayMetrics {
    fn increment_request_count(&self, method: &str, path: &str, status: &str) {
        let key = Key::from_parts(
            REQUESTS_TOTAL,
            vec![
                Label::new("method", method.to_owned()),
                Label::new("path", path.to_owned()),
                Label::new("status", status.to_owned()),
            ],
        );
        self.registry.recorder.register_counter(&key, &METADATA).increment(1);
    }

    fn observe_request_duration(&self, method: &str, path: &str, seconds: f64) {
        let key = Self::key(REQUEST_DURATION_SECONDS, method, path);
        self.registry.recorder.register_histogram(&key, &METADATA).record(seconds);
    }

    fn increment_active_connections(&self, method: &str, path: &str) {
        let key = Self::key(ACTIVE_CONNECTIONS, method, path);
        self.registry.recorder.register_gauge(&key, &METADATA).increment(1.0);
    }

    fn decrement_active_connections(&self, method: &str, path: &str) {
        let key = Self::key(ACTIVE_CONNECTIONS, method, path);
        self.registry.recorder.register_gauge(&key, &METADATA).decrement(1.0);
    }

    fn observe_request_size(&self, method: &str, path: &str, bytes: f64) {
        let key = Self::key(REQUEST_SIZE_BYTES, method, path);
        self.registry.recorder.register_histogram(&key, &METADATA).record(bytes);
    }

    fn observe_response_size(&self, method: &str, path: &str, bytes: f64) {
        let key = Self::key(RESPONSE_SIZE_BYTES, method, path);
        self.registry.recorder.register_histogram(&key, &METADATA).record(bytes);
    }
}
