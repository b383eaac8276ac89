//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Instrumentation wrapper (per request):
//!     → metrics.rs  (counters, gauges, histograms via RequestMetrics)
//!     → entry.rs    (RequestRecord → LogEntry)
//!     → pipeline.rs (bounded queue, single worker, batched flush)
//!     → sink.rs     (TracingSink → logging.rs subscriber)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → GET /metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request logging never blocks the request path (entries are shed when full)
//! - Metrics live in an explicit registry owned by the gateway
//! - `testing` holds in-memory fakes for sinks, access logs and metrics

pub mod entry;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod testing;

pub use entry::{LogEntry, LogLevel, RequestRecord};
pub use metrics::{GatewayMetrics, MetricsError, MetricsRegistry, RequestMetrics};
pub use pipeline::{AccessLog, EnqueueError, LogPipeline, LogPipelineHandle, PipelineConfig, PipelineState};
pub use sink::{LogSink, SinkError, TracingSink};
