//! In-memory collaborators that record calls instead of performing I/O.
//!
//! Used by the crate's own tests and by integration tests that want to
//! assert on what the pipeline, the instrumentation layer or the sink saw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::observability::entry::LogEntry;
use crate::observability::metrics::RequestMetrics;
use crate::observability::pipeline::AccessLog;
use crate::observability::sink::{LogSink, SinkError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sink that keeps every flushed batch.
#[derive(Clone)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<LogEntry>>>>,
    fail: Arc<AtomicBool>,
    calls: Arc<watch::Sender<usize>>,
    flushed: Arc<watch::Sender<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            batches: Arc::default(),
            fail: Arc::default(),
            calls: Arc::new(watch::channel(0).0),
            flushed: Arc::new(watch::channel(0).0),
        }
    }

    /// Make subsequent writes fail (and record nothing).
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully written batches, in flush order.
    pub fn batches(&self) -> Vec<Vec<LogEntry>> {
        lock(&self.batches).clone()
    }

    /// Every successfully written entry, flattened.
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.batches).iter().flatten().cloned().collect()
    }

    /// Number of `write_batch` invocations, failed ones included.
    pub fn write_calls(&self) -> usize {
        *self.calls.borrow()
    }

    /// Wait until at least `n` batches were written successfully.
    pub async fn wait_for_batches(&self, n: usize) {
        let mut rx = self.flushed.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Wait until `write_batch` has been called at least `n` times.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    async fn write_batch(&mut self, batch: &[LogEntry]) -> Result<(), SinkError> {
        self.calls.send_modify(|c| *c += 1);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("memory sink set to fail".into()));
        }
        let total = {
            let mut batches = lock(&self.batches);
            batches.push(batch.to_vec());
            batches.len()
        };
        self.flushed.send_replace(total);
        Ok(())
    }
}

/// An access log that stores records synchronously.
#[derive(Clone, Default)]
pub struct MemoryAccessLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryAccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }
}

impl AccessLog for MemoryAccessLog {
    fn record(&self, entry: LogEntry) {
        lock(&self.entries).push(entry);
    }
}

/// One call made against [`RequestMetrics`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsCall {
    RequestCount { method: String, path: String, status: String },
    RequestDuration { method: String, path: String, seconds: f64 },
    ActiveInc { method: String, path: String },
    ActiveDec { method: String, path: String },
    RequestSize { method: String, path: String, bytes: f64 },
    ResponseSize { method: String, path: String, bytes: f64 },
}

/// A metrics sink that records every call in order.
#[derive(Clone, Default)]
pub struct RecordingMetrics {
    calls: Arc<Mutex<Vec<MetricsCall>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MetricsCall> {
        lock(&self.calls).clone()
    }

    /// Net value of the active-connections gauge for a label pair.
    pub fn active(&self, method: &str, path: &str) -> i64 {
        lock(&self.calls).iter().fold(0, |acc, call| match call {
            MetricsCall::ActiveInc { method: m, path: p } if m == method && p == path => acc + 1,
            MetricsCall::ActiveDec { method: m, path: p } if m == method && p == path => acc - 1,
            _ => acc,
        })
    }

    fn push(&self, call: MetricsCall) {
        lock(&self.calls).push(call);
    }
}

impl RequestMetrics for RecordingMetrics {
    fn increment_request_count(&self, method: &str, path: &str, status: &str) {
        self.push(MetricsCall::RequestCount {
            method: method.into(),
            path: path.into(),
            status: status.into(),
        });
    }

    fn observe_request_duration(&self, method: &str, path: &str, seconds: f64) {
        self.push(MetricsCall::RequestDuration { method: method.into(), path: path.into(), seconds });
    }

    fn increment_active_connections(&self, method: &str, path: &str) {
        self.push(MetricsCall::ActiveInc { method: method.into(), path: path.into() });
    }

    fn decrement_active_connections(&self, method: &str, path: &str) {
        self.push(MetricsCall::ActiveDec { method: method.into(), path: path.into() });
    }

    fn observe_request_size(&self, method: &str, path: &str, bytes: f64) {
        self.push(MetricsCall::RequestSize { method: method.into(), path: path.into(), bytes });
    }

    fn observe_response_size(&self, method: &str, path: &str, bytes: f64) {
        self.push(MetricsCall::ResponseSize { method: method.into(), path: path.into(), bytes });
    }
}
