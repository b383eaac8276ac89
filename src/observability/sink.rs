//! Destinations for flushed request-log batches.

use std::future::Future;

use crate::observability::entry::{LogEntry, LogLevel};

/// Error returned by a sink that could not persist a batch.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected batch: {0}")]
    Rejected(String),
}

/// Receives batches of log entries from the pipeline worker.
///
/// Entries arrive in enqueue order. The worker owns the sink exclusively,
/// so implementations need no internal locking.
pub trait LogSink: Send + 'static {
    fn write_batch(&mut self, batch: &[LogEntry]) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Emits every entry as a `tracing` event on the `access` target.
///
/// The installed subscriber decides the final format and destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    async fn write_batch(&mut self, batch: &[LogEntry]) -> Result<(), SinkError> {
        for entry in batch {
            let fields = entry.fields_json();
            match entry.level() {
                LogLevel::Info => tracing::info!(target: "access", fields = %fields, "{}", entry.message()),
                LogLevel::Warn => tracing::warn!(target: "access", fields = %fields, "{}", entry.message()),
                LogLevel::Error => tracing::error!(target: "access", fields = %fields, "{}", entry.message()),
            }
        }
        Ok(())
    }
}
