//! Asynchronous request-log pipeline.
//!
//! # Data Flow
//! ```text
//! request tasks (any number)
//!     → LogPipelineHandle::try_enqueue (non-blocking, bounded queue)
//!     → worker task (exactly one per pipeline)
//!         select { next entry | flush tick | close signal }
//!     → batch reaches batch_size, or tick with non-empty batch
//!     → LogSink::write_batch (enqueue order), batch cleared
//! ```
//!
//! # Lifecycle
//! ```text
//! Running ──close──▶ Draining ──queue exhausted + final flush──▶ Stopped
//! ```
//!
//! # Design Decisions
//! - A full queue sheds the entry; producers never wait on logging I/O
//! - The batch buffer is owned by the worker, so it needs no lock
//! - Closing the queue is the only cancellation signal; a flush is never interrupted
//! - The flush timer is injectable (`FlushClock`) so tests control time

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::config::LoggingConfig;
use crate::observability::entry::LogEntry;
use crate::observability::sink::LogSink;

/// Shortest flush period the worker will run with.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Pipeline tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            batch_size: 5,
            flush_interval: Duration::from_secs(5),
        }
    }
}

impl From<&LoggingConfig> for PipelineConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity.max(1),
            batch_size: config.batch_size.max(1),
            flush_interval: config.flush_interval().max(MIN_FLUSH_INTERVAL),
        }
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Accepting entries and flushing on size or tick.
    Running,
    /// Queue closed; buffered entries are being flushed.
    Draining,
    /// Worker exited.
    Stopped,
}

/// Why an entry was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("log queue is full")]
    QueueFull,
    #[error("log pipeline is closed")]
    Closed,
}

/// Failure while stopping the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("log worker terminated abnormally: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Producer-side capability used by the instrumentation layer.
pub trait AccessLog: Send + Sync {
    /// Submit one record. Must never block the caller.
    fn record(&self, entry: LogEntry);
}

/// Periodic flush signal for the worker.
pub trait FlushClock: Send + 'static {
    /// Resolves at the next tick. Must be cancel-safe.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Wall-clock ticker backed by `tokio::time::interval`.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    /// First tick fires one full period after creation.
    ///
    /// Periods shorter than [`MIN_FLUSH_INTERVAL`] are raised to it.
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_FLUSH_INTERVAL);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl FlushClock for IntervalClock {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// A clock that only ticks when told to.
#[derive(Debug)]
pub struct ManualClock {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Trigger side of a [`ManualClock`].
#[derive(Debug, Clone)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualClock {
    pub fn new() -> (Self, ManualTicker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTicker { tx })
    }
}

impl ManualTicker {
    pub fn tick(&self) {
        let _ = self.tx.send(());
    }
}

impl FlushClock for ManualClock {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Cloneable producer handle onto the pipeline queue.
#[derive(Debug, Clone)]
pub struct LogPipelineHandle {
    tx: mpsc::Sender<LogEntry>,
    dropped: Arc<AtomicU64>,
}

impl LogPipelineHandle {
    /// Attempt to enqueue without waiting.
    pub fn try_enqueue(&self, entry: LogEntry) -> Result<(), EnqueueError> {
        match self.tx.try_send(entry) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(EnqueueError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(EnqueueError::Closed)
            }
        }
    }

    /// Entries shed so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AccessLog for LogPipelineHandle {
    fn record(&self, entry: LogEntry) {
        if let Err(e) = self.try_enqueue(entry) {
            tracing::warn!(error = %e, dropped_total = self.dropped(), "Request log entry dropped");
        }
    }
}

/// Owner of the background worker.
pub struct LogPipeline {
    handle: LogPipelineHandle,
    close: Option<oneshot::Sender<()>>,
    worker: JoinHandle<()>,
    state: watch::Receiver<PipelineState>,
}

impl LogPipeline {
    /// Spawn the worker with a wall-clock flush timer.
    pub fn spawn<S: LogSink>(config: PipelineConfig, sink: S) -> Self {
        let clock = IntervalClock::new(config.flush_interval);
        Self::spawn_with_clock(config, sink, clock)
    }

    /// Spawn the worker with a caller-supplied flush timer.
    pub fn spawn_with_clock<S, C>(config: PipelineConfig, sink: S, clock: C) -> Self
    where
        S: LogSink,
        C: FlushClock,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (close_tx, close_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(PipelineState::Running);

        let worker = Worker {
            rx,
            sink,
            clock,
            batch: Vec::with_capacity(config.batch_size),
            batch_size: config.batch_size.max(1),
            state: state_tx,
        };
        let worker = tokio::spawn(worker.run(close_rx));

        tracing::debug!(
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "Request log pipeline started"
        );

        Self {
            handle: LogPipelineHandle {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            close: Some(close_tx),
            worker,
            state: state_rx,
        }
    }

    pub fn handle(&self) -> LogPipelineHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    pub fn dropped(&self) -> u64 {
        self.handle.dropped()
    }

    /// Close the queue and wait until every accepted entry has been flushed.
    pub async fn shutdown(mut self) -> Result<(), PipelineError> {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        self.worker.await?;
        tracing::debug!(dropped = self.handle.dropped(), "Request log pipeline stopped");
        Ok(())
    }
}

struct Worker<S, C> {
    rx: mpsc::Receiver<LogEntry>,
    sink: S,
    clock: C,
    batch: Vec<LogEntry>,
    batch_size: usize,
    state: watch::Sender<PipelineState>,
}

impl<S: LogSink, C: FlushClock> Worker<S, C> {
    async fn run(mut self, mut close: oneshot::Receiver<()>) {
        let mut closing = false;

        loop {
            tokio::select! {
                biased;

                // A dropped pipeline owner counts as a close signal.
                _ = &mut close, if !closing => {
                    closing = true;
                    self.rx.close();
                    self.state.send_replace(PipelineState::Draining);
                    tracing::debug!(buffered = self.batch.len(), "Request log pipeline draining");
                }
                received = self.rx.recv() => match received {
                    Some(entry) => {
                        self.batch.push(entry);
                        if self.batch.len() >= self.batch_size {
                            self.flush().await;
                        }
                    }
                    None => break,
                },
                _ = self.clock.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }

        self.flush().await;
        self.state.send_replace(PipelineState::Stopped);
    }

    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let count = self.batch.len();
        match self.sink.write_batch(&self.batch).await {
            Ok(()) => tracing::trace!(count, "Request log batch flushed"),
            Err(e) => tracing::error!(count, error = %e, "Request log flush failed, batch discarded"),
        }
        self.batch.clear();
    }
}
