//! Shutdown coordination.
//!
//! The server is stopped first, bounded by a deadline; the log pipeline is
//! drained afterwards and is not bounded by that deadline.

use std::future::Future;
use std::time::Duration;

/// Errors surfaced to the process owner while stopping.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("graceful shutdown did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("server task failed: {0}")]
    Server(#[from] crate::http::ServerError),

    #[error("server task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Await `drain`, giving up after `deadline`.
pub async fn within_deadline<F: Future>(deadline: Duration, drain: F) -> Result<F::Output, ShutdownError> {
    tokio::time::timeout(deadline, drain)
        .await
        .map_err(|_| ShutdownError::DeadlineExceeded(deadline))
}
