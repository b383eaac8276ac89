//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → drain in-flight requests (deadline) → force close
//!     → drain log pipeline → final log line
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: server first, then log pipeline
//! - Server shutdown has a deadline; exceeding it is an error
//! - Log pipeline drain is awaited so the final line follows every access record

pub mod shutdown;
pub mod signals;

pub use shutdown::{within_deadline, ShutdownError};
pub use signals::shutdown_signal;
