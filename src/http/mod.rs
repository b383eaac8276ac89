//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, gateway endpoints, 404 fallback)
//!     → routing dispatcher (exact path + method)
//!     → middleware/auth.rs (optional credential gate)
//!     → middleware/instrumentation.rs (metrics + access log)
//!     → proxy forwarder
//!     → capture.rs (status + byte count as the body streams out)
//!     → Send to client
//! ```

pub mod capture;
pub mod middleware;
pub mod server;

pub use capture::ResponseCapture;
pub use server::{Gateway, ServerError};
