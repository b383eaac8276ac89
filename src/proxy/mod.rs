//! Upstream proxying subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request + Route
//!     → headers.rs (copy inbound headers, append X-Forwarded-*)
//!     → forwarder.rs (shared hyper client, stream response back)
//! ```

pub mod forwarder;
pub mod headers;

pub use forwarder::Forwarder;
pub use headers::ForwardedProto;
