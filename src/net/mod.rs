//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → axum-server listener (plain or rustls)
//!     → tls.rs (certificate + key loading when TLS is configured)
//!     → peer.rs (client address for logs and forwarding headers)
//!     → Hand off to HTTP layer
//! ```

pub mod peer;
pub mod tls;

pub use peer::peer_addr;
pub use tls::load_tls_config;
