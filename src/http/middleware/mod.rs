//! Request middleware applied per route.
//!
//! Layer order on a route: `auth` (if required) → `instrumentation` → forwarder.

pub mod auth;
pub mod instrumentation;

pub use auth::{check_credentials, require_auth, GateRejection};
pub use instrumentation::{instrument, Instrumentation, X_REQUEST_ID};
