//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (normalize method, keep declaration order)
//!     → router.rs (one handler chain per path + method)
//!     → Freeze as immutable axum Router
//!
//! Incoming Request (path, method)
//!     → exact path match, then method match
//!     → chain, or 404 / 405
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact matching only
//! - Deterministic: first declaration of a (path, method) wins

pub mod route;
pub mod router;

pub use route::Route;
pub use router::build_dispatcher;
