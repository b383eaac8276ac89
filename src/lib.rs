//! API Gateway Library
//!
//! A static-route HTTP gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                     API GATEWAY                       │
//!                        │                                                       │
//!   Client Request       │  ┌─────────┐    ┌──────────┐    ┌──────────────┐     │
//!   ─────────────────────┼─▶│  http   │───▶│ routing  │───▶│  auth gate   │     │
//!                        │  │ server  │    │ (exact)  │    │  (optional)  │     │
//!                        │  └─────────┘    └──────────┘    └──────┬───────┘     │
//!                        │                                        ▼             │
//!                        │                                ┌──────────────┐      │
//!                        │                                │instrumenta-  │      │
//!                        │                                │tion + capture│      │
//!                        │                                └──────┬───────┘      │
//!                        │                                       ▼              │
//!   Client Response      │                                ┌──────────────┐      │
//!   ◀────────────────────┼────────────────────────────────│    proxy     │◀─────┼── Upstream
//!                        │                                │  forwarder   │      │
//!                        │                                └──────────────┘      │
//!                        │  ┌────────────────────────────────────────────────┐  │
//!                        │  │              Cross-Cutting Concerns             │  │
//!                        │  │  ┌────────┐ ┌──────────────────────┐ ┌───────┐ │  │
//!                        │  │  │ config │ │ observability        │ │ life- │ │  │
//!                        │  │  │        │ │ metrics + log queue  │ │ cycle │ │  │
//!                        │  │  └────────┘ └──────────────────────┘ └───────┘ │  │
//!                        │  └────────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::Gateway;
pub use observability::pipeline::LogPipeline;
