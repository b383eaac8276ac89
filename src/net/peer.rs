//! Client address resolution.
//!
//! The listener records the peer address as `ConnectInfo<SocketAddr>`;
//! in-process routers may supply it through `MockConnectInfo` instead.
//! Both are resolved through the `ConnectInfo` extractor.

use std::net::SocketAddr;

use axum::{body::Body, extract::ConnectInfo, http::Request, RequestExt};

/// Peer address of the connection that carried `request`, if known.
pub async fn peer_addr(request: &mut Request<Body>) -> Option<SocketAddr> {
    request
        .extract_parts::<ConnectInfo<SocketAddr>>()
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr)
}
