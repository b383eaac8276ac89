//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_gateway::config::{GatewayConfig, RouteConfig};
use api_gateway::observability::metrics::{GatewayMetrics, MetricsRegistry};
use api_gateway::observability::pipeline::AccessLog;
use api_gateway::observability::testing::MemoryAccessLog;
use api_gateway::Gateway;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// One request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub type Seen = Arc<Mutex<Vec<SeenRequest>>>;

/// Start a mock upstream that records every request and answers `status` + `body`.
pub async fn start_upstream(status: u16, body: &'static str) -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let record = seen.clone();
    let app = Router::new().fallback(move |req: Request<Body>| {
        let record = record.clone();
        async move {
            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let headers = req.headers().clone();
            let bytes = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
            record.lock().unwrap().push(SeenRequest {
                method,
                path,
                headers,
                body: bytes.to_vec(),
            });
            (StatusCode::from_u16(status).unwrap(), [("x-upstream", "mock")], body)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

/// Start an upstream that accepts requests but never answers.
///
/// The returned `Notify` fires as each request arrives.
pub async fn start_stalled_upstream() -> (SocketAddr, Arc<Notify>) {
    let arrived = Arc::new(Notify::new());
    let signal = arrived.clone();
    let app = Router::new().fallback(move || {
        let signal = signal.clone();
        async move {
            signal.notify_one();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "late"
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, arrived)
}

/// An address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn route(path: &str, method: &str, target_url: String, require_auth: bool) -> RouteConfig {
    RouteConfig {
        path: path.into(),
        target_url,
        method: method.into(),
        require_auth,
    }
}

/// A gateway served on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub registry: Arc<MetricsRegistry>,
    pub server: JoinHandle<Result<(), api_gateway::http::ServerError>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway for `routes` that records access-log entries into `log`.
pub async fn start_gateway_with(routes: Vec<RouteConfig>, log: Arc<dyn AccessLog>) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.server.bind_address = "127.0.0.1:0".into();
    config.routes = routes;

    let registry = Arc::new(MetricsRegistry::new().unwrap());
    let metrics = Arc::new(GatewayMetrics::new(registry.clone()).unwrap());
    let gateway = Arc::new(Gateway::new(&config, log, metrics, registry.clone()));

    let server = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.run().await }
    });
    let addr = gateway.listening().await.expect("gateway failed to bind");

    TestGateway {
        addr,
        gateway,
        registry,
        server,
    }
}

pub async fn start_gateway(routes: Vec<RouteConfig>) -> (TestGateway, MemoryAccessLog) {
    let log = MemoryAccessLog::new();
    let gateway = start_gateway_with(routes, Arc::new(log.clone())).await;
    (gateway, log)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
