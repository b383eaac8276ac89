//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router: gateway endpoints plus the route dispatcher
//! - Wire up middleware (per-route chains, request tracing)
//! - Bind plain or TLS listener and serve with client connect info
//! - Stop gracefully within a caller-supplied deadline
//!
//! # Design Decisions
//! - `/health` and `/metrics` bypass the per-route chains
//! - Unknown paths answer `404 page not found`; known paths with another method answer 405
//! - The router is built once in `new`; `run` only binds and serves

use std::net::{AddrParseError, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use axum_server::Handle;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{GatewayConfig, TlsConfig};
use crate::http::middleware::Instrumentation;
use crate::lifecycle::shutdown::{within_deadline, ShutdownError};
use crate::net::tls::load_tls_config;
use crate::observability::metrics::{MetricsRegistry, RequestMetrics};
use crate::observability::pipeline::AccessLog;
use crate::proxy::{ForwardedProto, Forwarder};
use crate::routing::{build_dispatcher, Route};

/// Prometheus text exposition content type.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors from binding or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gateway is already running")]
    AlreadyStarted,
}

/// The API gateway: route table, gateway endpoints and listener.
pub struct Gateway {
    router: Router,
    bind_address: String,
    tls: Option<TlsConfig>,
    handle: Handle,
    started: AtomicBool,
    stopped: watch::Sender<bool>,
}

impl Gateway {
    /// Build the gateway router from `config`.
    ///
    /// Route entries whose method cannot be parsed are skipped with a warning.
    pub fn new(
        config: &GatewayConfig,
        access_log: Arc<dyn AccessLog>,
        metrics: Arc<dyn RequestMetrics>,
        registry: Arc<MetricsRegistry>,
    ) -> Self {
        let proto = if config.server.tls.is_some() {
            ForwardedProto::Https
        } else {
            ForwardedProto::Http
        };

        let routes: Vec<Route> = config
            .routes
            .iter()
            .filter_map(|rc| {
                let route = Route::from_config(rc);
                if route.is_none() {
                    warn!(path = %rc.path, method = %rc.method, "Skipping route with invalid method");
                }
                route
            })
            .collect();

        let instrumentation = Instrumentation::new(metrics, access_log);
        let dispatcher = build_dispatcher(&routes, &Forwarder::new(proto), &instrumentation);

        let router = Router::new()
            .route("/health", get(health))
            .route("/metrics", get(render_metrics).with_state(registry))
            .merge(dispatcher)
            .fallback(not_found)
            .layer(TraceLayer::new_for_http());

        Self {
            router,
            bind_address: config.server.bind_address.clone(),
            tls: config.server.tls.clone(),
            handle: Handle::new(),
            started: AtomicBool::new(false),
            stopped: watch::channel(false).0,
        }
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyStarted);
        }
        let result = self.serve().await;
        self.stopped.send_replace(true);
        match &result {
            Ok(()) => info!("HTTP server stopped"),
            Err(e) => warn!(error = %e, "HTTP server exited with error"),
        }
        result
    }

    async fn serve(&self) -> Result<(), ServerError> {
        let addr: SocketAddr = self.bind_address.parse().map_err(|source| ServerError::Address {
            address: self.bind_address.clone(),
            source,
        })?;
        let app = self.router.clone().into_make_service_with_connect_info::<SocketAddr>();

        match &self.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await.map_err(ServerError::Tls)?;
                info!(address = %addr, "API Gateway listening (TLS)");
                axum_server::bind_rustls(addr, rustls)
                    .handle(self.handle.clone())
                    .serve(app)
                    .await?;
            }
            None => {
                info!(address = %addr, "API Gateway listening");
                axum_server::bind(addr).handle(self.handle.clone()).serve(app).await?;
            }
        }
        Ok(())
    }

    /// Address actually bound, once listening. `None` if binding failed.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight requests.
    ///
    /// A gateway that was never started shuts down trivially. Past the deadline
    /// remaining connections are closed and `DeadlineExceeded` is returned.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ShutdownError> {
        if !self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        info!(deadline = ?deadline, "Shutting down HTTP server");
        self.handle.graceful_shutdown(None);

        let mut stopped = self.stopped.subscribe();
        let wait = async move {
            let _ = stopped.wait_for(|s| *s).await;
        };
        match within_deadline(deadline, wait).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(deadline = ?deadline, "Graceful shutdown deadline exceeded, closing connections");
                self.handle.shutdown();
                Err(e)
            }
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn render_metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], registry.render())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found")
}
