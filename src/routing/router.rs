//! Route table compilation and dispatch.
//!
//! # Responsibilities
//! - Turn the route table into one handler chain per (path, method)
//! - Compose each chain in fixed order: auth gate → instrumentation → forward
//!
//! # Design Decisions
//! - Built once at startup, immutable at runtime
//! - Exact path matching only; no prefixes, captures or wildcards
//! - Duplicate (path, method) entries: first declaration wins
//! - Chain layers are route layers, so 404/405 responses skip them

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware,
    response::Response,
    routing::{on, MethodRouter},
    Router,
};
use tracing::{debug, warn};

use crate::http::middleware::{instrument, require_auth, Instrumentation};
use crate::proxy::Forwarder;
use crate::routing::route::{is_routable_path, method_filter, Route};

#[derive(Clone)]
struct RouteTarget {
    route: Arc<Route>,
    forwarder: Forwarder,
}

async fn forward(State(target): State<RouteTarget>, request: Request<Body>) -> Response {
    target.forwarder.forward(&target.route, request).await
}

/// Build the handler chain for a single route.
pub fn route_chain(route: Route, forwarder: Forwarder, instrumentation: Instrumentation) -> Option<MethodRouter> {
    let filter = method_filter(&route.method)?;
    let target = RouteTarget {
        route: Arc::new(route),
        forwarder,
    };
    let require = target.route.require_auth;

    let chain = on(filter, forward)
        .with_state(target)
        .route_layer(middleware::from_fn_with_state(instrumentation, instrument));

    Some(if require {
        chain.route_layer(middleware::from_fn(require_auth))
    } else {
        chain
    })
}

/// Register every route in declaration order.
pub fn build_dispatcher(routes: &[Route], forwarder: &Forwarder, instrumentation: &Instrumentation) -> Router {
    let mut router = Router::new();
    let mut registered: HashSet<(&str, &Method)> = HashSet::new();

    for route in routes {
        if !is_routable_path(&route.path) {
            warn!(path = %route.path, "Skipping route with unroutable path");
            continue;
        }
        if !registered.insert((route.path.as_str(), &route.method)) {
            warn!(path = %route.path, method = %route.method, "Duplicate route ignored");
            continue;
        }
        let Some(chain) = route_chain(route.clone(), forwarder.clone(), instrumentation.clone()) else {
            warn!(path = %route.path, method = %route.method, "Skipping route with unsupported method");
            continue;
        };

        debug!(
            path = %route.path,
            method = %route.method,
            target_url = %route.target_url,
            require_auth = route.require_auth,
            "Route registered"
        );
        router = router.route(&route.path, chain);
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    use crate::observability::testing::{MemoryAccessLog, RecordingMetrics};
    use crate::proxy::ForwardedProto;

    fn route(path: &str, method: Method, require_auth: bool, target: SocketAddr) -> Route {
        Route {
            path: path.into(),
            target_url: format!("http://{target}/"),
            method,
            require_auth,
        }
    }

    fn dispatcher(routes: &[Route], log: &MemoryAccessLog) -> Router {
        let instrumentation = Instrumentation::new(Arc::new(RecordingMetrics::new()), Arc::new(log.clone()));
        build_dispatcher(routes, &Forwarder::new(ForwardedProto::Http), &instrumentation)
    }

    // Nothing listens on port 9 locally; forwarded requests end in 502.
    fn closed() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 9))
    }

    async fn status(app: &Router, request: Request<Body>) -> StatusCode {
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_wrong_method_is_405() {
        let log = MemoryAccessLog::new();
        let app = dispatcher(&[route("/orders", Method::GET, false, closed())], &log);

        let missing = status(&app, Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(missing, StatusCode::NOT_FOUND);

        let wrong = status(&app, Request::delete("/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(wrong, StatusCode::METHOD_NOT_ALLOWED);

        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn same_path_registers_each_method() {
        let log = MemoryAccessLog::new();
        let app = dispatcher(
            &[
                route("/orders", Method::GET, true, closed()),
                route("/orders", Method::POST, false, closed()),
            ],
            &log,
        );

        let get = status(&app, Request::get("/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(get, StatusCode::UNAUTHORIZED);

        let post = status(&app, Request::post("/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(post, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn first_duplicate_wins() {
        let log = MemoryAccessLog::new();
        let app = dispatcher(
            &[
                route("/orders", Method::GET, true, closed()),
                route("/orders", Method::GET, false, closed()),
            ],
            &log,
        );

        let get = status(&app, Request::get("/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(get, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gate_runs_before_instrumentation() {
        let log = MemoryAccessLog::new();
        let app = dispatcher(&[route("/orders", Method::GET, true, closed())], &log);

        let denied = status(&app, Request::get("/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(denied, StatusCode::UNAUTHORIZED);
        assert!(log.entries().is_empty());

        let response = app
            .oneshot(
                Request::get("/orders")
                    .header(header::AUTHORIZATION, "Bearer abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn unroutable_entries_are_skipped() {
        let log = MemoryAccessLog::new();
        // Would panic inside axum if registered.
        let _ = dispatcher(
            &[
                route("/items/{id}", Method::GET, false, closed()),
                route("/health", Method::GET, false, closed()),
                route("relative", Method::GET, false, closed()),
            ],
            &log,
        );
    }
}
