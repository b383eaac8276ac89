//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the outbound request from the inbound request and a route
//! - Execute it on the shared HTTP client
//! - Stream the upstream response back untouched
//!
//! # Design Decisions
//! - Upstream status codes (4xx/5xx included) pass through verbatim
//! - Bodies stream in both directions; nothing is buffered
//! - Construction failures → 500, transport failures → 502
//! - `http` and `https` targets share one pool; TLS trusts the webpki roots

use axum::{
    body::Body,
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::net::peer_addr;
use crate::proxy::headers::{append_forwarding_headers, copy_request_headers, ForwardedProto};
use crate::routing::route::Route;

/// Forwards requests to route targets over a shared connection pool.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    proto: ForwardedProto,
}

impl Forwarder {
    pub fn new(proto: ForwardedProto) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, proto }
    }

    /// Forward `request` to `route.target_url` and relay the result.
    pub async fn forward(&self, route: &Route, mut request: Request<Body>) -> Response {
        let client_addr = peer_addr(&mut request).await;
        let (parts, body) = request.into_parts();
        let host = parts
            .headers
            .get(header::HOST)
            .cloned()
            .or_else(|| parts.uri.authority().and_then(|a| a.as_str().parse().ok()));

        let uri = match route.target_url.parse::<Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(target_url = %route.target_url, error = %e, "Invalid upstream URL");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error creating request").into_response();
            }
        };

        let mut outbound = match Request::builder().method(parts.method).uri(uri).body(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(target_url = %route.target_url, error = %e, "Failed to build upstream request");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error creating request").into_response();
            }
        };
        copy_request_headers(&parts.headers, outbound.headers_mut());
        append_forwarding_headers(outbound.headers_mut(), client_addr, host.as_ref(), self.proto);

        match self.client.request(outbound).await {
            Ok(response) => {
                tracing::debug!(
                    target_url = %route.target_url,
                    status = %response.status(),
                    "Upstream responded"
                );
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(target_url = %route.target_url, error = %e, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, "Error forwarding request").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{connect_info::MockConnectInfo, ConnectInfo},
        http::HeaderMap,
        routing::any,
        Router,
    };
    use tokio::net::TcpListener;

    async fn upstream(seen: Arc<Mutex<Option<(String, HeaderMap)>>>) -> SocketAddr {
        let app = Router::new().route(
            "/svc",
            any(move |req: Request<Body>| {
                let seen = seen.clone();
                async move {
                    let method = req.method().to_string();
                    let headers = req.headers().clone();
                    let body = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
                    *seen.lock().unwrap() = Some((method, headers));
                    (StatusCode::SERVICE_UNAVAILABLE, [("x-upstream", "1")], body)
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn route(target_url: String) -> Route {
        Route {
            path: "/orders".into(),
            target_url,
            method: axum::http::Method::POST,
            require_auth: false,
        }
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let seen = Arc::new(Mutex::new(None));
        let addr = upstream(seen.clone()).await;
        let forwarder = Forwarder::new(ForwardedProto::Http);

        let mut request = Request::post("/orders")
            .header(header::HOST, "gateway.local")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .body(Body::from("payload"))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        let response = forwarder
            .forward(&route(format!("http://{addr}/svc")), request)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["x-upstream"], "1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"payload");

        let (method, headers) = seen.lock().unwrap().take().unwrap();
        assert_eq!(method, "POST");
        let tags: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, ["a", "b"]);
        assert_eq!(headers["x-forwarded-for"], "192.0.2.1:4000");
        assert_eq!(headers["x-forwarded-host"], "gateway.local");
        assert_eq!(headers["x-forwarded-proto"], "http");
    }

    #[tokio::test]
    async fn connection_refused_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = Forwarder::new(ForwardedProto::Http);
        let request = Request::post("/orders").body(Body::empty()).unwrap();
        let response = forwarder.forward(&route(format!("http://{addr}/svc")), request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Error forwarding request");
    }

    #[tokio::test]
    async fn unparsable_target_is_server_error() {
        let forwarder = Forwarder::new(ForwardedProto::Http);
        let request = Request::post("/orders").body(Body::empty()).unwrap();
        let response = forwarder.forward(&route("http://bad host/".into()), request).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Error creating request");
    }

    #[tokio::test]
    async fn mock_connect_info_feeds_forwarded_for() {
        let seen = Arc::new(Mutex::new(None));
        let addr = upstream(seen.clone()).await;
        let forwarder = Forwarder::new(ForwardedProto::Http);

        let mut request = Request::post("/orders").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(MockConnectInfo(SocketAddr::from(([198, 51, 100, 4], 7000))));
        forwarder.forward(&route(format!("http://{addr}/svc")), request).await;

        let (_, headers) = seen.lock().unwrap().take().unwrap();
        assert_eq!(headers["x-forwarded-for"], "198.51.100.4:7000");
    }

    #[tokio::test]
    async fn https_target_without_tls_peer_is_bad_gateway() {
        // A plain HTTP listener cannot complete the TLS handshake.
        let seen = Arc::new(Mutex::new(None));
        let addr = upstream(seen.clone()).await;
        let forwarder = Forwarder::new(ForwardedProto::Http);

        let request = Request::post("/orders").body(Body::empty()).unwrap();
        let response = forwarder.forward(&route(format!("https://{addr}/svc")), request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(seen.lock().unwrap().is_none());
    }
}
