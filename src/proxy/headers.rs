//! Header copying and forwarding headers.
//!
//! # Responsibilities
//! - Copy inbound request headers to the upstream request
//! - Append X-Forwarded-For, X-Forwarded-Host, X-Forwarded-Proto
//!
//! # Design Decisions
//! - Headers are appended, never replaced: multi-valued headers keep every
//!   value in order and client-sent X-Forwarded-* values stay in place
//! - `Host` is not copied; the client derives it from the target URL

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Scheme the gateway itself was reached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardedProto {
    Http,
    Https,
}

impl ForwardedProto {
    pub fn as_str(self) -> &'static str {
        match self {
            ForwardedProto::Http => "http",
            ForwardedProto::Https => "https",
        }
    }
}

/// Append every header in `src` except `Host` to `dst`.
pub fn copy_request_headers(src: &HeaderMap, dst: &mut HeaderMap) {
    for (name, value) in src {
        if name == header::HOST {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
}

/// Append the three forwarding headers.
///
/// Unknown client address or host produce empty values so the set is always complete.
pub fn append_forwarding_headers(
    dst: &mut HeaderMap,
    client_addr: Option<SocketAddr>,
    host: Option<&HeaderValue>,
    proto: ForwardedProto,
) {
    let client = client_addr
        .and_then(|addr| HeaderValue::from_str(&addr.to_string()).ok())
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let host = host.cloned().unwrap_or_else(|| HeaderValue::from_static(""));

    dst.append(X_FORWARDED_FOR, client);
    dst.append(X_FORWARDED_HOST, host);
    dst.append(X_FORWARDED_PROTO, HeaderValue::from_static(proto.as_str()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_multi_valued_headers_in_order_without_host() {
        let mut src = HeaderMap::new();
        src.insert(header::HOST, "gateway.local".parse().unwrap());
        src.append("x-tag", "a".parse().unwrap());
        src.append("x-tag", "b".parse().unwrap());
        src.insert(header::ACCEPT, "application/json".parse().unwrap());

        let mut dst = HeaderMap::new();
        copy_request_headers(&src, &mut dst);

        assert!(dst.get(header::HOST).is_none());
        let tags: Vec<_> = dst.get_all("x-tag").iter().collect();
        assert_eq!(tags, ["a", "b"]);
        assert_eq!(dst[header::ACCEPT], "application/json");
    }

    #[test]
    fn forwarding_headers_are_appended_after_client_values() {
        let mut dst = HeaderMap::new();
        dst.append(X_FORWARDED_FOR, "203.0.113.9".parse().unwrap());

        let host = HeaderValue::from_static("gateway.local:8080");
        append_forwarding_headers(
            &mut dst,
            Some(SocketAddr::from(([127, 0, 0, 1], 5555))),
            Some(&host),
            ForwardedProto::Https,
        );

        let xff: Vec<_> = dst.get_all(X_FORWARDED_FOR).iter().collect();
        assert_eq!(xff, ["203.0.113.9", "127.0.0.1:5555"]);
        assert_eq!(dst[X_FORWARDED_HOST], "gateway.local:8080");
        assert_eq!(dst[X_FORWARDED_PROTO], "https");
    }

    #[test]
    fn missing_inputs_still_produce_three_headers() {
        let mut dst = HeaderMap::new();
        append_forwarding_headers(&mut dst, None, None, ForwardedProto::Http);

        assert_eq!(dst.len(), 3);
        assert_eq!(dst[X_FORWARDED_FOR], "");
        assert_eq!(dst[X_FORWARDED_PROTO], "http");
    }
}
