use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{envelope::ApiError, store::WhitelistedIp, AppState};

/// Axum middleware that admits only callers whose IP is on the whitelist.
/// Used for machine-to-machine callbacks that carry no session.
pub async fn require_whitelisted_ip(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(&request, state.trust_proxy) else {
        return ApiError::Forbidden("caller address unknown".into()).into_response();
    };
    let ip = ip.to_string();

    match state.store.list::<WhitelistedIp>(|w| w.ip == ip) {
        Ok(found) if !found.is_empty() => next.run(request).await,
        Ok(_) => {
            warn!(%ip, path = %request.uri().path(), "rejected non-whitelisted caller");
            ApiError::Forbidden(format!("{ip} is not whitelisted")).into_response()
        }
        Err(e) => ApiError::Internal(e).into_response(),
    }
}

/// IPv4-mapped IPv6 addresses come back as plain IPv4 so they match the
/// dotted-quad whitelist entries.
fn client_ip(request: &Request, trust_proxy: bool) -> Option<IpAddr> {
    trust_proxy
        .then(|| forwarded_for(request.headers()))
        .flatten()
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_canonical())
}

/// First hop of `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(forwarded: Option<&str>, peer: &str) -> Request {
        let mut builder = axum::http::Request::builder().uri("/payment-notifications");
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let peer: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    #[test]
    fn mapped_ipv6_peers_become_ipv4() {
        let req = request(None, "[::ffff:10.1.2.3]:4000");
        assert_eq!(client_ip(&req, false), "10.1.2.3".parse().ok());

        let req = request(Some("::ffff:41.58.1.2"), "127.0.0.1:4000");
        assert_eq!(client_ip(&req, true), "41.58.1.2".parse().ok());
    }

    #[test]
    fn forwarded_for_is_ignored_without_trust_proxy() {
        let req = request(Some("41.58.1.2"), "127.0.0.1:4000");
        assert_eq!(client_ip(&req, false), "127.0.0.1".parse().ok());
        assert_eq!(client_ip(&req, true), "41.58.1.2".parse().ok());
    }

    #[test]
    fn plain_ipv6_is_left_alone() {
        let req = request(None, "[2001:db8::1]:4000");
        assert_eq!(client_ip(&req, false), "2001:db8::1".parse().ok());
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "41.58.1.2, 10.0.0.1".parse().unwrap());
        assert_eq!(forwarded_for(&headers), "41.58.1.2".parse().ok());
    }

    #[test]
    fn garbage_forwarded_for_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "unknown".parse().unwrap());
        assert_eq!(forwarded_for(&headers), None);
    }
}
