use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;

use super::state::AppState;
use crate::error::AppError;

/// Per-client-IP request limiter
pub struct IpRateLimiter {
    inner: RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>,
}

impl IpRateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            inner: RateLimiter::keyed(quota),
        }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.inner.check_key(&ip).is_ok()
    }

    /// Drops keys whose quota has fully replenished.
    pub fn retain_recent(&self) {
        self.inner.retain_recent();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Client address used as the limiter key.
///
/// The socket peer is used unless `trust_proxy_headers` is set, in which case the
/// first `X-Forwarded-For` hop wins, then `X-Real-IP`.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> IpAddr {
    let peer_ip = peer
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    if !trust_proxy_headers {
        return peer_ip;
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).unwrap_or(peer_ip)
}

/// Middleware guarding the login/OTP routes
pub async fn limit_auth_requests(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(
        request.headers(),
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy_headers,
    );

    if !state.auth_limiter.check(ip) {
        tracing::warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_limiter_exhausts_per_ip() {
        let limiter = IpRateLimiter::per_minute(2);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(a));
        assert!(limiter.check(a));
        assert!(!limiter.check(a));
        assert!(limiter.check(b));
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let limiter = IpRateLimiter::per_minute(0);
        assert!(limiter.check(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn test_retain_recent_keeps_exhausted_keys() {
        let limiter = IpRateLimiter::per_minute(1);
        let ip: IpAddr = "10.0.0.3".parse().unwrap();

        assert!(limiter.check(ip));
        assert_eq!(limiter.len(), 1);

        // Still inside its window, so the key must survive pruning
        limiter.retain_recent();
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.check(ip));
    }

    #[test]
    fn test_client_ip_ignores_forwarding_headers_by_default() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));

        assert_eq!(client_ip(&headers, Some(peer), false), peer.ip());
        assert_eq!(
            client_ip(&headers, None, false),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_client_ip_precedence_behind_trusted_proxy() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer), true), peer.ip());
        assert_eq!(client_ip(&headers, None, true), IpAddr::V4(Ipv4Addr::LOCALHOST));

        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_ip(&headers, Some(peer), true).to_string(), "203.0.113.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer), true).to_string(), "198.51.100.7");
    }
}
