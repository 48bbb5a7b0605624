//! Fixed-window rate limiting for the login routes, keyed by client IP.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app::errors::ApiError;
use crate::app::AppState;

/// Bucket shared by `/auth/token` and `/auth/login`.
pub const LOGIN_ROUTE: &str = "login";

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// route name -> (IP -> entry)
    inner: Arc<Mutex<HashMap<&'static str, HashMap<String, IpEntry>>>>,
}

/// Requests allowed per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the request is allowed.
    pub async fn check(&self, route: &'static str, ip: &str, limit: RateLimit) -> bool {
        let mut map = self.inner.lock().await;
        let route_map = map.entry(route).or_default();
        let now = Instant::now();

        let entry = route_map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= limit.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= limit.max_requests
    }

    /// Drop entries whose window started more than `max_age` ago.
    pub async fn cleanup(&self, max_age: Duration) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < max_age);
        }
        map.retain(|_, route_map| !route_map.is_empty());
    }

    /// Background sweep so idle IPs do not accumulate.
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.cleanup(every).await;
            }
        })
    }
}

/// Client address for rate limiting.
///
/// The socket peer, unless that peer is a trusted proxy: then the right-most
/// `X-Forwarded-For` entry that is not itself a trusted proxy.
pub fn extract_ip(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
    else {
        return "unknown".to_owned();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let forwarded = request
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();

    for entry in forwarded.iter().rev() {
        match entry.parse::<IpAddr>() {
            Ok(ip) if trusted_proxies.contains(&ip) => continue,
            Ok(ip) => return ip.to_string(),
            // Anything left of a garbled hop is client-controlled.
            Err(_) => break,
        }
    }
    peer.to_string()
}

pub async fn login_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = extract_ip(&request, &state.trusted_proxies);
    if !state.rate_limiter.check(LOGIN_ROUTE, &ip, state.login_limit).await {
        tracing::warn!(%ip, "login rate limit exceeded");
        return ApiError::TooManyRequests.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: RateLimit = RateLimit {
        max_requests: 5,
        window: Duration::from_secs(60),
    };

    #[tokio::test(start_paused = true)]
    async fn sixth_attempt_in_window_is_rejected() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check(LOGIN_ROUTE, "10.0.0.1", LIMIT).await);
        }
        assert!(!limiter.check(LOGIN_ROUTE, "10.0.0.1", LIMIT).await);
        assert!(limiter.check(LOGIN_ROUTE, "10.0.0.2", LIMIT).await);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check(LOGIN_ROUTE, "10.0.0.1", LIMIT).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_drops_stale_entries() {
        let limiter = RateLimiter::new();
        assert!(limiter.check(LOGIN_ROUTE, "10.0.0.1", LIMIT).await);
        tokio::time::advance(Duration::from_secs(301)).await;
        limiter.cleanup(Duration::from_secs(300)).await;
        assert!(limiter.inner.lock().await.is_empty());
    }

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder();
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(axum::body::Body::empty()).unwrap();
        let addr: SocketAddr = format!("{peer}:4000").parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn forwarded_for_ignored_from_untrusted_peer() {
        let req = request_from("192.0.2.10", Some("203.0.113.7"));
        assert_eq!(extract_ip(&req, &[]), "192.0.2.10");

        let other_proxy: [IpAddr; 1] = ["10.0.0.1".parse().unwrap()];
        assert_eq!(extract_ip(&req, &other_proxy), "192.0.2.10");
    }

    #[test]
    fn forwarded_for_used_behind_trusted_proxy() {
        let proxies: [IpAddr; 2] = ["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];

        // Client-supplied entries to the left of the real client are ignored.
        let req = request_from("10.0.0.1", Some("198.51.100.9, 203.0.113.7, 10.0.0.2"));
        assert_eq!(extract_ip(&req, &proxies), "203.0.113.7");

        let garbled = request_from("10.0.0.1", Some("203.0.113.7, not-an-ip"));
        assert_eq!(extract_ip(&garbled, &proxies), "10.0.0.1");

        let no_header = request_from("10.0.0.1", None);
        assert_eq!(extract_ip(&no_header, &proxies), "10.0.0.1");
    }

    #[test]
    fn missing_peer_is_unknown() {
        let bare = axum::http::Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(extract_ip(&bare, &[]), "unknown");
    }

    #[tokio::test]
    async fn count_saturates() {
        let limiter = RateLimiter::new();
        let limit = RateLimit {
            max_requests: u32::MAX,
            window: Duration::from_secs(60),
        };
        limiter
            .inner
            .lock()
            .await
            .entry(LOGIN_ROUTE)
            .or_default()
            .insert(
                "10.0.0.1".into(),
                IpEntry {
                    count: u32::MAX,
                    window_start: Instant::now(),
                },
            );
        assert!(limiter.check(LOGIN_ROUTE, "10.0.0.1", limit).await);
    }
}
