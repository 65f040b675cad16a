//! Per-IP fixed-window rate limiting
//!
//! The public and admin API tiers each get their own limiter with its own
//! budget. Counters live in a concurrent map keyed by client IP; stale
//! windows are dropped by a periodic prune task spawned at startup.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::response::ErrorResponse;

struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Fixed-window request counter per client IP
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counters: DashMap<IpAddr, WindowCounter>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: DashMap::new(),
        }
    }

    /// Record a request from `ip` and report whether it is within budget.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.counters.entry(ip).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }

    /// Drop counters whose window expired more than one window ago.
    pub fn prune(&self) {
        let now = Instant::now();
        let horizon = self.window * 2;
        self.counters
            .retain(|_, counter| now.duration_since(counter.window_start) < horizon);
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.counters.len()
    }
}

/// Axum middleware enforcing a [`RateLimiter`]
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    if !limiter.check(ip) {
        debug!(client_ip = %ip, "request rate limited");
        metrics::counter!("actomaps_rate_limited_total").increment(1);
        return ErrorResponse::too_many_requests().into_response();
    }

    next.run(request).await
}

/// Client IP for rate-limiting purposes: the first `X-Forwarded-For` hop
/// when present (deployments sit behind a reverse proxy), otherwise the
/// socket peer address.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
        && let Ok(ip) = first.trim().parse()
    {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
