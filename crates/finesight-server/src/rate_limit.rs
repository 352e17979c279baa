//! Per-client request rate limiting
//!
//! Fixed window per peer IP: each client gets `max_requests` requests per
//! `window`, counted from its first request in the window. Every response
//! carries `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset`
//! headers; rejected requests get 429 with `Retry-After`.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::AppError;

/// Message returned with 429 responses
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Windows tracked before expired ones are swept
const SWEEP_THRESHOLD: usize = 10_000;

/// Rate limit settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// 100 requests per 15 minutes
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

impl RateLimitConfig {
    /// Parse a `FINESIGHT_RATE_LIMIT` value
    ///
    /// Unset keeps the default; `0` or `off` disables limiting; a number sets
    /// the requests allowed per 15-minute window.
    pub fn from_env_value(value: Option<&str>) -> Option<Self> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Some(Self::default());
        };
        if value.eq_ignore_ascii_case("off") {
            return None;
        }
        match value.parse::<u32>() {
            Ok(0) => None,
            Ok(max_requests) => Some(Self {
                max_requests,
                ..Self::default()
            }),
            Err(_) => {
                warn!(value = %value, "Invalid FINESIGHT_RATE_LIMIT, using the default");
                Some(Self::default())
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset: Duration },
    Limited { reset: Duration },
}

/// Request counters keyed by client address
///
/// Requests without a known peer address share one bucket.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<Option<IpAddr>, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count a request from `client` at `now`
    pub fn check(&self, client: Option<IpAddr>, now: Instant) -> Decision {
        // A panicked holder cannot leave the counters inconsistent
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window_len = self.config.window;

        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window_len);
        }

        let window = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= window_len {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let reset = window_len.saturating_sub(now.duration_since(window.started));
        if window.count >= self.config.max_requests {
            return Decision::Limited { reset };
        }

        window.count += 1;
        Decision::Allowed {
            remaining: self.config.max_requests - window.count,
            reset,
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: u64) {
    headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
}

/// Whole seconds until the window resets, rounded up
fn reset_secs(reset: Duration) -> u64 {
    reset.as_secs() + u64::from(reset.subsec_nanos() > 0)
}

/// Rate limiting middleware keyed by the TCP peer address
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = connect_info.map(|ci| ci.0.ip());
    let limit = u64::from(limiter.config().max_requests);

    match limiter.check(client, Instant::now()) {
        Decision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            set_header(headers, "ratelimit-limit", limit);
            set_header(headers, "ratelimit-remaining", u64::from(remaining));
            set_header(headers, "ratelimit-reset", reset_secs(reset));
            response
        }
        Decision::Limited { reset } => {
            warn!(client = ?client, path = %request.uri().path(), "Rate limit exceeded");

            let mut response = AppError::too_many_requests(RATE_LIMIT_MESSAGE).into_response();
            let headers = response.headers_mut();
            set_header(headers, "ratelimit-limit", limit);
            set_header(headers, "ratelimit-remaining", 0);
            set_header(headers, "ratelimit-reset", reset_secs(reset));
            set_header(headers, "retry-after", reset_secs(reset));
            response
        }
    }
}
