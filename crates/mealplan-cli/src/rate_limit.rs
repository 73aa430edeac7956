//! Fixed-window request limiting keyed by client IP.
//!
//! Two policies are layered on the router: a strict one around the
//! meal-plan endpoints and a general one around everything.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use serde_json::json;

/// Above this many tracked clients, expired windows are swept after a check.
const SWEEP_THRESHOLD: usize = 4096;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub strict: LimitPolicy,
    pub general: LimitPolicy,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            strict: LimitPolicy {
                max_requests: 5,
                window: Duration::from_secs(60),
            },
            general: LimitPolicy {
                max_requests: 100,
                window: Duration::from_secs(15 * 60),
            },
        }
    }
}

/// Result of counting one request against a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset: Duration,
    },
    Limited {
        limit: u32,
        retry_after: Duration,
    },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per key in fixed windows of `policy.window`.
///
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    policy: LimitPolicy,
    windows: Arc<DashMap<IpAddr, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(policy: LimitPolicy) -> Self {
        Self {
            policy,
            windows: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, key: IpAddr) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at time `now`.
    pub fn check_at(&self, key: IpAddr, now: Instant) -> Decision {
        let window_len = self.policy.window;
        let limit = self.policy.max_requests;

        let mut window = self.windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(window.started) >= window_len {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let reset = window_len.saturating_sub(now.saturating_duration_since(window.started));
        let decision = if window.count >= limit {
            Decision::Limited {
                limit,
                retry_after: reset,
            }
        } else {
            window.count += 1;
            Decision::Allowed {
                limit,
                remaining: limit - window.count,
                reset,
            }
        };
        // The entry guard holds a shard lock; release it before sweeping.
        drop(window);

        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }
        decision
    }

    fn sweep(&self, now: Instant) {
        let window_len = self.policy.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window_len);
        tracing::debug!(tracked = self.windows.len(), "swept expired rate limit windows");
    }
}

/// Which 429 body a limiter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// Meal plan generation endpoints.
    Strict,
    /// Every route.
    General,
}

/// Limiter plus its rejection style, shared as middleware state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: FixedWindowLimiter,
    scope: LimitScope,
}

impl RateLimiter {
    pub fn new(policy: LimitPolicy, scope: LimitScope) -> Self {
        Self {
            limiter: FixedWindowLimiter::new(policy),
            scope,
        }
    }

    fn rejection(&self, retry_after: Duration) -> Response {
        let body = match self.scope {
            LimitScope::Strict => json!({
                "success": false,
                "error": "Rate limit exceeded",
                "message": "Too many meal plan generation requests. Please wait before trying again.",
                "retryAfter": 60,
            }),
            LimitScope::General => json!({
                "success": false,
                "error": "Rate limit exceeded",
                "message": "Too many requests from this IP, please try again later.",
            }),
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(ceil_secs(retry_after)),
        );
        response
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Client address from the connection, or `0.0.0.0` when unavailable.
pub fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware for `axum::middleware::from_fn_with_state`.
///
/// Allowed responses get `RateLimit-*` headers unless an inner limiter
/// already set them.
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);

    match limiter.limiter.check(ip) {
        Decision::Limited { limit, retry_after } => {
            tracing::warn!(
                client = %ip,
                scope = ?limiter.scope,
                limit,
                "rate limit exceeded"
            );
            limiter.rejection(retry_after)
        }
        Decision::Allowed {
            limit,
            remaining,
            reset,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers
                .entry(RATELIMIT_LIMIT.clone())
                .or_insert(HeaderValue::from(limit));
            headers
                .entry(RATELIMIT_REMAINING.clone())
                .or_insert(HeaderValue::from(remaining));
            headers
                .entry(RATELIMIT_RESET.clone())
                .or_insert(HeaderValue::from(ceil_secs(reset)));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, secs: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(LimitPolicy {
            max_requests: max,
            window: Duration::from_secs(secs),
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_max_then_limits() {
        let limiter = limiter(5, 60);
        let now = Instant::now();

        for i in 0..5 {
            match limiter.check_at(ip(1), now) {
                Decision::Allowed { remaining, .. } => assert_eq!(remaining, 4 - i),
                other => panic!("request {i} should be allowed, got {other:?}"),
            }
        }
        assert!(matches!(
            limiter.check_at(ip(1), now),
            Decision::Limited { limit: 5, .. }
        ));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();
        assert!(matches!(limiter.check_at(ip(1), now), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at(ip(1), now), Decision::Limited { .. }));
        assert!(matches!(limiter.check_at(ip(2), now), Decision::Allowed { .. }));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter(2, 60);
        let start = Instant::now();
        limiter.check_at(ip(1), start);
        limiter.check_at(ip(1), start);

        let mid = start + Duration::from_secs(30);
        match limiter.check_at(ip(1), mid) {
            Decision::Limited { retry_after, .. } => {
                assert_eq!(retry_after, Duration::from_secs(30))
            }
            other => panic!("expected limit, got {other:?}"),
        }

        let later = start + Duration::from_secs(60);
        match limiter.check_at(ip(1), later) {
            Decision::Allowed {
                remaining, reset, ..
            } => {
                assert_eq!(remaining, 1);
                assert_eq!(reset, Duration::from_secs(60));
            }
            other => panic!("expected a fresh window, got {other:?}"),
        }
    }

    #[test]
    fn clones_share_counters() {
        let limiter = limiter(1, 60);
        let other = limiter.clone();
        let now = Instant::now();
        assert!(matches!(limiter.check_at(ip(1), now), Decision::Allowed { .. }));
        assert!(matches!(other.check_at(ip(1), now), Decision::Limited { .. }));
    }

    #[test]
    fn expired_windows_are_swept_past_threshold() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        for i in 0..=SWEEP_THRESHOLD as u32 {
            limiter.check_at(IpAddr::V4(Ipv4Addr::from(i)), start);
        }
        assert_eq!(limiter.windows.len(), SWEEP_THRESHOLD + 1);

        let later = start + Duration::from_secs(61);
        limiter.check_at(ip(1), later);
        assert_eq!(limiter.windows.len(), 1);
    }

    #[test]
    fn ceil_secs_rounds_up_partial_seconds() {
        assert_eq!(ceil_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(60)), 60);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }

    #[test]
    fn default_policies() {
        let limits = RateLimits::default();
        assert_eq!(limits.strict.max_requests, 5);
        assert_eq!(limits.strict.window, Duration::from_secs(60));
        assert_eq!(limits.general.max_requests, 100);
        assert_eq!(limits.general.window, Duration::from_secs(900));
    }
}
