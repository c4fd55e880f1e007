//! Rate limiting: three independently configured buckets —
//! general (100/15min/client), location updates (120/min/driver), and
//! payment creation (10/15min/client) — each keyed by a caller-supplied
//! identifier rather than an authenticated principal, since authentication
//! is an out-of-scope external collaborator for this system.

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};
use uuid::Uuid;

use crate::app::AppState;

type KeyRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A rate limiter keyed by an arbitrary string identifier (client id, driver
/// id), backed by one `governor` limiter per key.
pub struct KeyedRateLimiter {
    limiters: RwLock<HashMap<String, Arc<KeyRateLimiter>>>,
    quota: Quota,
}

impl KeyedRateLimiter {
    /// `limit` requests per `period`.
    pub fn new(limit: u32, period: Duration) -> Self {
        let limit = NonZeroU32::new(limit).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_minute(limit))
            .allow_burst(limit);
        Self {
            limiters: RwLock::new(HashMap::new()),
            quota,
        }
    }

    pub fn per_15min(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(900) / limit.max(1))
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60) / limit.max(1))
    }

    fn get_or_create(&self, key: &str) -> Arc<KeyRateLimiter> {
        {
            let limiters = self.limiters.read().unwrap();
            if let Some(limiter) = limiters.get(key) {
                return limiter.clone();
            }
        }
        let mut limiters = self.limiters.write().unwrap();
        if let Some(limiter) = limiters.get(key) {
            return limiter.clone();
        }
        let limiter = Arc::new(GovRateLimiter::direct(self.quota));
        limiters.insert(key.to_string(), limiter.clone());
        limiter
    }

    /// Returns `Ok(())` if allowed, or `Err(retry_after_secs)` if rate limited.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let limiter = self.get_or_create(key);
        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until
                    .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
                Err(wait.as_secs().max(1))
            }
        }
    }
}

fn client_key(req: &Request<Body>, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn too_many_requests(retry_after_secs: u64) -> Response {
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header("Retry-After", retry_after_secs.to_string())
        .body(Body::from(format!(
            "{{\"error\":\"rate_limited\",\"retryAfterSecs\":{retry_after_secs}}}"
        )))
        .expect("static rate-limit response is always well-formed")
}

/// General-endpoint rate limit (100/15min/client), keyed by caller IP.
pub async fn general_rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req, connect_info.as_ref());
    match state.general_rate_limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => too_many_requests(retry_after),
    }
}

/// Location-update rate limit (120/min/driver), keyed by the `:driver_id`
/// path parameter rather than caller IP — a driver's phone may roam across
/// networks mid-shift.
pub async fn location_rate_limit_middleware(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match state.location_rate_limiter.check(&driver_id.to_string()) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => too_many_requests(retry_after),
    }
}

/// Payment-creation rate limit (10/15min/client), keyed by caller IP.
pub async fn payment_rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req, connect_info.as_ref());
    match state.payment_rate_limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => too_many_requests(retry_after),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_the_first_request_for_a_fresh_key() {
        let limiter = KeyedRateLimiter::per_minute(10);
        assert!(limiter.check("client-a").is_ok());
    }

    #[test]
    fn distinct_keys_have_independent_budgets() {
        let limiter = KeyedRateLimiter::per_minute(1);
        assert!(limiter.check("client-a").is_ok());
        assert!(limiter.check("client-a").is_err());
        assert!(limiter.check("client-b").is_ok());
    }

    #[test]
    fn exhausting_the_quota_reports_a_nonzero_retry_after() {
        let limiter = KeyedRateLimiter::per_minute(1);
        limiter.check("client-a").unwrap();
        let retry_after = limiter.check("client-a").unwrap_err();
        assert!(retry_after >= 1);
    }
}
