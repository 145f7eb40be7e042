//! Fixed-window request rate limiting per client address.
//!
//! Best-effort admission control ahead of every route, not a security
//! boundary: the source address is spoofable and the counters are lost on
//! restart. The limiter is an owned component handed to the middleware, so
//! swapping it for a shared counter never touches handler code.

use std::collections::HashMap;
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::ResponseError;
use futures::future::{ready, LocalBoxFuture, Ready};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{AppError, AuthError};

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of an admission check, with the quota numbers the standard
/// `RateLimit-*` headers report.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_requests,
        }
    }

    /// Count a request against the caller's window. Updates are serialized
    /// behind the lock so concurrent bursts from one address cannot
    /// undercount.
    pub async fn check(&self, addr: IpAddr) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(addr).or_insert(Window { started: now, count: 0 });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        let left = self.window.saturating_sub(now.duration_since(window.started));
        let reset_secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);

        if window.count >= self.max_requests {
            Decision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_secs,
            }
        } else {
            window.count += 1;
            Decision {
                allowed: true,
                limit: self.max_requests,
                remaining: self.max_requests - window.count,
                reset_secs,
            }
        }
    }

    /// Drop windows whose period has elapsed. Called from a background task.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
    }
}

/// Middleware applying a [`RateLimiter`] ahead of the routes it wraps.
///
/// Allowed responses carry `RateLimit-Limit`/`-Remaining`/`-Reset` headers;
/// an over-limit request is answered 429 with the same headers plus
/// `Retry-After`. A request without a peer address (unix sockets, some test
/// harnesses) is admitted without counting.
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = Arc::clone(&self.limiter);

        Box::pin(async move {
            let decision = match req.peer_addr() {
                Some(addr) => Some(limiter.check(addr.ip()).await),
                None => None,
            };

            if let Some(decision) = decision {
                if !decision.allowed {
                    warn!(
                        "rate limit exceeded for {} ({} per {}s)",
                        req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default(),
                        decision.limit,
                        decision.reset_secs,
                    );
                    let response = AppError::Auth(AuthError::RateLimited {
                        limit: decision.limit,
                        reset_secs: decision.reset_secs,
                    })
                    .error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }

                let mut res = service.call(req).await?;
                let headers = res.headers_mut();
                headers.insert(
                    HeaderName::from_static("ratelimit-limit"),
                    HeaderValue::from(decision.limit),
                );
                headers.insert(
                    HeaderName::from_static("ratelimit-remaining"),
                    HeaderValue::from(decision.remaining),
                );
                headers.insert(
                    HeaderName::from_static("ratelimit-reset"),
                    HeaderValue::from(decision.reset_secs),
                );
                Ok(res.map_into_left_body())
            } else {
                Ok(service.call(req).await?.map_into_left_body())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn addr(n: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, n])
    }

    #[tokio::test]
    async fn test_limit_boundary() {
        let limiter = RateLimiter::new(Duration::from_secs(900), 300);

        for i in 0..300u32 {
            let d = limiter.check(addr(1)).await;
            assert!(d.allowed, "request {} should be admitted", i + 1);
            assert_eq!(d.remaining, 300 - (i + 1));
        }

        let d = limiter.check(addr(1)).await;
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert!(d.reset_secs <= 900);
    }

    #[tokio::test]
    async fn test_addresses_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(900), 1);
        assert!(limiter.check(addr(1)).await.allowed);
        assert!(!limiter.check(addr(1)).await.allowed);
        assert!(limiter.check(addr(2)).await.allowed);
    }

    #[tokio::test]
    async fn test_window_elapses_and_count_restarts() {
        let limiter = RateLimiter::new(Duration::from_millis(100), 2);

        assert!(limiter.check(addr(1)).await.allowed);
        assert!(limiter.check(addr(1)).await.allowed);
        assert!(!limiter.check(addr(1)).await.allowed);

        sleep(Duration::from_millis(150)).await;

        let d = limiter.check(addr(1)).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
    }

    #[tokio::test]
    async fn test_concurrent_bursts_do_not_undercount() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(900), 50));

        let mut handles = Vec::new();
        for _ in 0..80 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.check(addr(1)).await.allowed }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn test_sweep_drops_stale_windows() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 10);
        limiter.check(addr(1)).await;
        assert_eq!(limiter.windows.lock().await.len(), 1);

        sleep(Duration::from_millis(80)).await;
        limiter.sweep().await;
        assert!(limiter.windows.lock().await.is_empty());
    }
}
