/// Global rate limiting middleware
///
/// A single token bucket shared by every request the process serves. There is
/// no per-client partitioning: when the bucket is empty, everyone waits.
///
/// # Algorithm
///
/// Uses token bucket algorithm:
/// - Tokens refill at constant rate (`RATE_LIMIT_PER_SECOND`)
/// - The bucket holds at most `RATE_LIMIT_BURST` tokens and starts full
/// - Each request consumes 1 token
/// - Request blocked with 429 and `Retry-After` if bucket empty
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use taskflow_api::middleware::rate_limit::{rate_limit_layer, RateLimiter};
///
/// let limiter = Arc::new(RateLimiter::new(10.0, 20));
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(limiter, rate_limit_layer));
/// ```

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Body of every 429 produced here
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please slow down.";

/// Token bucket state
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill instant
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a new full bucket
    fn new(capacity: u32) -> Self {
        TokenBucket {
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, rate: f64, capacity: u32, now: Instant) {
        let elapsed_secs = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed_secs * rate).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume N tokens
    fn try_consume(&mut self, count: f64) -> bool {
        if self.tokens >= count {
            self.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Calculates whole seconds until N tokens available
    fn seconds_until_available(&self, count: f64, rate: f64) -> u64 {
        let deficit = count - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// Process-wide limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// Tokens added per second
    rate: f64,

    /// Maximum tokens in bucket (burst capacity)
    burst: u32,

    bucket: Mutex<TokenBucket>,
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,

    /// Rejected; a token is expected after this many seconds
    Limited { retry_after: u64 },
}

impl RateLimiter {
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self {
            rate: rate_per_second,
            burst,
            bucket: Mutex::new(TokenBucket::new(burst)),
        }
    }

    /// Takes one token if available
    pub fn check(&self) -> Decision {
        let mut bucket = self.bucket.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        bucket.refill(self.rate, self.burst, Instant::now());

        if bucket.try_consume(1.0) {
            Decision::Allowed
        } else {
            Decision::Limited {
                retry_after: bucket.seconds_until_available(1.0, self.rate).max(1),
            }
        }
    }
}

/// Rate limiting middleware
///
/// # Errors
///
/// - 429 Too Many Requests: bucket empty
pub async fn rate_limit_layer(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match limiter.check() {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Limited { retry_after } => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                retry_after,
                "Rate limit exceeded"
            );
            Err(ApiError::RateLimitExceeded {
                retry_after,
                message: RATE_LIMIT_MESSAGE.to_string(),
            })
        }
    }
}
