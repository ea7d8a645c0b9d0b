//! Request rate limiting shared by all tasks of a client.
//!
//! A [`RateLimiter`] is created once per [`Client`](crate::Client) and
//! awaited before every single HTTP call, including each page fetched by a
//! paginating executor. Its state outlives individual batches, so the budget
//! of one period spans consecutive calls to `execute`.
//!
//! # Architecture
//!
//! - [`RateLimitConfig`]: the user-facing pair of `requests_per_period` and
//!   `period`, validated before any limiter is built
//! - [`TokenBucket`]: grants at most a fixed number of permits per period
//! - [`RateLimiter`]: the limiter handed to executors, either a
//!   [`TokenBucket`] or a no-op

mod config;
mod token_bucket;
mod window;

use std::time::Duration;

pub use config::RateLimitConfig;
pub use token_bucket::TokenBucket;

use crate::Result;

/// Limits how many requests are issued per period.
///
/// Call sites always await [`RateLimiter::acquire`], whether or not a limit is
/// configured.
#[derive(Debug, Default)]
pub enum RateLimiter {
    /// A real limiter with a fixed budget per period
    TokenBucket(TokenBucket),
    /// No rate limit; `acquire` returns immediately
    #[default]
    Unlimited,
}

impl RateLimiter {
    /// Create a token bucket limiter
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` or `period` is zero.
    pub fn token_bucket(capacity: u32, period: Duration) -> Result<Self> {
        TokenBucket::new(capacity, period).map(Self::TokenBucket)
    }

    /// Wait until a request may be issued and consume one permit.
    ///
    /// This never fails.
    pub async fn acquire(&self) {
        match self {
            Self::TokenBucket(bucket) => bucket.acquire().await,
            Self::Unlimited => {}
        }
    }

    /// Returns `true` if this limiter never waits
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Number of permits that could be granted right now.
    ///
    /// `None` means unlimited.
    #[must_use]
    pub fn available_permits(&self) -> Option<u32> {
        match self {
            Self::TokenBucket(bucket) => Some(bucket.available_permits()),
            Self::Unlimited => None,
        }
    }
}
