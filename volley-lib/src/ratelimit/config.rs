use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ratelimit::RateLimiter;
use crate::{ErrorKind, Result};

/// Rate limit settings of a client.
///
/// Either both fields are set, which yields a token bucket limiter, or
/// neither, which yields a limiter that never waits. Anything in between is a
/// configuration error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum number of requests granted within one period
    #[serde(default)]
    pub requests_per_period: Option<u32>,

    /// Length of a rate limit period
    #[serde(default, with = "humantime_serde")]
    pub period: Option<Duration>,
}

impl RateLimitConfig {
    /// Create a `RateLimitConfig` from CLI or builder options
    #[must_use]
    pub const fn from_options(requests_per_period: Option<u32>, period: Option<Duration>) -> Self {
        Self {
            requests_per_period,
            period,
        }
    }

    /// Returns `true` if no rate limit is configured at all
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.requests_per_period.is_none() && self.period.is_none()
    }

    /// Check that the two halves of the rate limit were given together
    ///
    /// # Errors
    ///
    /// Returns an error if only one of `requests_per_period` and `period` is
    /// set, or if either of them is zero.
    pub fn validate(&self) -> Result<()> {
        match (self.requests_per_period, self.period) {
            (None, None) => Ok(()),
            (Some(capacity), None) => Err(ErrorKind::MissingRatePeriod(capacity)),
            (None, Some(period)) => Err(ErrorKind::MissingRateCapacity(period)),
            (Some(0), Some(_)) => Err(ErrorKind::ZeroRateCapacity),
            (Some(_), Some(period)) if period.is_zero() => Err(ErrorKind::ZeroRatePeriod),
            (Some(_), Some(_)) => Ok(()),
        }
    }

    /// Build the limiter described by this configuration
    ///
    /// # Errors
    ///
    /// See [`RateLimitConfig::validate`].
    pub fn limiter(&self) -> Result<RateLimiter> {
        self.validate()?;
        match (self.requests_per_period, self.period) {
            (Some(capacity), Some(period)) => RateLimiter::token_bucket(capacity, period),
            _ => Ok(RateLimiter::Unlimited),
        }
    }
}
