use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::window::Window;
use crate::{ErrorKind, Result};

/// Grants at most `capacity` permits within any `period`-long window.
///
/// The limiter remembers the instants of the last `capacity` grants. A new
/// permit is granted once the oldest of them lies at least one `period` in
/// the past, so the (C+1)-th grant always trails the first by a full period.
/// Waiting tasks are not served in FIFO order.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: NonZeroU32,
    period: Duration,
    grants: Mutex<Window<Instant>>,
}

impl TokenBucket {
    /// Create a limiter granting `capacity` permits per `period`
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` or `period` is zero.
    pub fn new(capacity: u32, period: Duration) -> Result<Self> {
        let capacity = NonZeroU32::new(capacity).ok_or(ErrorKind::ZeroRateCapacity)?;
        if period.is_zero() {
            return Err(ErrorKind::ZeroRatePeriod);
        }

        Ok(Self {
            capacity,
            period,
            grants: Mutex::new(Window::new(capacity.get() as usize)),
        })
    }

    /// Maximum number of permits per period
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    /// Length of one period
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Wait for a permit and consume it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                // Never held across an await point
                let mut grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                match self.next_grant(&grants) {
                    Some(ready) if ready > now => ready - now,
                    _ => {
                        grants.push(now);
                        return;
                    }
                }
            };

            log::trace!(
                "Rate limit of {} per {:?} reached, waiting {:?} for a permit",
                self.capacity,
                self.period,
                wait
            );
            sleep(wait).await;
        }
    }

    /// Number of permits that could be granted right now
    #[must_use]
    pub fn available_permits(&self) -> u32 {
        let grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let recent = grants
            .iter()
            .filter(|granted| now.duration_since(**granted) < self.period)
            .count();
        self.capacity
            .get()
            .saturating_sub(u32::try_from(recent).unwrap_or(u32::MAX))
    }

    /// The earliest instant at which another permit may be granted,
    /// or `None` if one is available immediately
    fn next_grant(&self, grants: &Window<Instant>) -> Option<Instant> {
        if !grants.is_full() {
            return None;
        }
        grants.oldest().map(|oldest| *oldest + self.period)
    }
}
