//! Strategies that turn one [`RequestDescriptor`] into one [`ResponseResult`].
//!
//! The dispatcher runs one executor invocation per descriptor, all of them
//! concurrently. What an invocation does is up to the executor: the default
//! [`SingleRequest`] issues exactly one call, [`Paginated`] keeps following a
//! "next page" link. Custom strategies implement [`RequestExecutor`] and can
//! use [`perform_request`] for every individual call, so that each call is
//! rate limited like any other.
//!
//! Calls made by one invocation are sequential; only invocations for
//! different descriptors run concurrently.

mod paginated;
mod single;

use async_trait::async_trait;
use serde_json::Value;

pub use paginated::{DEFAULT_NEXT_FIELD, Paginated};
pub use single::SingleRequest;

use crate::{RateLimiter, RequestDescriptor, ResponseResult, Result, Transport};

/// A pluggable unit of work executed once per request descriptor
#[async_trait]
pub trait RequestExecutor: std::fmt::Debug + Send + Sync {
    /// Produce the result of one request descriptor.
    ///
    /// Implementations must call [`RateLimiter::acquire`] before every HTTP
    /// call they make.
    ///
    /// # Errors
    ///
    /// Returns an error if any call fails: the request cannot be sent, the
    /// server answers with a non-success status, or the body cannot be
    /// decoded. Errors are not retried.
    async fn execute(
        &self,
        transport: &Transport,
        limiter: &RateLimiter,
        request: &RequestDescriptor,
    ) -> Result<ResponseResult>;
}

/// Issue one rate limited request and decode its JSON body.
///
/// This is what [`SingleRequest`] does. Custom executors should use it for
/// each of their calls.
///
/// # Errors
///
/// Returns an error if the request cannot be sent, the status code is not
/// 2xx, or the body is not valid JSON.
pub async fn perform_request(
    transport: &Transport,
    limiter: &RateLimiter,
    request: &RequestDescriptor,
) -> Result<Value> {
    limiter.acquire().await;
    log::debug!("Sending {request}");

    let response = transport.perform(request).await?;
    log::trace!("{request} answered with {}", response.status());

    response.error_for_status()?.json().await
}
