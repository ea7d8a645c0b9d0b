//! Entry point for dispatching batches of requests.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` runs batches of request descriptors and returns their decoded
//! responses. `ClientBuilder` exposes a finer level of granularity for
//! building a `Client`.
//!
//! For convenience, a free function [`execute`] is provided for ad-hoc
//! batches without rate limit.
#![allow(clippy::module_name_repetitions)]
use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};
use typed_builder::TypedBuilder;

use crate::{
    Dispatcher, ErrorKind, RateLimitConfig, RateLimiter, RequestDescriptor, RequestExecutor,
    ResponseCollection, Result, SingleRequest, TransportSettings, transport::DEFAULT_USER_AGENT,
};

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Strategy run once per request descriptor.
    ///
    /// Defaults to [`SingleRequest`], which issues exactly one call.
    #[builder(default_code = "Arc::new(SingleRequest)", setter(!into))]
    executor: Arc<dyn RequestExecutor>,

    /// Maximum number of requests issued per `period`.
    ///
    /// Must be set together with `period`. If neither is set, requests are
    /// not rate limited.
    requests_per_period: Option<u32>,

    /// Length of a rate limit period.
    ///
    /// Must be set together with `requests_per_period`.
    period: Option<Duration>,

    /// Maximum number of simultaneous connections per origin.
    ///
    /// `None` or `Some(0)` leaves the number of connections unbounded.
    max_connections: Option<usize>,

    /// Response timeout per request.
    ///
    /// A timeout set on a single descriptor takes precedence.
    timeout: Option<Duration>,

    /// User-agent used for all requests
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Custom request headers sent with every request
    custom_headers: HeaderMap,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// The rate limiter is created here, once, and shared by every batch the
    /// client runs.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind`] if:
    /// - only one of `requests_per_period` and `period` is set, or either is
    ///   zero.
    /// - the user agent is not a valid header value.
    pub fn client(self) -> Result<Client> {
        let Self {
            executor,
            requests_per_period,
            period,
            max_connections,
            timeout,
            user_agent,
            custom_headers: mut headers,
        } = self;

        let limiter = RateLimitConfig::from_options(requests_per_period, period).limiter()?;

        headers.insert(header::USER_AGENT, HeaderValue::try_from(user_agent)?);

        Ok(Client {
            executor,
            limiter: Arc::new(limiter),
            transport: TransportSettings {
                max_connections,
                timeout,
                headers,
            },
        })
    }
}

/// Handles batches of requests.
///
/// Cloning a client is cheap. Clones share the rate limiter, so the limit
/// applies to all of them together.
#[derive(Debug, Clone)]
pub struct Client {
    executor: Arc<dyn RequestExecutor>,
    limiter: Arc<RateLimiter>,
    transport: TransportSettings,
}

impl Client {
    /// Run a batch to completion on a runtime created for this call.
    ///
    /// Every descriptor is handed to the executor concurrently. Results are
    /// returned in completion order, not input order. The rate limiter keeps
    /// its state between calls, so consecutive batches share one budget.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BuildRuntime`] or [`ErrorKind::BuildTransport`]
    /// if the batch cannot be started, and [`ErrorKind::BatchFailed`] if any
    /// request failed.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime, since runtimes cannot be
    /// nested. Use [`Client::execute_async`] there.
    pub fn execute<I>(&self, requests: I) -> Result<ResponseCollection>
    where
        I: IntoIterator<Item = RequestDescriptor>,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ErrorKind::BuildRuntime)?;

        runtime.block_on(self.execute_async(requests))
    }

    /// Run a batch on the caller's runtime.
    ///
    /// Behaves like [`Client::execute`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BuildTransport`] if the batch cannot be started,
    /// and [`ErrorKind::BatchFailed`] if any request failed.
    pub async fn execute_async<I>(&self, requests: I) -> Result<ResponseCollection>
    where
        I: IntoIterator<Item = RequestDescriptor>,
    {
        let requests: Vec<_> = requests.into_iter().collect();
        let dispatcher = Dispatcher::new(
            &self.transport,
            Arc::clone(&self.limiter),
            Arc::clone(&self.executor),
        )?;
        dispatcher.run(requests).await
    }

    /// The limiter shared by all batches of this client
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// A shorthand function to run a batch with the default client.
///
/// This is handy for one-off batches. If you plan to run more batches or
/// need a rate limit, create a [`Client`] with [`ClientBuilder`] instead.
///
/// # Errors
///
/// See [`Client::execute`].
pub fn execute<I>(requests: I) -> Result<ResponseCollection>
where
    I: IntoIterator<Item = RequestDescriptor>,
{
    ClientBuilder::default().client()?.execute(requests)
}
