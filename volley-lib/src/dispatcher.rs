//! Fan-out/fan-in of one batch.
//!
//! The [`Dispatcher`] spawns one task per request descriptor right away. How
//! many of them actually talk to the remote service at the same time is
//! decided by the transport's connection cap and by the rate limiter, not by
//! the dispatcher. Results are drained from a [`JoinSet`] in the order the
//! tasks finish, so the collection needs no lock.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    ErrorKind, RateLimiter, RequestDescriptor, RequestExecutor, ResponseCollection, Result,
    Transport, TransportSettings,
};

/// Runs a single batch to completion.
///
/// A dispatcher owns its [`Transport`] and is consumed by [`Dispatcher::run`],
/// so every batch gets a fresh connection pool. The rate limiter is shared
/// with the [`Client`](crate::Client) that created the dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    transport: Transport,
    limiter: Arc<RateLimiter>,
    executor: Arc<dyn RequestExecutor>,
}

impl Dispatcher {
    /// Create a dispatcher with a new transport
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be built.
    pub fn new(
        settings: &TransportSettings,
        limiter: Arc<RateLimiter>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(settings)?,
            limiter,
            executor,
        })
    }

    /// Execute every request concurrently and collect the results.
    ///
    /// All tasks are awaited, even after one of them failed. Results are in
    /// completion order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BatchFailed`] wrapping the first failure observed
    /// if any request failed. The results of the requests that succeeded are
    /// kept in the error. Must be called from within a tokio runtime.
    pub async fn run(self, requests: Vec<RequestDescriptor>) -> Result<ResponseCollection> {
        let total = requests.len();
        log::debug!("Dispatching {total} requests");

        let mut tasks = JoinSet::new();
        for request in requests {
            let transport = self.transport.clone();
            let limiter = Arc::clone(&self.limiter);
            let executor = Arc::clone(&self.executor);
            tasks.spawn(async move { executor.execute(&transport, &limiter, &request).await });
        }

        let mut responses = ResponseCollection::with_capacity(total);
        let mut first_failure = None;
        let mut failed = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(ErrorKind::from).and_then(|outcome| outcome) {
                Ok(response) => responses.push(response),
                Err(e) => {
                    failed += 1;
                    log::debug!("Request failed: {e}");
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            None => {
                log::debug!("All {total} requests succeeded");
                Ok(responses)
            }
            Some(source) => {
                log::warn!("{failed} of {total} requests failed");
                Err(ErrorKind::BatchFailed {
                    failed,
                    total,
                    source: Box::new(source),
                    completed: responses.into_inner(),
                })
            }
        }
    }
}
