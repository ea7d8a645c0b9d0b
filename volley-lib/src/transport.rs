//! Pooled HTTP transport used by request executors.
//!
//! A [`Transport`] wraps a single [`reqwest::Client`], whose connection pool is
//! shared by every task of a batch. When a connection cap is configured, each
//! origin additionally gets a semaphore with `max_connections` slots. A slot
//! is taken before a request is sent and only released once its
//! [`RawResponse`] has been consumed or dropped, so at most `max_connections`
//! requests to one origin are ever in flight.
//!
//! Although `reqwest` limits idle connections per host, it does not bound
//! the number of active ones, which is why the semaphores exist.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::{ErrorKind, RequestData, RequestDescriptor, Result};

/// Default user agent, `volley/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));

// Constants currently not configurable by the user.
/// A timeout for only the connect phase of a request.
const CONNECT_TIMEOUT: u64 = 10;
/// TCP keepalive
/// See <https://tldp.org/HOWTO/TCP-Keepalive-HOWTO/overview.html> for more info
const TCP_KEEPALIVE: u64 = 60;

/// Everything needed to build a fresh [`Transport`] for a batch
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Maximum number of simultaneous connections per origin.
    /// `None` or `Some(0)` leaves the number of connections unbounded.
    pub max_connections: Option<usize>,

    /// Response timeout per request, unless a request sets its own
    pub timeout: Option<Duration>,

    /// Headers sent with every request, including the user agent
    pub headers: HeaderMap,
}

impl Default for TransportSettings {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
        Self {
            max_connections: None,
            timeout: None,
            headers,
        }
    }
}

/// Connection slots, one semaphore per origin
#[derive(Debug)]
struct ConnectionLimits {
    per_origin: usize,
    origins: DashMap<String, Arc<Semaphore>>,
}

impl ConnectionLimits {
    fn new(per_origin: usize) -> Self {
        Self {
            per_origin,
            origins: DashMap::new(),
        }
    }

    async fn acquire(&self, url: &Url) -> Result<OwnedSemaphorePermit> {
        let semaphore = self
            .origins
            .entry(url.origin().ascii_serialization())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_origin)))
            .clone();

        semaphore
            .acquire_owned()
            .await
            .map_err(|_| ErrorKind::ConnectionPoolClosed)
    }
}

/// A pooled HTTP session shared by all tasks of one batch.
///
/// Cloning is cheap; clones share the connection pool and the connection cap.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    limits: Option<Arc<ConnectionLimits>>,
}

impl Transport {
    /// Build a transport with its own connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying [`reqwest::Client`] cannot be
    /// created, e.g. because the TLS backend fails to initialize.
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let max_connections = settings.max_connections.filter(|max| *max > 0);

        let mut builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(settings.headers.clone())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE));

        if let Some(max) = max_connections {
            builder = builder.pool_max_idle_per_host(max);
        }
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ErrorKind::BuildTransport)?;

        Ok(Self {
            client,
            limits: max_connections.map(|max| Arc::new(ConnectionLimits::new(max))),
        })
    }

    /// Send one request.
    ///
    /// Waits for a free connection slot first if a connection cap is set.
    /// The status code is not checked here; see [`RawResponse::error_for_status`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NetworkRequest`] if the request could not be sent
    /// or no response headers were received.
    pub async fn perform(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let permit = match &self.limits {
            Some(limits) => Some(limits.acquire(&request.url).await?),
            None => None,
        };

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        } else if let Some(data) = &request.data {
            builder = match data {
                RequestData::Raw(body) => builder.body(body.clone()),
                RequestData::Form(fields) => builder.form(fields),
            };
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(ErrorKind::NetworkRequest)?;

        Ok(RawResponse {
            response,
            _permit: permit,
        })
    }
}

/// A response whose body has not been read yet.
///
/// Holds on to its connection slot until it is consumed or dropped.
#[derive(Debug)]
pub struct RawResponse {
    response: reqwest::Response,
    _permit: Option<OwnedSemaphorePermit>,
}

impl RawResponse {
    /// Status code of the response
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Returns `true` for 2xx status codes
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Final URL of the response
    #[must_use]
    pub fn url(&self) -> &Url {
        self.response.url()
    }

    /// Turn a non-success status code into an error
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RejectedStatusCode`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ErrorKind::RejectedStatusCode {
                status: self.status(),
                url: self.url().clone(),
            })
        }
    }

    /// Read the body and decode it as JSON.
    ///
    /// An empty body decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read or is not valid JSON.
    pub async fn json(self) -> Result<Value> {
        let url = self.url().clone();
        let body = self
            .response
            .bytes()
            .await
            .map_err(ErrorKind::ReadResponseBody)?;

        if body.trim_ascii().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|source| ErrorKind::DecodeResponseBody { url, source })
    }
}
