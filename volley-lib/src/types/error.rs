use std::time::Duration;

use http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::ResponseResult;

/// Possible errors when dispatching requests with `volley_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A request budget was configured without the period it applies to
    #[error(
        "Rate limit of {0} requests per period is missing its period. Set both `requests_per_period` and `period`, or neither."
    )]
    MissingRatePeriod(u32),

    /// A rate limit period was configured without a request budget
    #[error(
        "Rate limit period of {0:?} is missing its request count. Set both `requests_per_period` and `period`, or neither."
    )]
    MissingRateCapacity(Duration),

    /// The number of requests per period must be positive
    #[error("Requests per period must be greater than zero")]
    ZeroRateCapacity,

    /// The rate limit period must be positive
    #[error("Rate limit period must be greater than zero")]
    ZeroRatePeriod,

    /// The underlying HTTP client could not be created
    #[error("Failed to build the HTTP transport")]
    BuildTransport(#[source] reqwest::Error),

    /// The runtime driving a batch could not be started
    #[error("Failed to start the async runtime for a batch")]
    BuildRuntime(#[source] std::io::Error),

    /// The given header value could not be parsed.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The given string is not a valid absolute URL
    #[error("Cannot parse `{0}` as a request URL")]
    InvalidUrl(String, #[source] url::ParseError),

    /// The connection pool was shut down while a request waited for a slot
    #[error("Connection pool was closed while waiting for a free connection")]
    ConnectionPoolClosed,

    /// Network error while sending a request or receiving its headers
    #[error("Network error while trying to connect to an endpoint via reqwest")]
    NetworkRequest(#[source] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("Request to {url} was rejected with status code {status}")]
    RejectedStatusCode {
        /// Status returned by the server
        status: StatusCode,
        /// Final URL of the response
        url: Url,
    },

    /// The response body could not be read
    #[error("Error reading response body")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The response body is not valid JSON
    #[error("Response body from {url} is not valid JSON")]
    DecodeResponseBody {
        /// URL of the response that failed to decode
        url: Url,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// A pagination link could not be resolved into a URL
    #[error("Cannot follow pagination link `{link}`")]
    InvalidPageUrl {
        /// Raw value of the pagination field
        link: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// A request task panicked or was aborted before producing a result
    #[error("Request task did not complete: {0}")]
    TaskPanicked(String),

    /// At least one request of a batch failed.
    ///
    /// Wraps the first failure observed. Every other task of the batch ran to
    /// completion before this error was returned.
    #[error("{failed} of {total} requests failed, first failure: {source}")]
    BatchFailed {
        /// Number of failed requests
        failed: usize,
        /// Number of requests in the batch
        total: usize,
        /// The first failure observed, in completion order
        #[source]
        source: Box<ErrorKind>,
        /// Results of the requests that did succeed, in completion order
        completed: Vec<ResponseResult>,
    },
}

impl ErrorKind {
    /// Returns `true` if this error was caused by invalid configuration,
    /// i.e. it was raised before any request was issued.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRatePeriod(_)
                | Self::MissingRateCapacity(_)
                | Self::ZeroRateCapacity
                | Self::ZeroRatePeriod
                | Self::BuildTransport(_)
                | Self::BuildRuntime(_)
                | Self::InvalidHeader(_)
        )
    }

    /// The underlying request error of a failed batch.
    ///
    /// For any other error this is the error itself.
    #[must_use]
    pub fn first_failure(&self) -> &ErrorKind {
        match self {
            Self::BatchFailed { source, .. } => source,
            _ => self,
        }
    }

    /// The status code the server rejected a request with, if any
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self.first_failure() {
            Self::RejectedStatusCode { status, .. } => Some(*status),
            Self::NetworkRequest(e) => e.status(),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for ErrorKind {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskPanicked(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_classified() {
        assert!(ErrorKind::MissingRatePeriod(10).is_config_error());
        assert!(ErrorKind::MissingRateCapacity(Duration::from_secs(1)).is_config_error());
        assert!(ErrorKind::ZeroRateCapacity.is_config_error());
        assert!(!ErrorKind::TaskPanicked("boom".into()).is_config_error());
    }

    #[test]
    fn test_batch_failure_exposes_first_failure() {
        let url = Url::parse("https://example.com/items/1").unwrap();
        let error = ErrorKind::BatchFailed {
            failed: 1,
            total: 3,
            source: Box::new(ErrorKind::RejectedStatusCode {
                status: StatusCode::NOT_FOUND,
                url,
            }),
            completed: vec![],
        };

        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert!(matches!(
            error.first_failure(),
            ErrorKind::RejectedStatusCode { .. }
        ));
        assert_eq!(
            error.to_string(),
            "1 of 3 requests failed, first failure: Request to https://example.com/items/1 was rejected with status code 404 Not Found"
        );
    }
}
