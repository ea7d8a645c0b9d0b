//! `volley` is a library for running batches of HTTP requests concurrently,
//! within a rate limit and a connection cap.
//!
//! "Hello world" example:
//! ```no_run
//! use volley_lib::{RequestDescriptor, Result};
//!
//! fn main() -> Result<()> {
//!   let requests = [
//!     RequestDescriptor::try_from("https://api.github.com/repos/tokio-rs/tokio")?,
//!     RequestDescriptor::try_from("https://api.github.com/repos/rust-lang/rust")?,
//!   ];
//!   for response in volley_lib::execute(requests)? {
//!     println!("{response:?}");
//!   }
//!   Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can build a client yourself, using the
//! `ClientBuilder`, which sets the rate limit, the connection cap and the
//! strategy run for every request:
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use volley_lib::{ClientBuilder, Paginated, RequestDescriptor, Result};
//!
//! fn main() -> Result<()> {
//!   let client = ClientBuilder::builder()
//!     .executor(Arc::new(Paginated::default()))
//!     .requests_per_period(10)
//!     .period(Duration::from_secs(1))
//!     .max_connections(4)
//!     .build()
//!     .client()?;
//!
//!   let request = RequestDescriptor::try_from("https://example.com/api/items")?;
//!   let responses = client.execute([request])?;
//!   println!("{} pages", responses.flatten().len());
//!   Ok(())
//! }
//! ```
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod dispatcher;
mod transport;
mod types;

pub mod executor;
pub mod ratelimit;

pub use crate::{
    client::{Client, ClientBuilder, execute},
    dispatcher::Dispatcher,
    executor::{DEFAULT_NEXT_FIELD, Paginated, RequestExecutor, SingleRequest, perform_request},
    ratelimit::{RateLimitConfig, RateLimiter, TokenBucket},
    transport::{DEFAULT_USER_AGENT, RawResponse, Transport, TransportSettings},
    types::*,
};
