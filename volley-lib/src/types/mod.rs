#![allow(unreachable_pub)]

mod error;
mod request;
mod response;

pub use error::ErrorKind;
pub use request::{RequestData, RequestDescriptor};
pub use response::{ResponseCollection, ResponseResult};

/// The volley `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
