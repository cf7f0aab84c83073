//! `fluent-request` is a fluent, blocking HTTP request builder.
//!
//! Configure a request through chained calls on [`RequestBuilder`], then send
//! it with [`RequestBuilder::get`] or [`RequestBuilder::post`]:
//! - failed attempts are retried with a delay of at least three seconds
//! - the returned [`Response`] is classified as successful or failed by
//!   status code; nothing is raised to the caller
//!
//! ```no_run
//! let response = fluent_request::new_request()
//!     .with_token("debug")
//!     .with_body(r#"{"hello":"world"}"#)
//!     .retry(3, 100)
//!     .post("http://127.0.0.1:8001/api/items");
//!
//! assert!(response.is_successful());
//! ```

mod builder;
mod config;
mod error;
mod executor;
mod options;
mod response;
pub mod transport;
mod value;

pub use builder::{RequestBuilder, TOKEN_HEADER};
pub use config::{BasicAuth, RequestConfig};
pub use error::HttpError;
pub use executor::{retry_delay, Executor, Sleep, ThreadSleep, RETRY_DELAY_FLOOR};
pub use options::{RequestOptions, MIN_ENFORCED_TIMEOUT_MS};
pub use response::{Response, FAILURE_STATUSES, REDIRECT_STATUSES};
pub use value::HeaderValue;

pub type Result<T> = std::result::Result<T, HttpError>;

/// Starts a new request with default settings and the `reqwest` transport.
pub fn new_request() -> RequestBuilder {
    RequestBuilder::new()
}
