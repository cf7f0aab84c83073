/// Error type returned by this crate.
///
/// Terminal calls never return this directly: every failure is folded into
/// the [`Response`](crate::Response) and can be inspected through
/// [`Response::error`](crate::Response::error).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The transport could not be set up for an attempt. Not retried.
    #[error("transport handle error: {0}")]
    TransportHandle(String),
    /// A status line carried a non-numeric status token.
    #[error("malformed status line: {line}")]
    HeaderParse { line: String },
    /// Status code is in the failure blocklist.
    #[error("http error {status}")]
    Status { status: u16 },
    /// Network or request execution error from the transport.
    #[error("network failure: {message}")]
    Network {
        message: String,
        /// Whether the transport gave up because the timeout elapsed.
        timeout: bool,
    },
    /// Raw header text contained no status line at all.
    #[error("response carried no status line")]
    MissingStatusLine,
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
}

impl HttpError {
    /// Returns `true` for failures the executor retries.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            HttpError::TransportHandle(_) | HttpError::Decode(_) | HttpError::Config(_)
        )
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::Network {
            message: err.to_string(),
            timeout: err.is_timeout(),
        }
    }
}
