use std::fmt;

use crate::{
    config::BasicAuth,
    transport::{Method, Transport},
    Executor, HeaderValue, RequestConfig, RequestOptions, Response,
};

/// Header set by [`RequestBuilder::with_token`].
///
/// Note this is `Authentication`, not the standard `Authorization`.
pub const TOKEN_HEADER: &str = "Authentication";

/// Fluent builder for a single GET or POST request.
///
/// # Example
///
/// ```no_run
/// use fluent_request::new_request;
///
/// let response = new_request()
///     .with_header("X-Attempt", 3)
///     .retry(3, 100)
///     .follow_redirects()
///     .get("https://example.com/");
///
/// if response.is_failed() {
///     eprintln!("request failed: {:?}", response.error());
/// }
/// ```
#[derive(Clone, Default)]
pub struct RequestBuilder {
    config: RequestConfig,
    executor: Executor,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder running on a custom transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::new().with_executor(Executor::new(transport))
    }

    /// Replaces the executor used by [`get`](Self::get) and [`post`](Self::post).
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    /// Applies timeout, retry, redirect and proxy options wholesale.
    pub fn with_options(mut self, opts: RequestOptions) -> Self {
        self.config.options = opts;
        self
    }

    /// Sets the number of attempts and the delay between them.
    ///
    /// Delays below three seconds are raised to three seconds at execution.
    pub fn retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.config.options.retry_attempts = attempts;
        self.config.options.retry_delay_ms = delay_ms;
        self
    }

    /// Sets `Authentication: Bearer <token>`.
    pub fn with_token(mut self, token: impl AsRef<str>) -> Self {
        self.config
            .headers
            .insert(TOKEN_HEADER.to_owned(), format!("Bearer {}", token.as_ref()));
        self
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets the request body. Ignored by [`get`](Self::get).
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.config.body = Some(body.into());
        self
    }

    /// Routes the request through `proxy`. An empty string disables it.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.options.proxy = proxy.into();
        self
    }

    /// Appends `key=value; ` to the cookie string.
    pub fn add_cookie(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let cookies = &mut self.config.cookies;
        cookies.push_str(key.as_ref());
        cookies.push('=');
        cookies.push_str(value.as_ref());
        cookies.push_str("; ");
        self
    }

    /// Replaces the whole cookie string verbatim.
    pub fn set_raw_cookies(mut self, raw: impl Into<String>) -> Self {
        self.config.cookies = raw.into();
        self
    }

    /// Sets the timeout in milliseconds. Values of 100 or less are ignored.
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.config.options.timeout_ms = timeout_ms;
        self
    }

    /// Sets a header, overwriting any previous value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        let value: HeaderValue = value.into();
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Adds headers whose names are not set yet. Existing values are kept.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        for (name, value) in headers {
            let value: HeaderValue = value.into();
            self.config
                .headers
                .entry(name.into())
                .or_insert_with(|| value.into());
        }
        self
    }

    pub fn follow_redirects(mut self) -> Self {
        self.config.options.follow_redirects = true;
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Sends a GET request, blocking until the final attempt completes.
    pub fn get(&self, url: impl AsRef<str>) -> Response {
        self.executor.execute(&self.config, url.as_ref(), Method::Get)
    }

    /// Sends a POST request with the configured body.
    pub fn post(&self, url: impl AsRef<str>) -> Response {
        self.executor.execute(&self.config, url.as_ref(), Method::Post)
    }
}
