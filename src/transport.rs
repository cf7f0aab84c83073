//! Transport seam between the executor and the HTTP engine.
//!
//! The executor opens one [`TransportHandle`] per attempt and drops it when
//! the attempt ends. [`ReqwestTransport`] is the default engine.

use std::fmt::Write as _;
use std::time::Duration;

use reqwest::{
    blocking::Client,
    cookie::{CookieStore, Jar},
    header::{self, HeaderMap},
    redirect, Proxy, StatusCode, Url,
};

use crate::{HttpError, Result};

/// Maximum number of redirect hops followed per attempt.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Everything the transport needs for a single exchange.
#[derive(Clone, Debug)]
pub struct TransportRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: Vec<(&'a str, &'a str)>,
    /// Request payload. Always `None` for GET.
    pub body: Option<&'a str>,
    pub follow_redirects: bool,
    pub proxy: Option<&'a str>,
    pub cookies: Option<&'a str>,
    pub basic_auth: Option<(&'a str, &'a str)>,
    pub timeout: Option<Duration>,
}

/// Destination sinks written during an exchange.
#[derive(Debug, Default)]
pub struct ExchangeSink {
    body: Vec<u8>,
    headers: String,
}

impl ExchangeSink {
    pub fn write_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub fn write_headers(&mut self, raw: &str) {
        self.headers.push_str(raw);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn raw_headers(&self) -> &str {
        &self.headers
    }
}

/// HTTP engine capable of opening per-attempt handles.
pub trait Transport: Send + Sync {
    /// Acquires a handle configured for `request`.
    ///
    /// An error here is fatal for the whole call.
    fn open(&self, request: &TransportRequest<'_>) -> Result<Box<dyn TransportHandle>>;
}

/// A single-use exchange handle. Released on drop.
pub trait TransportHandle {
    /// Performs the exchange, writing body bytes and raw header text to
    /// `sink`. Partial data may be present in `sink` on error.
    fn perform(&mut self, request: &TransportRequest<'_>, sink: &mut ExchangeSink) -> Result<()>;
}

/// Blocking transport backed by `reqwest`.
///
/// Redirects are followed hop by hop so that every hop's status line and
/// headers end up in the raw header text.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    max_redirects: usize,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
        }
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, request: &TransportRequest<'_>) -> Result<Box<dyn TransportHandle>> {
        let handle_error = |err: reqwest::Error| HttpError::TransportHandle(err.to_string());

        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(request.timeout);
        if let Some(proxy) = request.proxy {
            builder = builder.proxy(Proxy::all(proxy).map_err(handle_error)?);
        }
        let client = builder.build().map_err(handle_error)?;

        Ok(Box::new(ReqwestHandle {
            client,
            max_redirects: self.max_redirects,
        }))
    }
}

struct ReqwestHandle {
    client: Client,
    max_redirects: usize,
}

impl TransportHandle for ReqwestHandle {
    fn perform(&mut self, request: &TransportRequest<'_>, sink: &mut ExchangeSink) -> Result<()> {
        let origin = Url::parse(request.url).map_err(|err| HttpError::Network {
            message: format!("invalid url '{}': {err}", request.url),
            timeout: false,
        })?;
        let mut url = origin.clone();
        let mut method = request.method;
        let mut body = request.body;
        let mut hops = 0usize;
        // Cookies set by earlier hops of this exchange. Only active when a
        // cookie string was configured.
        let jar = request.cookies.map(|_| Jar::default());

        loop {
            let mut outgoing = match method {
                Method::Get => self.client.get(url.clone()),
                Method::Post => self
                    .client
                    .post(url.clone())
                    .header(header::CONTENT_LENGTH, body.map_or(0, str::len))
                    .body(body.unwrap_or_default().to_owned()),
            };
            for (name, value) in &request.headers {
                outgoing = outgoing.header(*name, *value);
            }
            if let (Some(configured), Some(jar)) = (request.cookies, &jar) {
                let stored = jar.cookies(&url);
                let stored = stored.as_ref().and_then(|value| value.to_str().ok());
                outgoing = outgoing.header(header::COOKIE, merge_cookies(configured, stored));
            }
            if let Some((username, password)) = request.basic_auth {
                if same_origin(&origin, &url) {
                    outgoing = outgoing.basic_auth(username, Some(password));
                }
            }

            let response = outgoing.send()?;
            let status = response.status();
            sink.write_headers(&render_header_block(
                response.version(),
                status,
                response.headers(),
            ));
            if let Some(jar) = &jar {
                let mut set_cookies = response.headers().get_all(header::SET_COOKIE).iter();
                jar.set_cookies(&mut set_cookies, &url);
            }

            let next = request
                .follow_redirects
                .then(|| redirect_target(&url, status, response.headers()))
                .flatten();
            match next {
                Some(target) if hops < self.max_redirects => {
                    hops += 1;
                    url = target;
                    if matches!(
                        status,
                        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
                    ) {
                        method = Method::Get;
                        body = None;
                    }
                }
                Some(_) => {
                    return Err(HttpError::Network {
                        message: format!("too many redirects (max {})", self.max_redirects),
                        timeout: false,
                    });
                }
                None => {
                    sink.write_body(&response.bytes()?);
                    return Ok(());
                }
            }
        }
    }
}

/// Appends cookies picked up during the exchange to the configured string.
fn merge_cookies(configured: &str, stored: Option<&str>) -> String {
    let Some(stored) = stored.filter(|value| !value.is_empty()) else {
        return configured.to_owned();
    };
    let trimmed = configured.trim_end();
    if trimmed.is_empty() {
        stored.to_owned()
    } else if trimmed.ends_with(';') {
        format!("{trimmed} {stored}")
    } else {
        format!("{trimmed}; {stored}")
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn redirect_target(current: &Url, status: StatusCode, headers: &HeaderMap) -> Option<Url> {
    if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

/// Renders a status line and headers the way they appear on the wire.
fn render_header_block(
    version: reqwest::Version,
    status: StatusCode,
    headers: &HeaderMap,
) -> String {
    let mut block = String::new();
    let _ = write!(block, "{version:?} {}", status.as_u16());
    if let Some(reason) = status.canonical_reason() {
        let _ = write!(block, " {reason}");
    }
    block.push_str("\r\n");
    for (name, value) in headers {
        let _ = write!(block, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    block.push_str("\r\n");
    block
}
