use std::{collections::HashMap, fmt};

use crate::{
    transport::{Method, TransportRequest},
    RequestOptions,
};

/// Basic authentication credentials.
#[derive(Clone, Eq, PartialEq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Credentials in `username:password` form.
    pub fn query(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration accumulated by a [`RequestBuilder`](crate::RequestBuilder).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestConfig {
    /// Header map. Names are case-sensitive.
    pub headers: HashMap<String, String>,
    /// Pre-joined cookie string sent as the `Cookie` header.
    pub cookies: String,
    /// Request payload, only sent with POST.
    pub body: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    pub options: RequestOptions,
}

impl RequestConfig {
    /// Borrowed view of this configuration for one exchange.
    pub fn to_transport_request<'a>(&'a self, url: &'a str, method: Method) -> TransportRequest<'a> {
        TransportRequest {
            method,
            url,
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect(),
            body: match method {
                Method::Post => Some(self.body.as_deref().unwrap_or_default()),
                Method::Get => None,
            },
            follow_redirects: self.options.follow_redirects,
            proxy: self.options.effective_proxy(),
            cookies: (!self.cookies.is_empty()).then_some(self.cookies.as_str()),
            basic_auth: self
                .basic_auth
                .as_ref()
                .map(|auth| (auth.username.as_str(), auth.password.as_str())),
            timeout: self.options.effective_timeout(),
        }
    }
}
