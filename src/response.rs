use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::{HttpError, Result};

/// Status codes classified as failures.
pub const FAILURE_STATUSES: [u16; 4] = [404, 500, 419, 429];

/// Status codes classified as redirects.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Parsed result of one exchange.
///
/// Only the headers following the last status line in the raw header text
/// are kept, so after a followed redirect chain the map describes the final
/// hop only.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: String,
    error: Option<HttpError>,
}

impl Response {
    /// Builds a response from the collected body and raw header text.
    pub fn parse(body: &[u8], raw_headers: &str) -> Self {
        let mut response = Self {
            status: 0,
            headers: HashMap::new(),
            body: String::from_utf8_lossy(body).into_owned(),
            error: None,
        };
        response.error = response.parse_headers(raw_headers).err();
        response
    }

    /// Empty failed response, returned when the transport could not be set up.
    pub fn empty() -> Self {
        Self::from_error(HttpError::MissingStatusLine)
    }

    pub(crate) fn from_error(error: HttpError) -> Self {
        Self {
            status: 0,
            headers: HashMap::new(),
            body: String::new(),
            error: Some(error),
        }
    }

    /// Marks an otherwise parsed response as failed by the transport.
    pub(crate) fn with_network_failure(mut self, error: HttpError) -> Self {
        self.error = Some(error);
        self
    }

    fn parse_headers(&mut self, raw: &str) -> Result<()> {
        let mut saw_status = false;

        for line in raw.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            if line.len() > 5 && line.starts_with("HTTP") {
                self.headers.clear();
                self.status = parse_status_token(line)?;
                saw_status = true;
                continue;
            }

            if let Some((name, value)) = line.split_once(':') {
                self.headers
                    .insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }

        if !saw_status {
            return Err(HttpError::MissingStatusLine);
        }
        if FAILURE_STATUSES.contains(&self.status) {
            return Err(HttpError::Status {
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_failed(&self) -> bool {
        !self.is_successful()
    }

    /// Returns `true` for 301, 302, 303, 307 and 308, regardless of success.
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }

    /// The failure that classified this response, if any.
    pub fn error(&self) -> Option<&HttpError> {
        self.error.as_ref()
    }

    /// Turns a failed response into `Err` so callers can use `?`.
    pub fn error_for_status(self) -> Result<Self> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consumes the response and returns the body.
    pub fn text(self) -> String {
        self.body
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            HttpError::Decode(format!("invalid JSON body: {err}; body: {}", self.body))
        })
    }

    /// Looks a header up by its exact, case-sensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Parses the three characters after the first space of a status line.
fn parse_status_token(line: &str) -> Result<u16> {
    let malformed = || HttpError::HeaderParse {
        line: line.to_owned(),
    };
    let (_, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let token: String = rest.chars().take(3).collect();
    if token.len() != 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    token.parse().map_err(|_| malformed())
}
