//! Buffered HTTP response shared by every pipeline stage.

use std::borrow::Cow;
use std::collections::BTreeMap;

use http::StatusCode;

/// A fully buffered HTTP response.
///
/// Header names are stored lowercase so lookups and replacements are
/// case-insensitive. The body is owned bytes; cloning a response yields an
/// independent copy that later stages may rewrite freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeResponse {
    /// The HTTP status code.
    pub status: u16,
    headers: BTreeMap<String, String>,
    /// The response body.
    pub body: Vec<u8>,
}

impl EdgeResponse {
    /// Create an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a response from raw parts.
    pub fn from_parts<I, K, V>(status: u16, headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut response = Self::new(status).with_body(body);
        for (name, value) in headers {
            response.set_header(name, value);
        }
        response
    }

    /// A plain-text response, used for every error surfaced to clients.
    pub fn plain_text(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status.as_u16())
            .with_header(http::header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
            .with_body(message.into().into_bytes())
    }

    /// A `302 Found` redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(StatusCode::FOUND.as_u16()).with_header(http::header::LOCATION.as_str(), location)
    }

    /// Set a header, builder style.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replace the body, builder style.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header, replacing any value under the same name.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Remove a header, returning its previous value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Iterate over headers as `(lowercase name, value)`.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
