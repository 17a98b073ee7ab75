//! In-memory HTTP request as handed to the dispatcher by the host pipeline.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;
use url::Url;

use super::{Headers, Method, cookies::parse_cookie_header};

/// Base used to resolve origin-relative targets such as `/test`.
const DEFAULT_BASE: &str = "http://localhost/";

/// Errors that can occur while constructing a [`Request`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// An HTTP request with a normalized path.
///
/// The URL is parsed with the [`url`] crate, so `.` and `..` segments are resolved
/// and the path is percent-encoded consistently before any route pattern sees it.
///
/// # Examples
///
/// ```
/// use pathchain::http::{Method, Request};
///
/// let request = Request::new(Method::Get, "http://localhost:3000/a/../test?name=world")
///     .unwrap()
///     .header("Cookie", "theme=dark");
///
/// assert_eq!(request.path(), "/test");
/// assert_eq!(request.query_param("name"), Some("world"));
/// assert_eq!(request.cookie("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    /// Builds a request from an absolute URL or an origin-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `target` cannot be parsed.
    pub fn new(method: Method, target: &str) -> Result<Self, RequestError> {
        let url = match Url::parse(target) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(DEFAULT_BASE)?.join(target)?,
            Err(e) => return Err(e.into()),
        };

        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            method,
            url,
            headers: Headers::new(),
            body: Bytes::new(),
            params,
        })
    }

    /// Shorthand for a `GET` request.
    pub fn get(target: &str) -> Result<Self, RequestError> {
        Self::new(Method::Get, target)
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the normalized request path (without the query string).
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.url.query()
    }

    /// Returns a decoded query parameter value by key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks `name` up across every `Cookie` header, first occurrence wins.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all("cookie")
            .flat_map(|header| parse_cookie_header(header))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Returns the request body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }
}
