//! HTTP response value shared between handlers and returned by the dispatcher.
//!
//! A [`Response`] is either the *continue* response built by [`Response::next`],
//! which tells the host pipeline to fall through to its next stage, or a terminal
//! response carrying a status and body of its own.

use bytes::Bytes;
use serde::Serialize;

use super::{Cookies, Headers, StatusCode};

/// Header marking a response as "continue to the next stage".
pub const NEXT_HEADER: &str = "x-middleware-next";

/// Header asking the host to serve a different URL without redirecting.
pub const REWRITE_HEADER: &str = "x-middleware-rewrite";

/// An HTTP response with keyed headers and a named cookie store.
///
/// # Examples
///
/// ```
/// use pathchain::http::{Response, StatusCode};
///
/// let response = Response::json(&serde_json::json!({ "test": "test" })).unwrap();
/// assert_eq!(response.status(), StatusCode::Ok);
/// assert_eq!(response.text().unwrap(), r#"{"test":"test"}"#);
/// assert!(!response.is_next());
///
/// assert!(Response::next().is_next());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    cookies: Cookies,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            cookies: Cookies::new(),
            body: Bytes::new(),
        }
    }

    /// A response that lets the request continue to the next pipeline stage.
    pub fn next() -> Self {
        Self::new(StatusCode::Ok).header(NEXT_HEADER, "1")
    }

    /// A `200 OK` response whose body is `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised by serialization.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::Ok)
            .header("content-type", "application/json")
            .body(body))
    }

    /// A redirect to `location`.
    pub fn redirect(location: impl Into<String>, status: StatusCode) -> Self {
        Self::new(status).header("location", location)
    }

    /// A response that makes the host serve `destination` in place of the requested URL.
    pub fn rewrite(destination: impl Into<String>) -> Self {
        Self::new(StatusCode::Ok).header(REWRITE_HEADER, destination)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in-place.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn status_code(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// `true` when the response carries the continue marker.
    pub fn is_next(&self) -> bool {
        self.headers.contains(NEXT_HEADER)
    }

    /// Renders the cookie store as `Set-Cookie` header values, in insertion order.
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.cookies.get_all().map(ToString::to_string).collect()
    }
}

/// An empty `200 OK` with no headers, cookies or body. The dispatcher starts every
/// call from one of these.
impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}
