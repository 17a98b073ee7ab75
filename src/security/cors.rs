//! Cross-Origin Resource Sharing as a route handler.

use crate::{
    Method, Response, StatusCode,
    context::HandlerContext,
    middleware::{Flow, Handler, HandlerFuture},
};

/// CORS handler. Validates the `Origin` header, answers preflight requests, and
/// writes `Access-Control-*` headers onto the shared response.
///
/// Configured through the builder methods [`allow_origin`](Self::allow_origin),
/// [`allow_method`](Self::allow_method), and [`allow_header`](Self::allow_header).
///
/// # Behavior
///
/// - If no `Origin` header is present, or the origin is not allowed, the handler
///   continues without touching the response.
/// - `OPTIONS` preflight requests terminate dispatch with `204 No Content` and the
///   `Access-Control-*` headers; later handlers and routes do **not** run.
/// - For all other requests the headers are set on the shared response and dispatch
///   continues, so they end up on whatever response is finally returned.
/// - A specific (non-wildcard) origin also appends `Vary: Origin`, keeping any `Vary`
///   values earlier handlers wrote.
///
/// # Examples
///
/// ```rust
/// use pathchain::{Dispatcher, security::Cors};
///
/// let dispatcher = Dispatcher::builder()
///     .route(
///         "/api/*rest",
///         Cors::new()
///             .allow_origin("https://example.com")
///             .allow_method("PATCH"),
///     )
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Cors {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    max_age: u32,
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}

impl Cors {
    /// Creates a handler with no allowed origins, the methods `GET`, `POST`, `PUT`,
    /// `DELETE`, the headers `Content-Type`, `Authorization`, and a one-hour max age.
    pub fn new() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE"]
                .map(str::to_owned)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"]
                .map(str::to_owned)
                .to_vec(),
            max_age: 3600,
        }
    }

    /// Allows every origin (`Access-Control-Allow-Origin: *`).
    pub fn permissive() -> Self {
        Self::new().allow_origin("*")
    }

    /// Adds an allowed origin. `"*"` accepts every origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Adds an allowed HTTP method, sent verbatim in `Access-Control-Allow-Methods`.
    #[must_use]
    pub fn allow_method(mut self, method: impl Into<String>) -> Self {
        self.allowed_methods.push(method.into());
        self
    }

    /// Adds an allowed request header, sent verbatim in `Access-Control-Allow-Headers`.
    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.allowed_headers.push(header.into());
        self
    }

    /// Preflight cache lifetime in seconds.
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = seconds;
        self
    }

    // The value for `Access-Control-Allow-Origin`, or `None` if `origin` is rejected.
    fn resolve_origin(&self, origin: &str) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            Some("*".to_owned())
        } else if self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }

    fn apply(&self, response: &mut Response, allow_origin: &str) {
        let headers = response.headers_mut();
        headers.set("Access-Control-Allow-Origin", allow_origin);
        headers.set("Access-Control-Allow-Methods", self.allowed_methods.join(", "));
        headers.set("Access-Control-Allow-Headers", self.allowed_headers.join(", "));
        // Vary accumulates across handlers; append unless Origin is already listed.
        let listed = headers
            .get_all("vary")
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .any(|token| token == "*" || token.eq_ignore_ascii_case("origin"));
        if allow_origin != "*" && !listed {
            headers.insert("Vary", "Origin");
        }
    }
}

impl Handler for Cors {
    fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
        let allow_origin = ctx
            .request
            .headers()
            .get("origin")
            .and_then(|origin| self.resolve_origin(origin));

        let Some(allow_origin) = allow_origin else {
            return Box::pin(std::future::ready(Ok(Flow::Continue)));
        };

        let flow = if ctx.request.method() == &Method::Options {
            let mut preflight = Response::new(StatusCode::NoContent);
            self.apply(&mut preflight, &allow_origin);
            preflight
                .headers_mut()
                .set("Access-Control-Max-Age", self.max_age.to_string());
            Flow::Terminate(preflight)
        } else {
            self.apply(ctx.response, &allow_origin);
            Flow::Continue
        };

        Box::pin(std::future::ready(Ok(flow)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Event;
    use crate::router::PathPattern;
    use crate::{Request, middleware::HandlerResult};

    async fn run(cors: &Cors, request: Request, response: &mut Response) -> HandlerResult {
        let event = Event::new();
        let matched = PathPattern::compile("{/*any}")
            .unwrap()
            .matches(request.path())
            .unwrap();
        cors.call(HandlerContext::new(&request, response, &event, &matched))
            .await
    }

    #[tokio::test]
    async fn no_origin_passes_through() {
        let mut response = Response::default();
        let flow = run(&Cors::permissive(), Request::get("/").unwrap(), &mut response)
            .await
            .unwrap();
        assert!(flow.is_continue());
        assert!(response.headers().is_empty());
    }

    #[tokio::test]
    async fn rejected_origin_passes_through() {
        let cors = Cors::new().allow_origin("https://good.example");
        let request = Request::get("/")
            .unwrap()
            .header("Origin", "https://evil.example");
        let mut response = Response::default();
        let flow = run(&cors, request, &mut response).await.unwrap();
        assert!(flow.is_continue());
        assert!(!response.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn actual_request_sets_headers_on_shared_response() {
        let cors = Cors::new().allow_origin("https://good.example");
        let request = Request::get("/")
            .unwrap()
            .header("Origin", "https://good.example");
        let mut response = Response::default();
        let flow = run(&cors, request, &mut response).await.unwrap();

        assert!(flow.is_continue());
        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin"),
            Some("https://good.example")
        );
        assert_eq!(
            headers.get("access-control-allow-methods"),
            Some("GET, POST, PUT, DELETE")
        );
        assert_eq!(headers.get("vary"), Some("Origin"));
    }

    #[tokio::test]
    async fn vary_is_appended_once() {
        let cors = Cors::new().allow_origin("https://good.example");
        let request = Request::get("/")
            .unwrap()
            .header("Origin", "https://good.example");
        let mut response = Response::default();
        response.add_header("Vary", "Accept-Encoding");

        let _ = run(&cors, request.clone(), &mut response).await.unwrap();
        let _ = run(&cors, request, &mut response).await.unwrap();

        let vary: Vec<_> = response.headers().get_all("vary").collect();
        assert_eq!(vary, vec!["Accept-Encoding", "Origin"]);
    }

    #[tokio::test]
    async fn wildcard_origin_omits_vary() {
        let request = Request::get("/")
            .unwrap()
            .header("Origin", "https://any.example");
        let mut response = Response::default();
        let _ = run(&Cors::permissive(), request, &mut response).await.unwrap();

        assert_eq!(response.headers().get("access-control-allow-origin"), Some("*"));
        assert!(!response.headers().contains("vary"));
    }

    #[tokio::test]
    async fn preflight_terminates() {
        let cors = Cors::permissive().allow_header("X-Custom").max_age(600);
        let request = Request::new(Method::Options, "/")
            .unwrap()
            .header("Origin", "https://any.example");
        let mut response = Response::default();

        match run(&cors, request, &mut response).await.unwrap() {
            Flow::Terminate(preflight) => {
                assert_eq!(preflight.status(), StatusCode::NoContent);
                assert_eq!(
                    preflight.headers().get("access-control-allow-headers"),
                    Some("Content-Type, Authorization, X-Custom")
                );
                assert_eq!(preflight.headers().get("access-control-max-age"), Some("600"));
            }
            Flow::Continue => panic!("expected preflight to terminate"),
        }
        assert!(response.headers().is_empty());
    }
}
