//! Request dispatch: run path-scoped handler chains over one shared response.
//!
//! A [`Dispatcher`] owns an ordered table of [`RouteEntry`] values. For each request it
//! walks the table in declaration order, and for every entry whose pattern matches the
//! request path it runs that entry's handlers one after another, each with a
//! [`HandlerContext`] that borrows the same in-progress [`Response`].
//!
//! - A handler returning [`Flow::Continue`] keeps its mutations and dispatch moves on.
//! - A handler returning [`Flow::Terminate`] ends dispatch immediately. Its response is
//!   returned with the shared headers and cookies merged in (see [`combine`]).
//! - When no handler terminates, [`Response::next`] is returned with the shared headers
//!   and cookies merged in.
//! - A handler error aborts dispatch and is returned as-is.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::context::{Event, HandlerContext};
use crate::middleware::{Flow, HandlerChain, HandlerError};
use crate::router::{MatchOptions, PathPattern, PatternError};
use crate::{Request, Response};

/// A compiled `(pattern, handlers)` pair.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pattern: PathPattern,
    chain: HandlerChain,
}

impl RouteEntry {
    /// Compile `pattern` with default [`MatchOptions`] and bind it to `chain`.
    ///
    /// # Errors
    ///
    /// Returns the [`PatternError`] raised by compiling `pattern`.
    pub fn new(pattern: &str, chain: impl Into<HandlerChain>) -> Result<Self, PatternError> {
        Self::with_options(pattern, chain, MatchOptions::default())
    }

    pub fn with_options(
        pattern: &str,
        chain: impl Into<HandlerChain>,
        options: MatchOptions,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::compile_with(pattern, options)?,
            chain: chain.into(),
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }
}

/// Copy every header and cookie of `source` onto `target`, then return `target`.
///
/// On a name collision `source` wins. For headers, all of `target`'s values for that
/// name are dropped before `source`'s values are appended, so multi-value headers
/// survive intact. Status and body are always `target`'s.
///
/// ```
/// use pathchain::dispatcher::combine;
/// use pathchain::Response;
///
/// let mut shared = Response::default();
/// shared.headers_mut().set("x-test", "from-shared");
///
/// let terminal = Response::next().header("x-test", "from-terminal");
/// let merged = combine(terminal, &shared);
///
/// assert_eq!(merged.headers().get("x-test"), Some("from-shared"));
/// assert!(merged.is_next());
/// ```
pub fn combine(mut target: Response, source: &Response) -> Response {
    for name in source.headers().names() {
        let headers = target.headers_mut();
        headers.remove(name);
        for value in source.headers().get_all(name) {
            headers.insert(name, value);
        }
    }

    for cookie in source.cookies().get_all() {
        target.cookies_mut().set(cookie.clone());
    }

    target
}

/// Routes a request through every matching handler chain.
///
/// Cheap to clone; clones share the compiled table.
///
/// # Examples
///
/// ```rust
/// use pathchain::{Dispatcher, Event, Request, Response};
/// use pathchain::middleware::{Flow, from_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dispatcher = Dispatcher::builder()
///     .route("{/*any}", from_fn(|ctx| {
///         ctx.response.headers_mut().set("x-any", "any");
///         Ok(Flow::Continue)
///     }))
///     .route("/test", from_fn(|_ctx| {
///         Ok(Flow::Terminate(Response::json(&serde_json::json!({ "test": "test" }))?))
///     }))
///     .build()
///     .unwrap();
///
/// let request = Request::get("http://localhost:3000/test").unwrap();
/// let response = dispatcher.dispatch(&request, &Event::new()).await.unwrap();
///
/// assert_eq!(response.text().unwrap(), r#"{"test":"test"}"#);
/// assert_eq!(response.headers().get("x-any"), Some("any"));
/// assert!(!response.is_next());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    entries: Arc<[RouteEntry]>,
}

impl Dispatcher {
    /// Compile `entries` into a dispatcher, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] found; no dispatcher is built.
    pub fn new<I, P, C>(entries: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<HandlerChain>,
    {
        let entries = entries
            .into_iter()
            .map(|(pattern, chain)| RouteEntry::new(pattern.as_ref(), chain))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_entries(entries))
    }

    /// Start a [`DispatcherBuilder`].
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Wrap already-compiled entries.
    pub fn from_entries(entries: Vec<RouteEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every matching handler chain for `request` and produce the final response.
    ///
    /// Entries are evaluated in declaration order and handlers strictly one at a time.
    ///
    /// # Errors
    ///
    /// Returns the [`HandlerError`] of the first failing handler. Nothing after it runs.
    pub async fn dispatch(&self, request: &Request, event: &Event) -> Result<Response, HandlerError> {
        let start = Instant::now();
        let path = request.path();
        let mut shared = Response::default();

        for (index, entry) in self.entries.iter().enumerate() {
            let Some(matched) = entry.pattern.matches(path) else {
                continue;
            };

            debug!(path, pattern = %entry.pattern, entry = index, "route matched");

            for (position, handler) in entry.chain.handlers().iter().enumerate() {
                trace!(pattern = %entry.pattern, position, "invoking handler");

                let ctx = HandlerContext::new(request, &mut shared, event, &matched);
                let flow = handler.call(ctx).await.inspect_err(|e| {
                    debug!(path, pattern = %entry.pattern, position, error = %e, "handler failed");
                })?;

                if let Flow::Terminate(response) = flow {
                    let response = combine(response, &shared);
                    debug!(
                        path,
                        pattern = %entry.pattern,
                        status = response.status().as_u16(),
                        elapsed = ?start.elapsed(),
                        "dispatch terminated"
                    );
                    return Ok(response);
                }
            }
        }

        debug!(path, elapsed = ?start.elapsed(), "dispatch fell through");
        Ok(combine(Response::next(), &shared))
    }
}

/// Collects routes and [`MatchOptions`], then compiles them in [`build`](Self::build).
///
/// ```rust
/// use pathchain::Dispatcher;
/// use pathchain::middleware::{from_fn, short_circuit, Flow, Handler};
/// use pathchain::router::MatchOptions;
///
/// let dispatcher = Dispatcher::builder()
///     .options(MatchOptions { sensitive: false, ..MatchOptions::default() })
///     .route("/health", short_circuit())
///     .route("/admin/*rest", vec![
///         from_fn(|_ctx| Ok(Flow::Continue)).boxed(),
///         short_circuit().boxed(),
///     ])
///     .build()
///     .unwrap();
///
/// assert_eq!(dispatcher.len(), 2);
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct DispatcherBuilder {
    options: MatchOptions,
    routes: Vec<(String, HandlerChain)>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching options applied to every route, including ones added earlier.
    pub fn options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a route. Routes run in the order they are added.
    pub fn route(mut self, pattern: impl Into<String>, chain: impl Into<HandlerChain>) -> Self {
        self.routes.push((pattern.into(), chain.into()));
        self
    }

    /// Compile every pattern.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] found.
    pub fn build(self) -> Result<Dispatcher, PatternError> {
        let options = self.options;
        let entries = self
            .routes
            .into_iter()
            .map(|(pattern, chain)| RouteEntry::with_options(&pattern, chain, options))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dispatcher::from_entries(entries))
    }
}
