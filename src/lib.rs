//! # pathchain
//!
//! Path-scoped request middleware for edge request pipelines.
//!
//! A [`Dispatcher`] holds an ordered table of route patterns, each bound to one
//! handler or a sequence of handlers. Every matching handler runs, in declaration
//! order, against one shared in-progress [`Response`]. A handler either continues or
//! terminates with its own response; headers and cookies accumulated along the way
//! are merged into whatever comes out.
//!
//! ## Quick Start
//!
//! ```rust
//! use pathchain::{Dispatcher, Event, Request, Response};
//! use pathchain::middleware::{Flow, from_fn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .route("{/*any}", from_fn(|ctx| {
//!             ctx.response.headers_mut().set("x-request-path", ctx.request.path());
//!             Ok(Flow::Continue)
//!         }))
//!         .route("/users/:id", from_fn(|ctx| {
//!             let id = ctx.param("id").unwrap_or_default();
//!             Ok(Flow::Terminate(Response::json(&serde_json::json!({ "id": id }))?))
//!         }))
//!         .build()?;
//!
//!     let request = Request::get("https://example.com/users/42")?;
//!     let response = dispatcher.dispatch(&request, &Event::new()).await?;
//!
//!     assert_eq!(response.text()?, r#"{"id":"42"}"#);
//!     assert_eq!(response.headers().get("x-request-path"), Some("/users/42"));
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod dispatcher;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use context::{Event, HandlerContext};
pub use dispatcher::{Dispatcher, DispatcherBuilder, RouteEntry, combine};
pub use http::{Cookie, Cookies, Headers, Method, Request, Response, StatusCode};
pub use middleware::{
    Flow, Handler, HandlerChain, HandlerError, from_async_fn, from_fn, short_circuit,
};
pub use router::{MatchOptions, MatchResult, PathPattern, PatternError};
