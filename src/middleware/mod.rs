//! Handler model: the functions a dispatcher runs for matching routes.
//!
//! ## Core types
//!
//! - [`Handler`]: trait implemented by everything the dispatcher can call.
//! - [`Flow`]: a handler's verdict: [`Flow::Continue`] or [`Flow::Terminate`].
//! - [`BoxedHandler`]: type-erased, cheaply-cloneable handler.
//! - [`HandlerChain`]: one handler or an ordered sequence bound to a route.
//! - [`from_fn`] / [`from_async_fn`]: adapt closures into handlers.
//! - [`short_circuit`]: built-in handler that stops dispatch and lets the request through.
//!
//! A handler receives a [`HandlerContext`] whose `response` is shared with every other
//! handler of the same dispatch call. Returning `Continue` keeps whatever it wrote
//! there; returning `Terminate(response)` ends dispatch and the shared headers and
//! cookies are folded into `response`.

use std::{future::Future, pin::Pin, sync::Arc};

use thiserror::Error;

use crate::{Response, context::HandlerContext};

/// Boxed error type accepted by [`HandlerError::new`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure raised by a handler. The dispatcher returns it unchanged.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to serialize response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(BoxError),
}

impl HandlerError {
    /// Wrap any error or message.
    ///
    /// ```
    /// use pathchain::middleware::HandlerError;
    ///
    /// let err = HandlerError::new("session store unavailable");
    /// assert_eq!(err.to_string(), "session store unavailable");
    /// ```
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

/// The outcome of one handler invocation.
#[derive(Debug)]
#[must_use]
pub enum Flow {
    /// Keep dispatching. Mutations to the shared response stay in effect.
    Continue,
    /// Stop dispatching and answer with this response.
    Terminate(Response),
}

impl Flow {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl From<Response> for Flow {
    fn from(response: Response) -> Self {
        Self::Terminate(response)
    }
}

pub type HandlerResult = Result<Flow, HandlerError>;

/// The future returned by [`Handler::call`], borrowing from the context for `'a`.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;

/// The core trait for everything a dispatcher can run.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync`; a dispatcher is shared across tasks.
/// - The returned future may borrow the context but nothing else with a shorter life.
/// - Failures are returned as `Err`; the dispatcher does not catch or retry them.
///
/// # Examples
///
/// ```rust
/// use pathchain::context::HandlerContext;
/// use pathchain::middleware::{Flow, Handler, HandlerFuture};
///
/// struct PoweredBy(&'static str);
///
/// impl Handler for PoweredBy {
///     fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
///         Box::pin(async move {
///             ctx.response.headers_mut().set("x-powered-by", self.0);
///             Ok(Flow::Continue)
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a>;

    /// Erase the concrete type so handlers of different types fit in one chain.
    fn boxed(self) -> BoxedHandler
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A type-erased, reference-counted handler.
pub type BoxedHandler = Arc<dyn Handler>;

impl<H> Handler for Arc<H>
where
    H: Handler + ?Sized,
{
    fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
        (**self).call(ctx)
    }
}

/// Handler built by [`from_fn`].
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(HandlerContext<'a>) -> HandlerResult + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
        Box::pin(std::future::ready((self.0)(ctx)))
    }
}

/// Adapt a synchronous closure into a [`Handler`].
///
/// ```rust
/// use pathchain::middleware::{Flow, from_fn};
///
/// let handler = from_fn(|ctx| {
///     ctx.response.headers_mut().set("x-test", "test");
///     Ok(Flow::Continue)
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(HandlerContext<'a>) -> HandlerResult + Send + Sync + 'static,
{
    FnHandler(f)
}

/// Handler built by [`from_async_fn`].
pub struct AsyncFnHandler<F>(F);

impl<F> Handler for AsyncFnHandler<F>
where
    F: for<'a> Fn(HandlerContext<'a>) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
        (self.0)(ctx)
    }
}

/// Adapt an asynchronous closure into a [`Handler`].
///
/// The closure returns its future boxed, which lets the future borrow the context.
///
/// ```rust
/// use pathchain::Response;
/// use pathchain::middleware::{Flow, from_async_fn};
///
/// let handler = from_async_fn(|ctx| {
///     Box::pin(async move {
///         if ctx.request.cookie("session").is_none() {
///             return Ok(Flow::Terminate(Response::json(&"login required")?));
///         }
///         Ok(Flow::Continue)
///     })
/// });
/// ```
pub fn from_async_fn<F>(f: F) -> AsyncFnHandler<F>
where
    F: for<'a> Fn(HandlerContext<'a>) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    AsyncFnHandler(f)
}

/// Built-in handler that ends dispatch with [`Response::next`].
///
/// Later handlers and routes are skipped while the request still falls through to
/// the next pipeline stage, carrying every header and cookie set so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortCircuit;

impl Handler for ShortCircuit {
    fn call<'a>(&'a self, _ctx: HandlerContext<'a>) -> HandlerFuture<'a> {
        Box::pin(std::future::ready(Ok(Flow::Terminate(Response::next()))))
    }
}

pub fn short_circuit() -> ShortCircuit {
    ShortCircuit
}

/// The handlers bound to one route: a single handler or an ordered sequence.
#[derive(Clone)]
pub enum HandlerChain {
    Single(BoxedHandler),
    Sequence(Vec<BoxedHandler>),
}

impl HandlerChain {
    /// The chain as a slice, in invocation order.
    pub fn handlers(&self) -> &[BoxedHandler] {
        match self {
            Self::Single(handler) => std::slice::from_ref(handler),
            Self::Sequence(handlers) => handlers,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers().is_empty()
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("len", &self.len())
            .finish()
    }
}

impl<H: Handler> From<H> for HandlerChain {
    fn from(handler: H) -> Self {
        Self::Single(handler.boxed())
    }
}

impl From<Vec<BoxedHandler>> for HandlerChain {
    fn from(handlers: Vec<BoxedHandler>) -> Self {
        Self::Sequence(handlers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Event;
    use crate::router::PathPattern;
    use crate::{Request, StatusCode};

    struct Fixture {
        request: Request,
        event: Event,
        matched: crate::router::MatchResult,
    }

    impl Fixture {
        fn new() -> Self {
            let request = Request::get("/test").unwrap();
            let matched = PathPattern::compile("/test")
                .unwrap()
                .matches(request.path())
                .unwrap();
            Self {
                request,
                event: Event::new(),
                matched,
            }
        }

        async fn run(&self, handler: &dyn Handler, response: &mut Response) -> HandlerResult {
            let ctx = HandlerContext::new(&self.request, response, &self.event, &self.matched);
            handler.call(ctx).await
        }
    }

    #[tokio::test]
    async fn from_fn_mutates_shared_response() {
        let fixture = Fixture::new();
        let handler = from_fn(|ctx| {
            ctx.response.headers_mut().set("x-test", "test");
            Ok(Flow::Continue)
        });

        let mut response = Response::default();
        let flow = fixture.run(&handler, &mut response).await.unwrap();

        assert!(flow.is_continue());
        assert_eq!(response.headers().get("x-test"), Some("test"));
    }

    #[tokio::test]
    async fn from_async_fn_awaits_inner_work() {
        let fixture = Fixture::new();
        let handler = from_async_fn(|ctx| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                ctx.response.headers_mut().set("x-async", "done");
                Ok(Flow::Continue)
            })
        });

        let mut response = Response::default();
        let flow = fixture.run(&handler, &mut response).await.unwrap();

        assert!(flow.is_continue());
        assert_eq!(response.headers().get("x-async"), Some("done"));
    }

    #[tokio::test]
    async fn terminate_carries_response() {
        let fixture = Fixture::new();
        let handler = from_fn(|_ctx| Ok(Response::new(StatusCode::Forbidden).into()));

        let mut response = Response::default();
        match fixture.run(&handler, &mut response).await.unwrap() {
            Flow::Terminate(r) => assert_eq!(r.status(), StatusCode::Forbidden),
            Flow::Continue => panic!("expected Terminate"),
        }
    }

    #[tokio::test]
    async fn error_is_returned() {
        let fixture = Fixture::new();
        let handler = from_fn(|_ctx| Err(HandlerError::new("boom")));

        let mut response = Response::default();
        let err = fixture.run(&handler, &mut response).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn short_circuit_returns_next() {
        let fixture = Fixture::new();
        let mut response = Response::default();
        match fixture.run(&short_circuit(), &mut response).await.unwrap() {
            Flow::Terminate(r) => assert!(r.is_next()),
            Flow::Continue => panic!("expected Terminate"),
        }
    }

    #[tokio::test]
    async fn boxed_handler_delegates() {
        let fixture = Fixture::new();
        let boxed: BoxedHandler = from_fn(|ctx| {
            ctx.response.headers_mut().set("x-boxed", "1");
            Ok(Flow::Continue)
        })
        .boxed();

        let mut response = Response::default();
        let _ = fixture.run(&boxed, &mut response).await.unwrap();
        assert_eq!(response.headers().get("x-boxed"), Some("1"));
    }

    #[test]
    fn chain_normalizes_to_slice() {
        let single = HandlerChain::from(short_circuit());
        assert_eq!(single.len(), 1);

        let sequence = HandlerChain::from(vec![short_circuit().boxed(), short_circuit().boxed()]);
        assert_eq!(sequence.handlers().len(), 2);
        assert!(!sequence.is_empty());

        assert!(HandlerChain::from(Vec::<BoxedHandler>::new()).is_empty());
    }

    #[test]
    fn json_error_converts() {
        let err: HandlerError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, HandlerError::Json(_)));
    }
}
