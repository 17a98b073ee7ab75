//! Per-invocation handler context.
//!
//! A [`HandlerContext`] is built by the dispatcher for every handler call. All
//! contexts of one dispatch borrow the same [`Response`], which is how headers and
//! cookies set by one handler reach the handlers after it and the final response.

pub mod event;

pub use event::Event;

use crate::router::MatchResult;
use crate::{Request, Response};

/// What a handler sees: the request, the shared in-progress response, the ambient
/// event, and the parameters captured by the pattern that selected it.
///
/// The fields are public so a handler can borrow them independently, e.g. read the
/// request while writing the response.
#[derive(Debug)]
pub struct HandlerContext<'a> {
    pub request: &'a Request,
    /// Shared by every handler of the current dispatch call.
    pub response: &'a mut Response,
    pub event: &'a Event,
    pub match_result: &'a MatchResult,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        request: &'a Request,
        response: &'a mut Response,
        event: &'a Event,
        match_result: &'a MatchResult,
    ) -> Self {
        Self {
            request,
            response,
            event,
            match_result,
        }
    }

    /// Value of the named parameter `name` captured for this handler's route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.match_result.params().get_str(name)
    }

    /// Segments captured by the catch-all `name`.
    pub fn rest(&self, name: &str) -> Option<&[String]> {
        self.match_result.params().get_all(name)
    }
}
