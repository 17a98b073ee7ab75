//! Security handlers.
//!
//! - [`Cors`]: Cross-Origin Resource Sharing header injection and preflight
//!   (`OPTIONS`) short-circuiting.

pub mod cors;

pub use cors::Cors;
