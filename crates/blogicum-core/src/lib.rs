//! Core building blocks shared by every Blogicum crate.
//!
//! - [`exception`]: the error type returned by handlers and its HTTP status mapping
//! - [`pagination`]: Django-style lenient page lookup
//! - [`messages`]: one-shot notifications shown on the next rendered page

pub mod exception;
pub mod messages;
pub mod pagination;

pub use exception::{Error, Result};
pub use messages::{Level, Message};
pub use pagination::{Page, Paginator};
