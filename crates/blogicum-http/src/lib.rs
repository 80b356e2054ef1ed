//! HTTP layer for Blogicum.
//!
//! This crate holds everything between the socket and a view function:
//! the [`Request`]/[`Response`] pair, the [`Handler`] and [`Middleware`]
//! traits, URL routing with reversible named routes, multipart parsing,
//! media file storage and the hyper based server loop.

pub mod cookie;
pub mod extensions;
pub mod media;
pub mod middleware;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod shortcuts;

pub use blogicum_core::{Error, Result};
pub use cookie::{Cookie, SameSite};
pub use extensions::Extensions;
pub use media::{MediaHandler, MediaStorage, UploadError};
pub use middleware::{Handler, Middleware, MiddlewareChain, handler_fn};
pub use multipart::{MultipartForm, UploadedFile};
pub use request::Request;
pub use response::Response;
pub use router::{PathPattern, Route, Router, UrlResolver};
pub use server::HttpServer;
pub use shortcuts::{get_or_404, redirect};
