//! Project middleware.
//!
//! The stack, outermost first:
//!
//! 1. [`RequestLoggingMiddleware`]: one log line per request
//! 2. [`StateMiddleware`]: installs [`AppState`]
//! 3. session middleware from `blogicum-auth`
//! 4. [`ErrorPageMiddleware`]: turns errors into rendered error pages, so
//!    the session is saved after an error page consumed its messages
//! 5. CSRF and authentication middleware from `blogicum-auth`
//! 6. the router

use async_trait::async_trait;
use blogicum_core::{Error, Result};
use blogicum_http::{Handler, Middleware, Request, Response};
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use tera::Context;

use crate::config::state::AppState;
use crate::config::templates::add_request_context;

/// Logs method, path, status and latency of every request.
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

impl Default for RequestLoggingMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for RequestLoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let started = Instant::now();
		let method = request.method.clone();
		let path = request.full_path();

		let result = next.handle(request).await;
		let elapsed_ms = started.elapsed().as_millis() as u64;

		match &result {
			Ok(response) if response.status.is_server_error() => {
				tracing::error!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request failed");
			}
			Ok(response) => {
				tracing::info!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request");
			}
			Err(err) => {
				tracing::error!(%method, %path, error = %err, elapsed_ms, "request failed");
			}
		}
		result
	}
}

/// Puts a clone of the application state into the request extensions.
pub struct StateMiddleware {
	state: AppState,
}

impl StateMiddleware {
	pub fn new(state: AppState) -> Self {
		Self { state }
	}
}

#[async_trait]
impl Middleware for StateMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		request.extensions.insert(self.state.clone());
		next.handle(request).await
	}
}

/// Renders `pages/404.html`, `pages/403.html`, `pages/403csrf.html` and
/// `pages/500.html` for errors returned further down the stack.
///
/// The page sees whatever the inner middleware stored on the request
/// (current user, CSRF token), since request extensions are shared between
/// clones.
pub struct ErrorPageMiddleware;

impl ErrorPageMiddleware {
	pub fn new() -> Self {
		Self
	}

	fn page_for(err: &Error) -> Option<(&'static str, StatusCode)> {
		match err {
			Error::CsrfFailure(_) => Some(("pages/403csrf.html", StatusCode::FORBIDDEN)),
			Error::PermissionDenied(_) => Some(("pages/403.html", StatusCode::FORBIDDEN)),
			_ => match err.status_code() {
				StatusCode::NOT_FOUND => Some(("pages/404.html", StatusCode::NOT_FOUND)),
				StatusCode::INTERNAL_SERVER_ERROR => {
					Some(("pages/500.html", StatusCode::INTERNAL_SERVER_ERROR))
				}
				_ => None,
			},
		}
	}

	fn render(request: &Request, err: &Error) -> Response {
		let status = err.status_code();
		let Some((template, status)) = Self::page_for(err) else {
			return Response::new(status)
				.with_content_type("text/plain; charset=utf-8")
				.with_body(err.to_string());
		};
		let Ok(state) = AppState::from_request(request) else {
			return Response::new(status);
		};

		let mut context = Context::new();
		context.insert("status_code", &status.as_u16());
		if let Error::CsrfFailure(reason) = err {
			context.insert("reason", reason);
		}
		if state.settings.debug {
			context.insert("error", &err.to_string());
		}
		add_request_context(request, &state, &mut context);

		match state.templates.render(template, &context) {
			Ok(html) => Response::html(status, html),
			Err(e) => {
				tracing::error!(template, error = %e, "failed to render error page");
				Response::new(status)
			}
		}
	}
}

impl Default for ErrorPageMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for ErrorPageMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let snapshot = request.clone();
		match next.handle(request).await {
			Ok(response) => Ok(response),
			Err(err) => {
				if err.is_client_error() {
					tracing::debug!(path = snapshot.path(), error = %err, "client error");
				} else {
					tracing::error!(path = snapshot.path(), error = %err, "internal error");
				}
				Ok(Self::render(&snapshot, &err))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use blogicum_http::{MiddlewareChain, handler_fn};
	use rstest::rstest;

	async fn failing(request: Request) -> Result<Response> {
		match request.path() {
			"/missing/" => Err(Error::NotFound("post".into())),
			"/bad/" => Err(Error::BadRequest("broken body".into())),
			_ => Ok(Response::ok().with_body("fine")),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_errors_without_state_become_bare_responses() {
		// Arrange
		let chain = MiddlewareChain::new(handler_fn(failing))
			.with_middleware(Arc::new(RequestLoggingMiddleware::new()))
			.with_middleware(Arc::new(ErrorPageMiddleware::new()));

		// Act
		let missing = chain
			.handle(Request::builder().uri("/missing/").build().unwrap())
			.await
			.unwrap();
		let bad = chain
			.handle(Request::builder().uri("/bad/").build().unwrap())
			.await
			.unwrap();
		let fine = chain
			.handle(Request::builder().uri("/ok/").build().unwrap())
			.await
			.unwrap();

		// Assert
		assert_eq!(missing.status, StatusCode::NOT_FOUND);
		assert_eq!(bad.status, StatusCode::BAD_REQUEST);
		assert_eq!(bad.text(), "Bad request: broken body");
		assert_eq!(fine.text(), "fine");
	}

	#[rstest]
	#[case(Error::CsrfFailure("x".into()), "pages/403csrf.html")]
	#[case(Error::PermissionDenied("x".into()), "pages/403.html")]
	#[case(Error::NotFound("x".into()), "pages/404.html")]
	#[case(Error::Internal("x".into()), "pages/500.html")]
	fn test_page_selection(#[case] err: Error, #[case] template: &str) {
		assert_eq!(ErrorPageMiddleware::page_for(&err).map(|(t, _)| t), Some(template));
	}
}
