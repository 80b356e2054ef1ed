//! CSRF protection using the double-submit cookie pattern.
//!
//! Every response to a client without a valid `csrftoken` cookie issues one.
//! Requests with unsafe methods must echo the cookie value back, either as
//! the `csrfmiddlewaretoken` form field or the `X-CSRFToken` header.

use async_trait::async_trait;
use blogicum_core::{Error, Result};
use blogicum_http::{Cookie, Handler, Middleware, Request, Response};
use std::collections::HashSet;
use std::sync::Arc;

use crate::hasher::{constant_time_eq, get_random_string};

pub const CSRF_COOKIE_NAME: &str = "csrftoken";
pub const CSRF_FIELD_NAME: &str = "csrfmiddlewaretoken";
pub const CSRF_HEADER_NAME: &str = "x-csrftoken";
pub const CSRF_TOKEN_LENGTH: usize = 32;
/// One year, in seconds.
pub const CSRF_COOKIE_AGE: i64 = 60 * 60 * 24 * 365;

pub const REASON_NO_CSRF_COOKIE: &str = "CSRF cookie not set.";
pub const REASON_CSRF_TOKEN_MISSING: &str = "CSRF token missing.";
pub const REASON_CSRF_TOKEN_INCORRECT: &str = "CSRF token incorrect.";

/// The token of the current request, placed in the request extensions so
/// templates can render the hidden form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

fn is_well_formed(token: &str) -> bool {
	token.len() == CSRF_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

pub struct CsrfMiddleware {
	exempt_paths: HashSet<String>,
	cookie_secure: bool,
}

impl CsrfMiddleware {
	pub fn new() -> Self {
		Self {
			exempt_paths: HashSet::new(),
			cookie_secure: false,
		}
	}

	pub fn add_exempt_path(mut self, path: impl Into<String>) -> Self {
		self.exempt_paths.insert(path.into());
		self
	}

	pub fn with_cookie_secure(mut self, secure: bool) -> Self {
		self.cookie_secure = secure;
		self
	}

	async fn submitted_token(request: &Request) -> Result<Option<String>> {
		if let Some(header) = request.header(CSRF_HEADER_NAME) {
			return Ok(Some(header.to_string()));
		}
		Ok(request.form_data().await?.remove(CSRF_FIELD_NAME))
	}

	async fn check(&self, request: &Request, cookie_token: Option<&str>) -> Result<()> {
		let Some(expected) = cookie_token else {
			return Err(Error::CsrfFailure(REASON_NO_CSRF_COOKIE.to_string()));
		};
		let Some(submitted) = Self::submitted_token(request).await? else {
			return Err(Error::CsrfFailure(REASON_CSRF_TOKEN_MISSING.to_string()));
		};
		if !constant_time_eq(submitted.trim(), expected) {
			return Err(Error::CsrfFailure(REASON_CSRF_TOKEN_INCORRECT.to_string()));
		}
		Ok(())
	}
}

impl Default for CsrfMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for CsrfMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let cookie_token = request
			.cookie(CSRF_COOKIE_NAME)
			.filter(|token| is_well_formed(token));

		if !request.is_safe_method() && !self.exempt_paths.contains(request.path()) {
			if let Err(e) = self.check(&request, cookie_token.as_deref()).await {
				tracing::warn!(path = request.path(), error = %e, "forbidden");
				return Err(e);
			}
		}

		let token = cookie_token
			.clone()
			.unwrap_or_else(|| get_random_string(CSRF_TOKEN_LENGTH));
		request.extensions.insert(CsrfToken(token.clone()));

		let mut response = next.handle(request).await?;
		if cookie_token.is_none() {
			response.set_cookie(
				&Cookie::new(CSRF_COOKIE_NAME, token)
					.with_max_age(CSRF_COOKIE_AGE)
					.with_secure(self.cookie_secure),
			);
		}
		Ok(response)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use blogicum_http::cookie::parse_set_cookie;
	use blogicum_http::{MiddlewareChain, handler_fn};
	use hyper::header::SET_COOKIE;
	use hyper::{Method, StatusCode};
	use rstest::{fixture, rstest};

	const TOKEN: &str = "abcdefghijklmnopqrstuvwxyz012345";

	async fn echo_token(request: Request) -> Result<Response> {
		let token = request.extensions.get::<CsrfToken>().unwrap();
		Ok(Response::ok().with_body(token.0))
	}

	#[fixture]
	fn chain() -> MiddlewareChain {
		MiddlewareChain::new(handler_fn(echo_token))
			.with_middleware(Arc::new(CsrfMiddleware::new().add_exempt_path("/hook/")))
	}

	fn post(uri: &str, cookie: Option<&str>, body: &str) -> Request {
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(uri)
			.header("content-type", "application/x-www-form-urlencoded")
			.body(body.to_string());
		if let Some(token) = cookie {
			builder = builder.header("cookie", &format!("csrftoken={}", token));
		}
		builder.build().unwrap()
	}

	fn csrf_cookie(response: &Response) -> Option<String> {
		response
			.headers
			.get_all(SET_COOKIE)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.filter_map(parse_set_cookie)
			.find(|(name, _)| name == CSRF_COOKIE_NAME)
			.and_then(|(_, value)| value)
	}

	#[rstest]
	#[tokio::test]
	async fn test_get_issues_cookie(chain: MiddlewareChain) {
		// Arrange
		let request = Request::builder().uri("/").build().unwrap();

		// Act
		let response = chain.handle(request).await.unwrap();

		// Assert
		let issued = csrf_cookie(&response).unwrap();
		assert!(is_well_formed(&issued));
		assert_eq!(response.text(), issued);
	}

	#[rstest]
	#[tokio::test]
	async fn test_existing_cookie_is_reused(chain: MiddlewareChain) {
		let request = Request::builder()
			.uri("/")
			.header("cookie", &format!("csrftoken={}", TOKEN))
			.build()
			.unwrap();

		let response = chain.handle(request).await.unwrap();

		assert_eq!(response.text(), TOKEN);
		assert!(csrf_cookie(&response).is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_post_with_matching_field(chain: MiddlewareChain) {
		let body = format!("text=hi&csrfmiddlewaretoken={}", TOKEN);
		let response = chain.handle(post("/", Some(TOKEN), &body)).await.unwrap();
		assert_eq!(response.status, StatusCode::OK);
	}

	#[rstest]
	#[tokio::test]
	async fn test_post_with_matching_header(chain: MiddlewareChain) {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/")
			.header("cookie", &format!("csrftoken={}", TOKEN))
			.header("X-CSRFToken", TOKEN)
			.build()
			.unwrap();

		assert!(chain.handle(request).await.is_ok());
	}

	#[rstest]
	#[case(None, "text=hi", REASON_NO_CSRF_COOKIE)]
	#[case(Some(TOKEN), "text=hi", REASON_CSRF_TOKEN_MISSING)]
	#[case(Some(TOKEN), "csrfmiddlewaretoken=zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz", REASON_CSRF_TOKEN_INCORRECT)]
	#[case(Some("short"), "csrfmiddlewaretoken=short", REASON_NO_CSRF_COOKIE)]
	#[tokio::test]
	async fn test_post_rejected(
		chain: MiddlewareChain,
		#[case] cookie: Option<&str>,
		#[case] body: &str,
		#[case] reason: &str,
	) {
		let err = chain.handle(post("/", cookie, body)).await.unwrap_err();

		assert!(matches!(&err, Error::CsrfFailure(r) if r == reason));
		assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
	}

	#[rstest]
	#[tokio::test]
	async fn test_exempt_path(chain: MiddlewareChain) {
		assert!(chain.handle(post("/hook/", None, "")).await.is_ok());
	}
}
