//! Handler and middleware traits.
//!
//! ```rust
//! use blogicum_http::{Handler, Middleware, Request, Response};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct LoggingMiddleware;
//!
//! #[async_trait]
//! impl Middleware for LoggingMiddleware {
//!     async fn process(&self, request: Request, next: Arc<dyn Handler>) -> blogicum_http::Result<Response> {
//!         tracing::debug!(method = %request.method, path = request.path(), "request");
//!         next.handle(request).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{Request, Response};
use blogicum_core::Result;

/// Anything that turns a request into a response.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Wraps the next handler to add request or response processing.
#[async_trait]
pub trait Middleware: Send + Sync {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Middleware returning `false` is skipped for this request.
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

/// Composes middleware around a final handler. The first middleware added
/// is the outermost one.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
		self.middlewares.push(middleware);
	}
}

#[async_trait]
impl Handler for MiddlewareChain {
	async fn handle(&self, request: Request) -> Result<Response> {
		let mut current: Arc<dyn Handler> = self.handler.clone();

		for middleware in self
			.middlewares
			.iter()
			.rev()
			.filter(|mw| mw.should_continue(&request))
		{
			current = Arc::new(ComposedHandler {
				middleware: middleware.clone(),
				next: current,
			});
		}

		current.handle(request).await
	}
}

struct ComposedHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ComposedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware.process(request, self.next.clone()).await
	}
}

/// Adapter that lets a plain `async fn(Request) -> Result<Response>` act as
/// a [`Handler`].
pub struct FnHandler<F, Fut> {
	func: F,
	_marker: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F, Fut>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

/// Wraps an async function into a shareable handler.
///
/// ```
/// use blogicum_http::{handler_fn, Request, Response};
///
/// async fn about(_request: Request) -> blogicum_http::Result<Response> {
///     Ok(Response::ok().with_body("about"))
/// }
///
/// let handler = handler_fn(about);
/// ```
pub fn handler_fn<F, Fut>(func: F) -> Arc<dyn Handler>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	Arc::new(FnHandler {
		func,
		_marker: PhantomData,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct MockHandler {
		response_body: String,
	}

	#[async_trait]
	impl Handler for MockHandler {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(self.response_body.clone()))
		}
	}

	struct PrefixMiddleware {
		prefix: &'static str,
	}

	#[async_trait]
	impl Middleware for PrefixMiddleware {
		async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
			let response = next.handle(request).await?;
			let body = format!("{}{}", self.prefix, response.text());
			Ok(response.with_body(body))
		}
	}

	struct SkipForPost;

	#[async_trait]
	impl Middleware for SkipForPost {
		async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
			let response = next.handle(request).await?;
			Ok(response.with_header("x-skipped", "no"))
		}

		fn should_continue(&self, request: &Request) -> bool {
			!request.is_post()
		}
	}

	fn handler() -> Arc<dyn Handler> {
		Arc::new(MockHandler {
			response_body: "body".to_string(),
		})
	}

	#[rstest]
	#[tokio::test]
	async fn test_middleware_order() {
		// Arrange
		let chain = MiddlewareChain::new(handler())
			.with_middleware(Arc::new(PrefixMiddleware { prefix: "outer-" }))
			.with_middleware(Arc::new(PrefixMiddleware { prefix: "inner-" }));
		let request = Request::builder().build().unwrap();

		// Act
		let response = chain.handle(request).await.unwrap();

		// Assert
		assert_eq!(response.text(), "outer-inner-body");
	}

	#[rstest]
	#[tokio::test]
	async fn test_conditional_skip() {
		let chain = MiddlewareChain::new(handler()).with_middleware(Arc::new(SkipForPost));

		let get = Request::builder().build().unwrap();
		let post = Request::builder()
			.method(hyper::Method::POST)
			.build()
			.unwrap();

		let get_response = chain.handle(get).await.unwrap();
		let post_response = chain.handle(post).await.unwrap();

		assert!(get_response.headers.contains_key("x-skipped"));
		assert!(!post_response.headers.contains_key("x-skipped"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_handler_fn() {
		async fn hello(request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(format!("hello {}", request.path())))
		}

		let handler = handler_fn(hello);
		let request = Request::builder().uri("/x/").build().unwrap();

		let response = handler.handle(request).await.unwrap();

		assert_eq!(response.text(), "hello /x/");
	}
}
