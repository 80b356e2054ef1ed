//! Session middleware.

use async_trait::async_trait;
use blogicum_core::Result;
use blogicum_http::{Cookie, Handler, Middleware, Request, Response};
use std::sync::Arc;

use crate::session::{DEFAULT_SESSION_AGE, Session, SessionBackend};

pub const SESSION_COOKIE_NAME: &str = "sessionid";

#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub cookie_name: String,
	/// Cookie and row lifetime in seconds.
	pub cookie_age: i64,
	pub cookie_secure: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			cookie_name: SESSION_COOKIE_NAME.to_string(),
			cookie_age: DEFAULT_SESSION_AGE,
			cookie_secure: false,
		}
	}
}

/// Loads the [`Session`] named by the session cookie into the request
/// extensions and persists it after the view ran.
///
/// A new row (and cookie) is only written once something is stored in the
/// session; anonymous browsing creates nothing.
pub struct SessionMiddleware {
	backend: Arc<dyn SessionBackend>,
	config: SessionConfig,
}

impl SessionMiddleware {
	pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
		Self {
			backend,
			config: SessionConfig::default(),
		}
	}

	pub fn with_config(mut self, config: SessionConfig) -> Self {
		self.config = config;
		self
	}

	async fn load_session(&self, request: &Request) -> Result<Session> {
		if let Some(key) = request.cookie(&self.config.cookie_name) {
			if let Some(data) = self.backend.load(&key).await? {
				return Ok(Session::from_store(key, data));
			}
		}
		Ok(Session::new())
	}

	fn session_cookie(&self, key: &str) -> Cookie {
		Cookie::new(&self.config.cookie_name, key)
			.with_max_age(self.config.cookie_age)
			.with_http_only(true)
			.with_secure(self.config.cookie_secure)
	}
}

#[async_trait]
impl Middleware for SessionMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let had_cookie = request.cookie(&self.config.cookie_name).is_some();
		let session = self.load_session(&request).await?;
		request.extensions.insert(session.clone());

		let mut response = next.handle(request).await?;

		let changes = session.take_changes();
		if let Some(stale) = changes.stale_key {
			self.backend.delete(&stale).await?;
		}
		match changes.save {
			Some((key, data)) => {
				self.backend
					.save(&key, &data, self.config.cookie_age)
					.await?;
				response.set_cookie(&self.session_cookie(&key));
			}
			None if had_cookie && session.key().is_none() => {
				response.set_cookie(&Cookie::removal(&self.config.cookie_name));
			}
			None => {}
		}

		Ok(response)
	}
}
