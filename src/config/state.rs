//! Shared application state handed to every view.

use blogicum_auth::PasswordHasher;
use blogicum_core::{Error, Paginator, Result};
use blogicum_http::{MediaStorage, Request, UrlResolver};
use sqlx::SqlitePool;
use std::sync::Arc;
use tera::Tera;

use crate::config::settings::Settings;

/// Everything a view needs besides the request itself.
///
/// Cloning is cheap: the pool and the larger members are reference counted.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub settings: Arc<Settings>,
	pub templates: Arc<Tera>,
	pub media: MediaStorage,
	pub hasher: Arc<dyn PasswordHasher>,
	pub urls: UrlResolver,
	pub paginator: Paginator,
}

impl AppState {
	/// The state stored on the request by [`StateMiddleware`].
	///
	/// [`StateMiddleware`]: crate::config::middleware::StateMiddleware
	pub fn from_request(request: &Request) -> Result<Self> {
		request
			.extensions
			.get::<AppState>()
			.ok_or_else(|| Error::Internal("application state is not installed".to_string()))
	}

	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
		self.urls.reverse(name, params)
	}
}
