//! Assembles the root handler from settings.

use blogicum_auth::{
	Argon2Hasher, AuthenticationMiddleware, CsrfMiddleware, DatabaseSessionBackend, SessionBackend,
	SessionConfig, SessionMiddleware,
};
use blogicum_core::{Error, Paginator, Result};
use blogicum_http::{Handler, HttpServer, MiddlewareChain};
use sqlx::SqlitePool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::apps::users::models::{DatabaseUserBackend, User};
use crate::config::database::{connect, migrate};
use crate::config::middleware::{ErrorPageMiddleware, RequestLoggingMiddleware, StateMiddleware};
use crate::config::settings::Settings;
use crate::config::state::AppState;
use crate::config::templates::build_engine;
use crate::config::urls::{media_storage, url_patterns};

/// The project's root handler together with the state it was built from.
pub struct Application {
	state: AppState,
	handler: Arc<dyn Handler>,
}

impl Application {
	/// Connects to the configured database, applies migrations and builds
	/// the handler.
	pub async fn from_settings(settings: Settings) -> Result<Self> {
		let pool = connect(&settings.database_url).await?;
		migrate(&pool).await?;
		Self::new(settings, pool)
	}

	/// Builds the handler over an existing pool. Migrations must already be
	/// applied.
	pub fn new(settings: Settings, pool: SqlitePool) -> Result<Self> {
		let router = url_patterns(&settings)?;
		let urls = router.resolver();
		let templates = build_engine(urls.clone())?;

		let session_config = SessionConfig {
			cookie_age: settings.session_cookie_age,
			cookie_secure: settings.session_cookie_secure,
			..SessionConfig::default()
		};
		let csrf_secure = settings.csrf_cookie_secure;

		let state = AppState {
			pool: pool.clone(),
			media: media_storage(&settings),
			paginator: Paginator::new(settings.posts_per_page),
			hasher: Arc::new(Argon2Hasher::new()),
			settings: Arc::new(settings),
			templates: Arc::new(templates),
			urls,
		};

		let sessions: Arc<dyn SessionBackend> = Arc::new(DatabaseSessionBackend::new(pool.clone()));
		let users = Arc::new(DatabaseUserBackend::new(pool));

		let handler = MiddlewareChain::new(Arc::new(router))
			.with_middleware(Arc::new(RequestLoggingMiddleware::new()))
			.with_middleware(Arc::new(StateMiddleware::new(state.clone())))
			.with_middleware(Arc::new(
				SessionMiddleware::new(sessions).with_config(session_config),
			))
			.with_middleware(Arc::new(ErrorPageMiddleware::new()))
			.with_middleware(Arc::new(
				CsrfMiddleware::new().with_cookie_secure(csrf_secure),
			))
			.with_middleware(Arc::new(AuthenticationMiddleware::<User>::new(users)));

		Ok(Self {
			state,
			handler: Arc::new(handler),
		})
	}

	pub fn state(&self) -> &AppState {
		&self.state
	}

	pub fn handler(&self) -> Arc<dyn Handler> {
		self.handler.clone()
	}

	/// Serves HTTP on `addr` until `shutdown` resolves.
	pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
	where
		F: Future<Output = ()> + Send,
	{
		tracing::info!(
			%addr,
			debug = self.state.settings.debug,
			media_root = %self.state.settings.media_root.display(),
			max_request_size = self.state.settings.max_request_size,
			"starting server"
		);
		HttpServer::new(self.handler)
			.with_max_body_size(self.state.settings.max_request_size)
			.listen_with_shutdown(addr, shutdown)
			.await
			.map_err(|e| Error::Internal(format!("server error: {}", e)))
	}
}
