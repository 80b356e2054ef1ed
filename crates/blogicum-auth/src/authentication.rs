//! Session-based authentication.

use async_trait::async_trait;
use blogicum_core::Result;
use blogicum_http::{Handler, Middleware, Request, Response};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::session::Session;

/// Session entry holding the primary key of the logged-in user.
pub const SESSION_KEY: &str = "_auth_user_id";

/// What the auth layer needs to know about a user model.
pub trait AuthUser: Clone + Send + Sync + 'static {
	fn id(&self) -> i64;

	fn username(&self) -> &str;

	fn is_active(&self) -> bool;

	fn is_staff(&self) -> bool {
		false
	}
}

/// Loads users by primary key for the authentication middleware.
#[async_trait]
pub trait UserBackend<U: AuthUser>: Send + Sync {
	async fn get_user(&self, id: i64) -> Result<Option<U>>;
}

/// The user making the request, or anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser<U> {
	user: Option<U>,
}

impl<U: AuthUser> CurrentUser<U> {
	pub fn anonymous() -> Self {
		Self { user: None }
	}

	pub fn authenticated(user: U) -> Self {
		Self { user: Some(user) }
	}

	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}

	pub fn user(&self) -> Option<&U> {
		self.user.as_ref()
	}

	pub fn into_user(self) -> Option<U> {
		self.user
	}

	pub fn id(&self) -> Option<i64> {
		self.user.as_ref().map(AuthUser::id)
	}

	pub fn is_staff(&self) -> bool {
		self.user.as_ref().map(AuthUser::is_staff).unwrap_or(false)
	}

	/// Reads the current user that the middleware stored on the request.
	pub fn from_request(request: &Request) -> Self {
		request
			.extensions
			.get::<CurrentUser<U>>()
			.unwrap_or_else(Self::anonymous)
	}
}

/// Resolves `_auth_user_id` from the session into a [`CurrentUser`].
///
/// Must run inside [`SessionMiddleware`](crate::SessionMiddleware).
/// Inactive and deleted users are treated as anonymous.
pub struct AuthenticationMiddleware<U: AuthUser> {
	backend: Arc<dyn UserBackend<U>>,
	_user: PhantomData<fn() -> U>,
}

impl<U: AuthUser> AuthenticationMiddleware<U> {
	pub fn new(backend: Arc<dyn UserBackend<U>>) -> Self {
		Self {
			backend,
			_user: PhantomData,
		}
	}

	async fn resolve(&self, request: &Request) -> Result<CurrentUser<U>> {
		let Some(session) = request.extensions.get::<Session>() else {
			return Ok(CurrentUser::anonymous());
		};
		let Some(user_id) = session.get::<i64>(SESSION_KEY) else {
			return Ok(CurrentUser::anonymous());
		};
		match self.backend.get_user(user_id).await? {
			Some(user) if user.is_active() => Ok(CurrentUser::authenticated(user)),
			_ => {
				tracing::debug!(user_id, "session refers to a missing or inactive user");
				Ok(CurrentUser::anonymous())
			}
		}
	}
}

#[async_trait]
impl<U: AuthUser> Middleware for AuthenticationMiddleware<U> {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let current = self.resolve(&request).await?;
		request.extensions.insert(current);
		next.handle(request).await
	}
}

/// Records `user` as logged in. The session key is rotated to prevent
/// fixation; a session that belonged to someone else is emptied first.
pub fn login<U: AuthUser>(session: &Session, user: &U) -> Result<()> {
	match session.get::<i64>(SESSION_KEY) {
		Some(existing) if existing != user.id() => session.flush(),
		_ => {}
	}
	session.cycle_key();
	session.insert(SESSION_KEY, user.id())?;
	tracing::info!(user_id = user.id(), username = user.username(), "user logged in");
	Ok(())
}

pub fn logout(session: &Session) {
	if let Some(user_id) = session.get::<i64>(SESSION_KEY) {
		tracing::info!(user_id, "user logged out");
	}
	session.flush();
}

#[cfg(test)]
mod tests {
	use super::*;
	use blogicum_http::{MiddlewareChain, handler_fn};
	use rstest::{fixture, rstest};
	use std::collections::HashMap;

	#[derive(Debug, Clone)]
	struct TestUser {
		id: i64,
		username: String,
		active: bool,
	}

	impl AuthUser for TestUser {
		fn id(&self) -> i64 {
			self.id
		}

		fn username(&self) -> &str {
			&self.username
		}

		fn is_active(&self) -> bool {
			self.active
		}
	}

	struct Users(HashMap<i64, TestUser>);

	#[async_trait]
	impl UserBackend<TestUser> for Users {
		async fn get_user(&self, id: i64) -> Result<Option<TestUser>> {
			Ok(self.0.get(&id).cloned())
		}
	}

	#[fixture]
	fn users() -> Arc<Users> {
		let user = |id, name: &str, active| TestUser {
			id,
			username: name.to_string(),
			active,
		};
		Arc::new(Users(HashMap::from([
			(1, user(1, "anna", true)),
			(2, user(2, "boris", false)),
		])))
	}

	async fn whoami(request: Request) -> Result<Response> {
		let current = CurrentUser::<TestUser>::from_request(&request);
		let name = current
			.user()
			.map(|u| u.username.clone())
			.unwrap_or_else(|| "anonymous".to_string());
		Ok(Response::ok().with_body(name))
	}

	async fn run(users: Arc<Users>, session: Option<Session>) -> String {
		let chain = MiddlewareChain::new(handler_fn(whoami))
			.with_middleware(Arc::new(AuthenticationMiddleware::new(users)));
		let request = Request::builder().uri("/").build().unwrap();
		if let Some(session) = session {
			request.extensions.insert(session);
		}
		chain.handle(request).await.unwrap().text()
	}

	fn session_for(id: i64) -> Session {
		let session = Session::new();
		session.insert(SESSION_KEY, id).unwrap();
		session
	}

	#[rstest]
	#[case(None, "anonymous")]
	#[case(Some(1), "anna")]
	#[case(Some(2), "anonymous")]
	#[case(Some(99), "anonymous")]
	#[tokio::test]
	async fn test_current_user_resolution(
		users: Arc<Users>,
		#[case] user_id: Option<i64>,
		#[case] expected: &str,
	) {
		let session = user_id.map(session_for).unwrap_or_default();
		assert_eq!(run(users, Some(session)).await, expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_session_is_anonymous(users: Arc<Users>) {
		assert_eq!(run(users, None).await, "anonymous");
	}

	#[rstest]
	fn test_login_rotates_key_and_logout_flushes() {
		// Arrange
		let session = Session::from_store("before".into(), Default::default());
		let user = TestUser {
			id: 1,
			username: "anna".into(),
			active: true,
		};

		// Act
		login(&session, &user).unwrap();
		let key_after_login = session.key();

		// Assert
		assert_ne!(key_after_login.as_deref(), Some("before"));
		assert_eq!(session.get::<i64>(SESSION_KEY), Some(1));

		logout(&session);
		assert!(session.get::<i64>(SESSION_KEY).is_none());
		assert!(session.key().is_none());
	}

	#[rstest]
	fn test_login_as_other_user_drops_previous_data() {
		let session = session_for(2);
		session.insert("cart", "stale").unwrap();
		let user = TestUser {
			id: 1,
			username: "anna".into(),
			active: true,
		};

		login(&session, &user).unwrap();

		assert!(!session.contains("cart"));
		assert_eq!(session.get::<i64>(SESSION_KEY), Some(1));
	}
}
