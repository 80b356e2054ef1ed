//! In-process client for view tests.
//!
//! Requests go straight to the project's root handler, middleware included,
//! so sessions, CSRF checks and error pages behave as they do behind the
//! server. Cookies set by responses are kept between requests.

use blogicum_auth::authentication::SESSION_KEY;
use blogicum_auth::csrf::{CSRF_COOKIE_NAME, CSRF_FIELD_NAME, CSRF_TOKEN_LENGTH};
use blogicum_auth::hasher::get_random_string;
use blogicum_auth::middleware::SESSION_COOKIE_NAME;
use blogicum_auth::session::{DEFAULT_SESSION_AGE, SESSION_KEY_LENGTH, SessionData};
use blogicum_auth::{DatabaseSessionBackend, SessionBackend};
use blogicum_core::{Error, Result};
use blogicum_http::cookie::parse_set_cookie;
use blogicum_http::multipart::encode_multipart;
use blogicum_http::request::RequestBuilder;
use blogicum_http::{Handler, Request, Response, UploadedFile};
use hyper::Method;
use hyper::header::SET_COOKIE;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::application::Application;
use crate::config::settings::Settings;

/// Drives the root handler like a browser would.
///
/// ```rust,ignore
/// # async fn demo() -> blogicum_core::Result<()> {
/// use blogicum::Settings;
/// use blogicum::test_utils::{TestClient, database::test_pool};
///
/// let client = TestClient::from_pool(Settings::default(), test_pool().await?)?;
/// let response = client.get("/").await?;
/// assert!(response.status.is_success());
/// # Ok(())
/// # }
/// ```
pub struct TestClient {
	handler: Arc<dyn Handler>,
	pool: SqlitePool,
	cookies: Arc<RwLock<HashMap<String, String>>>,
	csrf_token: String,
}

impl TestClient {
	pub fn new(app: &Application) -> Self {
		let csrf_token = get_random_string(CSRF_TOKEN_LENGTH);
		let cookies = HashMap::from([(CSRF_COOKIE_NAME.to_string(), csrf_token.clone())]);
		Self {
			handler: app.handler(),
			pool: app.state().pool.clone(),
			cookies: Arc::new(RwLock::new(cookies)),
			csrf_token,
		}
	}

	/// Builds the application over `pool`, which must be migrated.
	pub fn from_pool(settings: Settings, pool: SqlitePool) -> Result<Self> {
		Ok(Self::new(&Application::new(settings, pool)?))
	}

	/// Token sent with every unsafe request.
	pub fn csrf_token(&self) -> &str {
		&self.csrf_token
	}

	pub async fn cookie(&self, name: &str) -> Option<String> {
		self.cookies.read().await.get(name).cloned()
	}

	/// Logs `user_id` in by writing a session row directly.
	pub async fn force_login(&self, user_id: i64) -> Result<()> {
		let key = get_random_string(SESSION_KEY_LENGTH);
		let data: SessionData = HashMap::from([(SESSION_KEY.to_string(), Value::from(user_id))]);
		DatabaseSessionBackend::new(self.pool.clone())
			.save(&key, &data, DEFAULT_SESSION_AGE)
			.await?;
		self.cookies
			.write()
			.await
			.insert(SESSION_COOKIE_NAME.to_string(), key);
		Ok(())
	}

	/// Drops the session cookie.
	pub async fn logout(&self) {
		self.cookies.write().await.remove(SESSION_COOKIE_NAME);
	}

	pub async fn get(&self, path: &str) -> Result<Response> {
		self.send(Request::builder().method(Method::GET).uri(path))
			.await
	}

	/// POSTs an urlencoded form. The CSRF field is added.
	pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<Response> {
		let mut pairs: Vec<(&str, &str)> = fields.to_vec();
		pairs.push((CSRF_FIELD_NAME, &self.csrf_token));
		self.post_urlencoded(path, &pairs).await
	}

	/// POSTs an urlencoded form exactly as given, without a CSRF field.
	pub async fn post_form_without_csrf(
		&self,
		path: &str,
		fields: &[(&str, &str)],
	) -> Result<Response> {
		self.post_urlencoded(path, fields).await
	}

	/// POSTs a `multipart/form-data` body. The CSRF field is added.
	pub async fn post_multipart(
		&self,
		path: &str,
		fields: &[(&str, &str)],
		files: &[(&str, &UploadedFile)],
	) -> Result<Response> {
		let mut pairs: Vec<(&str, &str)> = fields.to_vec();
		pairs.push((CSRF_FIELD_NAME, &self.csrf_token));
		let (body, content_type) = encode_multipart(&pairs, files);
		self.send(
			Request::builder()
				.method(Method::POST)
				.uri(path)
				.header("content-type", &content_type)
				.body(body),
		)
		.await
	}

	async fn post_urlencoded(&self, path: &str, fields: &[(&str, &str)]) -> Result<Response> {
		let body = serde_urlencoded::to_string(fields)
			.map_err(|e| Error::BadRequest(format!("cannot encode form: {}", e)))?;
		self.send(
			Request::builder()
				.method(Method::POST)
				.uri(path)
				.header("content-type", "application/x-www-form-urlencoded")
				.body(body),
		)
		.await
	}

	async fn send(&self, builder: RequestBuilder) -> Result<Response> {
		let cookie_header = {
			let cookies = self.cookies.read().await;
			cookies
				.iter()
				.map(|(name, value)| format!("{}={}", name, value))
				.collect::<Vec<_>>()
				.join("; ")
		};
		let builder = if cookie_header.is_empty() {
			builder
		} else {
			builder.header("cookie", &cookie_header)
		};

		let response = self.handler.handle(builder.build()?).await?;
		self.store_cookies(&response).await;
		Ok(response)
	}

	async fn store_cookies(&self, response: &Response) {
		let mut cookies = self.cookies.write().await;
		for value in response.headers.get_all(SET_COOKIE) {
			let Some((name, value)) = value.to_str().ok().and_then(parse_set_cookie) else {
				continue;
			};
			match value {
				Some(value) => {
					cookies.insert(name, value);
				}
				None => {
					cookies.remove(&name);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::database::test_pool;
	use crate::test_utils::factories::create_user;
	use hyper::StatusCode;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_missing_csrf_field_is_rejected() {
		// Arrange
		let pool = test_pool().await.unwrap();
		let client = TestClient::from_pool(Settings::default(), pool).unwrap();

		// Act
		let response = client
			.post_form_without_csrf("/auth/login/", &[("username", "x"), ("password", "y")])
			.await
			.unwrap();

		// Assert
		assert_eq!(response.status, StatusCode::FORBIDDEN);
		assert!(response.text().contains("Ошибка проверки CSRF"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_force_login_keeps_session_cookie() {
		let pool = test_pool().await.unwrap();
		let user = create_user(&pool, "anna").await.unwrap();
		let client = TestClient::from_pool(Settings::default(), pool).unwrap();

		client.force_login(user.id).await.unwrap();
		let response = client.get("/profile/edit/").await.unwrap();

		assert_eq!(response.status, StatusCode::OK);
		assert!(client.cookie(SESSION_COOKIE_NAME).await.is_some());
	}
}
