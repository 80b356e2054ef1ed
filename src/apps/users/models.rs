//! User accounts.

use async_trait::async_trait;
use blogicum_auth::{AuthUser, PasswordHasher, UserBackend, hash_password, verify_password};
use blogicum_core::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
	pub id: i64,
	pub username: String,
	#[serde(skip_serializing)]
	pub password: String,
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub is_staff: bool,
	pub is_active: bool,
	pub date_joined: DateTime<Utc>,
}

/// Data for a new account. The password is in plain text and hashed on
/// insert.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
	pub username: String,
	pub password: String,
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub is_staff: bool,
}

impl NewUser {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
			..Self::default()
		}
	}
}

const USER_COLUMNS: &str =
	"id, username, password, first_name, last_name, email, is_staff, is_active, date_joined";

impl User {
	/// First and last name separated by a space, trimmed.
	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name)
			.trim()
			.to_string()
	}

	pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
		let sql = format!("SELECT {} FROM auth_user WHERE id = ?", USER_COLUMNS);
		Ok(sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?)
	}

	pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
		let sql = format!("SELECT {} FROM auth_user WHERE username = ?", USER_COLUMNS);
		Ok(sqlx::query_as(&sql).bind(username).fetch_optional(pool).await?)
	}

	pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
		let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM auth_user WHERE username = ?")
			.bind(username)
			.fetch_optional(pool)
			.await?;
		Ok(found.is_some())
	}

	pub async fn create(
		pool: &SqlitePool,
		hasher: Arc<dyn PasswordHasher>,
		new_user: &NewUser,
	) -> Result<User> {
		let password = hash_password(hasher, new_user.password.clone()).await?;
		let sql = format!(
			"INSERT INTO auth_user (username, password, first_name, last_name, email, is_staff, is_active, date_joined)
			 VALUES (?, ?, ?, ?, ?, ?, 1, ?) RETURNING {}",
			USER_COLUMNS
		);
		let user: User = sqlx::query_as(&sql)
			.bind(&new_user.username)
			.bind(password)
			.bind(&new_user.first_name)
			.bind(&new_user.last_name)
			.bind(&new_user.email)
			.bind(new_user.is_staff)
			.bind(Utc::now())
			.fetch_one(pool)
			.await?;
		tracing::info!(user_id = user.id, username = %user.username, "user created");
		Ok(user)
	}

	pub async fn update_profile(
		&mut self,
		pool: &SqlitePool,
		first_name: &str,
		last_name: &str,
		email: &str,
	) -> Result<()> {
		sqlx::query("UPDATE auth_user SET first_name = ?, last_name = ?, email = ? WHERE id = ?")
			.bind(first_name)
			.bind(last_name)
			.bind(email)
			.bind(self.id)
			.execute(pool)
			.await?;
		self.first_name = first_name.to_string();
		self.last_name = last_name.to_string();
		self.email = email.to_string();
		Ok(())
	}

	pub async fn check_password(&self, hasher: Arc<dyn PasswordHasher>, password: &str) -> bool {
		match verify_password(hasher, password.to_string(), self.password.clone()).await {
			Ok(matches) => matches,
			Err(e) => {
				tracing::warn!(user_id = self.id, error = %e, "stored password hash is unreadable");
				false
			}
		}
	}

	/// Looks up an active user by credentials.
	pub async fn authenticate(
		pool: &SqlitePool,
		hasher: Arc<dyn PasswordHasher>,
		username: &str,
		password: &str,
	) -> Result<Option<User>> {
		let Some(user) = User::get_by_username(pool, username).await? else {
			tracing::info!(username, "login failed: unknown user");
			return Ok(None);
		};
		if !user.is_active || !user.check_password(hasher, password).await {
			tracing::info!(username, "login failed: bad credentials or inactive account");
			return Ok(None);
		}
		Ok(Some(user))
	}
}

impl AuthUser for User {
	fn id(&self) -> i64 {
		self.id
	}

	fn username(&self) -> &str {
		&self.username
	}

	fn is_active(&self) -> bool {
		self.is_active
	}

	fn is_staff(&self) -> bool {
		self.is_staff
	}
}

/// Loads users for the authentication middleware.
#[derive(Clone)]
pub struct DatabaseUserBackend {
	pool: SqlitePool,
}

impl DatabaseUserBackend {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl UserBackend<User> for DatabaseUserBackend {
	async fn get_user(&self, id: i64) -> Result<Option<User>> {
		User::get_by_id(&self.pool, id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::database::test_pool;
	use blogicum_auth::Argon2Hasher;
	use rstest::{fixture, rstest};

	#[fixture]
	fn hasher() -> Arc<dyn PasswordHasher> {
		Arc::new(Argon2Hasher::new())
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_and_authenticate(hasher: Arc<dyn PasswordHasher>) {
		// Arrange
		let pool = test_pool().await.unwrap();
		let mut new_user = NewUser::new("anna", "s3cret-pass");
		new_user.first_name = "Анна".into();

		// Act
		let user = User::create(&pool, hasher.clone(), &new_user).await.unwrap();

		// Assert
		assert_ne!(user.password, "s3cret-pass");
		assert_eq!(user.full_name(), "Анна");
		assert!(User::username_exists(&pool, "anna").await.unwrap());
		assert!(User::authenticate(&pool, hasher.clone(), "anna", "s3cret-pass").await.unwrap().is_some());
		assert!(User::authenticate(&pool, hasher.clone(), "anna", "wrong").await.unwrap().is_none());
		assert!(User::authenticate(&pool, hasher.clone(), "boris", "s3cret-pass").await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_inactive_user_cannot_authenticate(hasher: Arc<dyn PasswordHasher>) {
		let pool = test_pool().await.unwrap();
		let user = User::create(&pool, hasher.clone(), &NewUser::new("anna", "pw12345678")).await.unwrap();
		sqlx::query("UPDATE auth_user SET is_active = 0 WHERE id = ?")
			.bind(user.id)
			.execute(&pool)
			.await
			.unwrap();

		let result = User::authenticate(&pool, hasher.clone(), "anna", "pw12345678").await.unwrap();

		assert!(result.is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_profile(hasher: Arc<dyn PasswordHasher>) {
		let pool = test_pool().await.unwrap();
		let mut user = User::create(&pool, hasher.clone(), &NewUser::new("anna", "pw12345678")).await.unwrap();

		user.update_profile(&pool, "Анна", "Каренина", "anna@example.com").await.unwrap();

		let reloaded = User::get_by_id(&pool, user.id).await.unwrap().unwrap();
		assert_eq!(reloaded.full_name(), "Анна Каренина");
		assert_eq!(reloaded.email, "anna@example.com");
	}
}
