//! Database-backed sessions.
//!
//! Session rows live in the `sessions` table:
//!
//! ```sql
//! CREATE TABLE sessions (
//!     session_key  TEXT PRIMARY KEY,
//!     session_data TEXT NOT NULL,
//!     expire_date  INTEGER NOT NULL
//! );
//! ```
//!
//! `expire_date` is a Unix timestamp in milliseconds. Rows past their
//! expiry are treated as missing and removed when read.

use async_trait::async_trait;
use blogicum_core::messages::{self, Message};
use blogicum_core::Result;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::hasher::get_random_string;

pub type SessionData = HashMap<String, Value>;

/// Two weeks, in seconds.
pub const DEFAULT_SESSION_AGE: i64 = 60 * 60 * 24 * 14;

pub const SESSION_KEY_LENGTH: usize = 32;

#[async_trait]
pub trait SessionBackend: Send + Sync {
	/// Loads live session data; expired and unknown keys give `None`.
	async fn load(&self, session_key: &str) -> Result<Option<SessionData>>;

	async fn save(&self, session_key: &str, data: &SessionData, max_age_seconds: i64) -> Result<()>;

	async fn delete(&self, session_key: &str) -> Result<()>;

	async fn exists(&self, session_key: &str) -> Result<bool>;

	/// Removes every expired session, returning how many were removed.
	async fn clear_expired(&self) -> Result<u64>;
}

#[derive(Clone)]
pub struct DatabaseSessionBackend {
	pool: SqlitePool,
}

impl DatabaseSessionBackend {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Creates the sessions table when it is missing. Projects normally get
	/// it from their migrations instead.
	pub async fn create_table(&self) -> Result<()> {
		sqlx::query(
			"CREATE TABLE IF NOT EXISTS sessions (
				session_key TEXT PRIMARY KEY NOT NULL,
				session_data TEXT NOT NULL,
				expire_date INTEGER NOT NULL
			)",
		)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl SessionBackend for DatabaseSessionBackend {
	async fn load(&self, session_key: &str) -> Result<Option<SessionData>> {
		let row: Option<(String, i64)> = sqlx::query_as(
			"SELECT session_data, expire_date FROM sessions WHERE session_key = ?",
		)
		.bind(session_key)
		.fetch_optional(&self.pool)
		.await?;

		let Some((raw, expire_date)) = row else {
			return Ok(None);
		};

		if expire_date <= Utc::now().timestamp_millis() {
			tracing::debug!(session_key, "discarding expired session");
			self.delete(session_key).await?;
			return Ok(None);
		}

		match serde_json::from_str(&raw) {
			Ok(data) => Ok(Some(data)),
			Err(e) => {
				tracing::warn!(error = %e, "session data is corrupted, starting a new session");
				Ok(None)
			}
		}
	}

	async fn save(&self, session_key: &str, data: &SessionData, max_age_seconds: i64) -> Result<()> {
		let expire_date = (Utc::now() + Duration::seconds(max_age_seconds)).timestamp_millis();
		let session_data = serde_json::to_string(data)?;

		sqlx::query(
			"INSERT INTO sessions (session_key, session_data, expire_date) VALUES (?, ?, ?)
			 ON CONFLICT(session_key) DO UPDATE SET
				session_data = excluded.session_data,
				expire_date = excluded.expire_date",
		)
		.bind(session_key)
		.bind(session_data)
		.bind(expire_date)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	async fn delete(&self, session_key: &str) -> Result<()> {
		sqlx::query("DELETE FROM sessions WHERE session_key = ?")
			.bind(session_key)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn exists(&self, session_key: &str) -> Result<bool> {
		let found: Option<(i64,)> = sqlx::query_as(
			"SELECT 1 FROM sessions WHERE session_key = ? AND expire_date > ?",
		)
		.bind(session_key)
		.bind(Utc::now().timestamp_millis())
		.fetch_optional(&self.pool)
		.await?;
		Ok(found.is_some())
	}

	async fn clear_expired(&self) -> Result<u64> {
		let result = sqlx::query("DELETE FROM sessions WHERE expire_date <= ?")
			.bind(Utc::now().timestamp_millis())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected())
	}
}

#[derive(Debug, Default)]
struct SessionState {
	key: Option<String>,
	data: SessionData,
	modified: bool,
	/// Key to delete from the store when the response is written.
	stale_key: Option<String>,
}

/// The session of the current request.
///
/// Cloning gives another handle to the same state, so the copy a view pulls
/// out of the request extensions is the one the session middleware saves.
#[derive(Debug, Clone, Default)]
pub struct Session {
	state: Arc<Mutex<SessionState>>,
}

impl Session {
	pub fn new() -> Self {
		Self::default()
	}

	/// A session read from the store under `key`.
	pub fn from_store(key: String, data: SessionData) -> Self {
		Self {
			state: Arc::new(Mutex::new(SessionState {
				key: Some(key),
				data,
				..SessionState::default()
			})),
		}
	}

	pub fn key(&self) -> Option<String> {
		self.state.lock().key.clone()
	}

	pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
		self.state
			.lock()
			.data
			.get(name)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	pub fn insert<T: Serialize>(&self, name: &str, value: T) -> Result<()> {
		let value = serde_json::to_value(value)?;
		let mut state = self.state.lock();
		state.data.insert(name.to_string(), value);
		state.modified = true;
		Ok(())
	}

	pub fn remove(&self, name: &str) -> Option<Value> {
		let mut state = self.state.lock();
		let removed = state.data.remove(name);
		if removed.is_some() {
			state.modified = true;
		}
		removed
	}

	pub fn contains(&self, name: &str) -> bool {
		self.state.lock().data.contains_key(name)
	}

	pub fn is_empty(&self) -> bool {
		self.state.lock().data.is_empty()
	}

	pub fn is_modified(&self) -> bool {
		self.state.lock().modified
	}

	/// Keeps the data but moves it to a fresh key, dropping the old row.
	pub fn cycle_key(&self) {
		let mut state = self.state.lock();
		if let Some(old) = state.key.take() {
			state.stale_key = Some(old);
		}
		state.key = Some(get_random_string(SESSION_KEY_LENGTH));
		state.modified = true;
	}

	/// Drops all data and the key.
	pub fn flush(&self) {
		let mut state = self.state.lock();
		state.data.clear();
		if let Some(old) = state.key.take() {
			state.stale_key = Some(old);
		}
		state.modified = true;
	}

	/// Queues a message for the next rendered page.
	pub fn add_message(&self, message: Message) -> Result<()> {
		let mut queue = self.messages();
		queue.push(message);
		self.insert(messages::SESSION_KEY, messages::encode_queue(&queue)?)
	}

	/// Pending messages, left in place.
	pub fn messages(&self) -> Vec<Message> {
		messages::decode_queue(self.state.lock().data.get(messages::SESSION_KEY))
	}

	/// Pending messages, removed from the session.
	pub fn take_messages(&self) -> Vec<Message> {
		let removed = self.remove(messages::SESSION_KEY);
		messages::decode_queue(removed.as_ref())
	}

	/// Hands the middleware what it must persist: the key to save under
	/// (generating one if needed), the data, and a key to delete.
	pub(crate) fn take_changes(&self) -> SessionChanges {
		let mut state = self.state.lock();
		let stale_key = state.stale_key.take();
		if !state.modified {
			return SessionChanges {
				save: None,
				stale_key,
			};
		}
		state.modified = false;
		if state.data.is_empty() {
			if let Some(key) = state.key.take() {
				return SessionChanges {
					save: None,
					stale_key: Some(key),
				};
			}
			return SessionChanges {
				save: None,
				stale_key,
			};
		}
		let key = state
			.key
			.get_or_insert_with(|| get_random_string(SESSION_KEY_LENGTH))
			.clone();
		SessionChanges {
			save: Some((key, state.data.clone())),
			stale_key,
		}
	}
}

#[derive(Debug)]
pub(crate) struct SessionChanges {
	pub save: Option<(String, SessionData)>,
	pub stale_key: Option<String>,
}
