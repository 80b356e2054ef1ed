//! Database connection and migrations.

use blogicum_core::Result;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;

/// Migrations embedded from the `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens a pool for `database_url`, creating the database file if needed.
///
/// In-memory databases get a single long-lived connection, since every
/// new connection would see an empty database.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
	let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

	let mut options = SqliteConnectOptions::from_str(database_url)?
		.create_if_missing(true)
		.foreign_keys(true);
	if !in_memory {
		options = options.journal_mode(SqliteJournalMode::Wal);
	}

	let pool_options = if in_memory {
		SqlitePoolOptions::new()
			.max_connections(1)
			.min_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
	} else {
		SqlitePoolOptions::new().max_connections(8)
	};

	let pool = pool_options.connect_with(options).await?;
	tracing::debug!(database_url, "database connected");
	Ok(pool)
}

/// Applies pending migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
	MIGRATOR.run(pool).await?;
	tracing::info!("database migrations applied");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_migrations_create_tables() {
		// Arrange
		let pool = connect("sqlite::memory:").await.unwrap();

		// Act
		migrate(&pool).await.unwrap();
		migrate(&pool).await.unwrap();

		// Assert
		let tables: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' AND name NOT LIKE 'sqlite%' ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
		assert_eq!(
			names,
			vec!["auth_user", "blog_category", "blog_comment", "blog_location", "blog_post", "sessions"]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_foreign_keys_are_enforced() {
		let pool = connect("sqlite::memory:").await.unwrap();
		migrate(&pool).await.unwrap();

		let result = sqlx::query(
			"INSERT INTO blog_comment (text, post_id, author_id, created_at) VALUES ('x', 42, 42, '2024-01-01T00:00:00+00:00')",
		)
		.execute(&pool)
		.await;

		assert!(result.is_err());
	}
}
