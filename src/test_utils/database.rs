use blogicum_core::Result;
use sqlx::SqlitePool;

use crate::config::database::{connect, migrate};

/// A fresh in-memory database with the full schema.
pub async fn test_pool() -> Result<SqlitePool> {
	let pool = connect("sqlite::memory:").await?;
	migrate(&pool).await?;
	Ok(pool)
}
