//! Blog tables: locations, categories, posts and comments.

use blogicum_core::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::fmt;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
	pub id: i64,
	pub name: String,
	pub is_published: bool,
	pub created_at: DateTime<Utc>,
}

impl Location {
	pub async fn create(pool: &SqlitePool, name: &str, is_published: bool) -> Result<Location> {
		Ok(sqlx::query_as(
			"INSERT INTO blog_location (name, is_published, created_at) VALUES (?, ?, ?)
			 RETURNING id, name, is_published, created_at",
		)
		.bind(name)
		.bind(is_published)
		.bind(Utc::now())
		.fetch_one(pool)
		.await?)
	}

	/// Published locations as `(id, name)` choices.
	pub async fn published_choices(pool: &SqlitePool) -> Result<Vec<(i64, String)>> {
		Ok(sqlx::query_as(
			"SELECT id, name FROM blog_location WHERE is_published = 1 ORDER BY name, id",
		)
		.fetch_all(pool)
		.await?)
	}
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub slug: String,
	pub is_published: bool,
	pub created_at: DateTime<Utc>,
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

impl Category {
	pub async fn create(
		pool: &SqlitePool,
		title: &str,
		description: &str,
		slug: &str,
		is_published: bool,
	) -> Result<Category> {
		let sql = format!(
			"INSERT INTO blog_category (title, description, slug, is_published, created_at)
			 VALUES (?, ?, ?, ?, ?) RETURNING {}",
			CATEGORY_COLUMNS
		);
		Ok(sqlx::query_as(&sql)
			.bind(title)
			.bind(description)
			.bind(slug)
			.bind(is_published)
			.bind(Utc::now())
			.fetch_one(pool)
			.await?)
	}

	pub async fn get_published_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
		let sql = format!(
			"SELECT {} FROM blog_category WHERE slug = ? AND is_published = 1",
			CATEGORY_COLUMNS
		);
		Ok(sqlx::query_as(&sql).bind(slug).fetch_optional(pool).await?)
	}

	pub async fn published_choices(pool: &SqlitePool) -> Result<Vec<(i64, String)>> {
		Ok(sqlx::query_as(
			"SELECT id, title FROM blog_category WHERE is_published = 1 ORDER BY title, id",
		)
		.fetch_all(pool)
		.await?)
	}
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
	pub id: i64,
	pub title: String,
	pub text: String,
	pub pub_date: DateTime<Utc>,
	pub author_id: i64,
	pub location_id: Option<i64>,
	pub category_id: Option<i64>,
	pub is_published: bool,
	pub created_at: DateTime<Utc>,
	/// Stored name under the media root, e.g. `posts_images/abc.png`.
	pub image: Option<String>,
}

/// Fields of a post that forms can set.
#[derive(Debug, Clone)]
pub struct PostData {
	pub title: String,
	pub text: String,
	pub pub_date: DateTime<Utc>,
	pub location_id: Option<i64>,
	pub category_id: Option<i64>,
	pub image: Option<String>,
}

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image";

impl Post {
	pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
		let sql = format!("SELECT {} FROM blog_post WHERE id = ?", POST_COLUMNS);
		Ok(sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?)
	}

	pub async fn create(pool: &SqlitePool, author_id: i64, data: &PostData) -> Result<Post> {
		let sql = format!(
			"INSERT INTO blog_post (title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image)
			 VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?) RETURNING {}",
			POST_COLUMNS
		);
		let post: Post = sqlx::query_as(&sql)
			.bind(&data.title)
			.bind(&data.text)
			.bind(data.pub_date)
			.bind(author_id)
			.bind(data.location_id)
			.bind(data.category_id)
			.bind(Utc::now())
			.bind(&data.image)
			.fetch_one(pool)
			.await?;
		tracing::info!(post_id = post.id, author_id, "post created");
		Ok(post)
	}

	pub async fn update(&mut self, pool: &SqlitePool, data: &PostData) -> Result<()> {
		sqlx::query(
			"UPDATE blog_post SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?
			 WHERE id = ?",
		)
		.bind(&data.title)
		.bind(&data.text)
		.bind(data.pub_date)
		.bind(data.location_id)
		.bind(data.category_id)
		.bind(&data.image)
		.bind(self.id)
		.execute(pool)
		.await?;

		self.title = data.title.clone();
		self.text = data.text.clone();
		self.pub_date = data.pub_date;
		self.location_id = data.location_id;
		self.category_id = data.category_id;
		self.image = data.image.clone();
		tracing::info!(post_id = self.id, "post updated");
		Ok(())
	}

	/// Deletes the row; comments go with it.
	pub async fn delete(&self, pool: &SqlitePool) -> Result<()> {
		sqlx::query("DELETE FROM blog_post WHERE id = ?")
			.bind(self.id)
			.execute(pool)
			.await?;
		tracing::info!(post_id = self.id, "post deleted");
		Ok(())
	}
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
	pub id: i64,
	pub text: String,
	pub post_id: i64,
	pub author_id: i64,
	pub created_at: DateTime<Utc>,
}

impl fmt::Display for Comment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Комментарий {} к посту {}", self.id, self.post_id)
	}
}

const COMMENT_COLUMNS: &str = "id, text, post_id, author_id, created_at";

impl Comment {
	pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
		let sql = format!("SELECT {} FROM blog_comment WHERE id = ?", COMMENT_COLUMNS);
		Ok(sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?)
	}

	pub async fn create(pool: &SqlitePool, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
		let sql = format!(
			"INSERT INTO blog_comment (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
			COMMENT_COLUMNS
		);
		let comment: Comment = sqlx::query_as(&sql)
			.bind(text)
			.bind(post_id)
			.bind(author_id)
			.bind(Utc::now())
			.fetch_one(pool)
			.await?;
		tracing::info!(comment_id = comment.id, post_id, author_id, "comment added");
		Ok(comment)
	}

	pub async fn update_text(&mut self, pool: &SqlitePool, text: &str) -> Result<()> {
		sqlx::query("UPDATE blog_comment SET text = ? WHERE id = ?")
			.bind(text)
			.bind(self.id)
			.execute(pool)
			.await?;
		self.text = text.to_string();
		Ok(())
	}

	pub async fn delete(&self, pool: &SqlitePool) -> Result<()> {
		sqlx::query("DELETE FROM blog_comment WHERE id = ?")
			.bind(self.id)
			.execute(pool)
			.await?;
		tracing::info!(comment_id = self.id, post_id = self.post_id, "comment deleted");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::database::test_pool;
	use crate::test_utils::factories;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_published_choices_skip_hidden_rows() {
		// Arrange
		let pool = test_pool().await.unwrap();
		Category::create(&pool, "Путешествия", "о поездках", "travel", true).await.unwrap();
		Category::create(&pool, "Черновики", "скрыто", "drafts", false).await.unwrap();
		Location::create(&pool, "Москва", true).await.unwrap();
		Location::create(&pool, "Атлантида", false).await.unwrap();

		// Act
		let categories = Category::published_choices(&pool).await.unwrap();
		let locations = Location::published_choices(&pool).await.unwrap();

		// Assert
		assert_eq!(categories.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>(), vec!["Путешествия"]);
		assert_eq!(locations.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>(), vec!["Москва"]);
		assert!(Category::get_published_by_slug(&pool, "drafts").await.unwrap().is_none());
		assert!(Category::get_published_by_slug(&pool, "travel").await.unwrap().is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_deleting_post_cascades_to_comments() {
		let pool = test_pool().await.unwrap();
		let author = factories::create_user(&pool, "anna").await.unwrap();
		let post = factories::PostFactory::new(author.id).create(&pool).await.unwrap();
		let comment = Comment::create(&pool, post.id, author.id, "Отлично").await.unwrap();

		post.delete(&pool).await.unwrap();

		assert!(Comment::get(&pool, comment.id).await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_deleting_category_keeps_post() {
		let pool = test_pool().await.unwrap();
		let author = factories::create_user(&pool, "anna").await.unwrap();
		let category = factories::create_category(&pool, "travel", true).await.unwrap();
		let post = factories::PostFactory::new(author.id)
			.category(category.id)
			.create(&pool)
			.await
			.unwrap();

		sqlx::query("DELETE FROM blog_category WHERE id = ?")
			.bind(category.id)
			.execute(&pool)
			.await
			.unwrap();

		let reloaded = Post::get(&pool, post.id).await.unwrap().unwrap();
		assert_eq!(reloaded.category_id, None);
	}

	#[rstest]
	fn test_comment_display() {
		let comment = Comment {
			id: 3,
			text: "x".into(),
			post_id: 9,
			author_id: 1,
			created_at: Utc::now(),
		};
		assert_eq!(comment.to_string(), "Комментарий 3 к посту 9");
	}
}
