//! Factories for test rows.
//!
//! Every factory writes straight to the database and returns the stored row.

use blogicum_auth::Argon2Hasher;
use blogicum_core::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::apps::blog::models::{Category, Comment, Location, Post};
use crate::apps::users::models::{NewUser, User};

/// Password given to every user created by [`create_user`].
pub const DEFAULT_PASSWORD: &str = "testpass123";

pub async fn create_user(pool: &SqlitePool, username: &str) -> Result<User> {
	let mut new_user = NewUser::new(username, DEFAULT_PASSWORD);
	new_user.email = format!("{}@example.com", username);
	User::create(pool, Arc::new(Argon2Hasher::new()), &new_user).await
}

pub async fn create_staff_user(pool: &SqlitePool, username: &str) -> Result<User> {
	let mut new_user = NewUser::new(username, DEFAULT_PASSWORD);
	new_user.is_staff = true;
	User::create(pool, Arc::new(Argon2Hasher::new()), &new_user).await
}

/// A category titled after its slug.
pub async fn create_category(pool: &SqlitePool, slug: &str, is_published: bool) -> Result<Category> {
	Category::create(
		pool,
		&format!("Категория {}", slug),
		"Описание категории",
		slug,
		is_published,
	)
	.await
}

pub async fn create_location(pool: &SqlitePool, name: &str, is_published: bool) -> Result<Location> {
	Location::create(pool, name, is_published).await
}

pub async fn create_comment(pool: &SqlitePool, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
	Comment::create(pool, post_id, author_id, text).await
}

/// Builds a post. Without further settings the post is published, dated an
/// hour ago and has no category, so it is visible only to its author.
#[derive(Debug, Clone)]
pub struct PostFactory {
	author_id: i64,
	title: String,
	text: String,
	pub_date: DateTime<Utc>,
	is_published: bool,
	category_id: Option<i64>,
	location_id: Option<i64>,
	image: Option<String>,
}

impl PostFactory {
	pub fn new(author_id: i64) -> Self {
		Self {
			author_id,
			title: "Тестовый пост".to_string(),
			text: "Текст тестового поста".to_string(),
			pub_date: Utc::now() - Duration::hours(1),
			is_published: true,
			category_id: None,
			location_id: None,
			image: None,
		}
	}

	pub fn title(mut self, title: &str) -> Self {
		self.title = title.to_string();
		self
	}

	pub fn text(mut self, text: &str) -> Self {
		self.text = text.to_string();
		self
	}

	pub fn pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
		self.pub_date = pub_date;
		self
	}

	pub fn published(mut self, is_published: bool) -> Self {
		self.is_published = is_published;
		self
	}

	pub fn category(mut self, category_id: i64) -> Self {
		self.category_id = Some(category_id);
		self
	}

	pub fn location(mut self, location_id: i64) -> Self {
		self.location_id = Some(location_id);
		self
	}

	pub fn image(mut self, name: &str) -> Self {
		self.image = Some(name.to_string());
		self
	}

	pub async fn create(self, pool: &SqlitePool) -> Result<Post> {
		Ok(sqlx::query_as(
			"INSERT INTO blog_post (title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image)
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			 RETURNING id, title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image",
		)
		.bind(self.title)
		.bind(self.text)
		.bind(self.pub_date)
		.bind(self.author_id)
		.bind(self.location_id)
		.bind(self.category_id)
		.bind(self.is_published)
		.bind(Utc::now())
		.bind(self.image)
		.fetch_one(pool)
		.await?)
	}
}
