//! Post listings and visibility rules.
//!
//! A post is publicly visible when it is published, its category exists and
//! is published, and its publication date is not in the future. Listings
//! are annotated with `comment_count` and ordered newest first.

use blogicum_core::pagination::{Page, Paginator};
use blogicum_core::Result;
use blogicum_http::MediaStorage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

/// Which posts a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
	/// The main feed: publicly visible posts.
	Public,
	/// Published, already released posts of one category. The caller
	/// checks that the category itself is published.
	Category(i64),
	/// Posts of one author. With `include_hidden` (the author looking at
	/// their own profile) unpublished and scheduled posts are included.
	Author { author_id: i64, include_hidden: bool },
}

/// A post joined with its author, category and location.
#[derive(Debug, Clone, FromRow)]
pub struct PostListItem {
	pub id: i64,
	pub title: String,
	pub text: String,
	pub pub_date: DateTime<Utc>,
	pub is_published: bool,
	pub created_at: DateTime<Utc>,
	pub image: Option<String>,
	pub author_id: i64,
	pub author_username: String,
	pub author_first_name: String,
	pub author_last_name: String,
	pub category_id: Option<i64>,
	pub category_title: Option<String>,
	pub category_slug: Option<String>,
	pub category_is_published: Option<bool>,
	pub location_id: Option<i64>,
	pub location_name: Option<String>,
	pub location_is_published: Option<bool>,
	pub comment_count: i64,
}

impl PostListItem {
	/// Whether anyone, not only the author, may see the post at `now`.
	pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
		self.is_published && self.category_is_published == Some(true) && self.pub_date <= now
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorContext {
	pub id: i64,
	pub username: String,
	pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryContext {
	pub id: i64,
	pub title: String,
	pub slug: String,
	pub is_published: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationContext {
	pub id: i64,
	pub name: String,
	pub is_published: bool,
}

/// A post shaped for templates: relations nested, image as a URL.
#[derive(Debug, Clone, Serialize)]
pub struct PostContext {
	pub id: i64,
	pub title: String,
	pub text: String,
	pub pub_date: DateTime<Utc>,
	pub is_published: bool,
	pub is_visible: bool,
	pub created_at: DateTime<Utc>,
	pub image_url: Option<String>,
	pub comment_count: i64,
	pub author: AuthorContext,
	pub category: Option<CategoryContext>,
	pub location: Option<LocationContext>,
}

impl PostListItem {
	pub fn into_context(self, media: &MediaStorage, now: DateTime<Utc>) -> PostContext {
		let is_visible = self.is_visible(now);
		let full_name = format!("{} {}", self.author_first_name, self.author_last_name)
			.trim()
			.to_string();
		let category = match (self.category_id, self.category_title, self.category_slug) {
			(Some(id), Some(title), Some(slug)) => Some(CategoryContext {
				id,
				title,
				slug,
				is_published: self.category_is_published.unwrap_or(false),
			}),
			_ => None,
		};
		let location = match (self.location_id, self.location_name) {
			(Some(id), Some(name)) => Some(LocationContext {
				id,
				name,
				is_published: self.location_is_published.unwrap_or(false),
			}),
			_ => None,
		};

		PostContext {
			id: self.id,
			title: self.title,
			text: self.text,
			pub_date: self.pub_date,
			is_published: self.is_published,
			is_visible,
			created_at: self.created_at,
			image_url: self.image.as_deref().map(|name| media.url(name)),
			comment_count: self.comment_count,
			author: AuthorContext {
				id: self.author_id,
				username: self.author_username,
				full_name,
			},
			category,
			location,
		}
	}
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentItem {
	pub id: i64,
	pub text: String,
	pub post_id: i64,
	pub author_id: i64,
	pub author_username: String,
	pub created_at: DateTime<Utc>,
}

const POST_SELECT: &str = "SELECT p.id, p.title, p.text, p.pub_date, p.is_published, p.created_at, p.image,
	p.author_id, u.username AS author_username, u.first_name AS author_first_name, u.last_name AS author_last_name,
	p.category_id, c.title AS category_title, c.slug AS category_slug, c.is_published AS category_is_published,
	p.location_id, l.name AS location_name, l.is_published AS location_is_published,
	COUNT(cm.id) AS comment_count
FROM blog_post p
JOIN auth_user u ON u.id = p.author_id
LEFT JOIN blog_category c ON c.id = p.category_id
LEFT JOIN blog_location l ON l.id = p.location_id
LEFT JOIN blog_comment cm ON cm.post_id = p.id";

const POST_COUNT: &str = "SELECT COUNT(*) FROM blog_post p
LEFT JOIN blog_category c ON c.id = p.category_id";

fn push_public_filter(qb: &mut QueryBuilder<'_, Sqlite>, now: DateTime<Utc>) {
	qb.push("p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ");
	qb.push_bind(now);
}

fn push_scope_filter(qb: &mut QueryBuilder<'_, Sqlite>, scope: PostScope, now: DateTime<Utc>) {
	qb.push(" WHERE ");
	match scope {
		PostScope::Public => push_public_filter(qb, now),
		PostScope::Category(category_id) => {
			qb.push("p.category_id = ");
			qb.push_bind(category_id);
			qb.push(" AND p.is_published = 1 AND p.pub_date <= ");
			qb.push_bind(now);
		}
		PostScope::Author {
			author_id,
			include_hidden,
		} => {
			qb.push("p.author_id = ");
			qb.push_bind(author_id);
			if !include_hidden {
				qb.push(" AND ");
				push_public_filter(qb, now);
			}
		}
	}
}

pub async fn count_posts(pool: &SqlitePool, scope: PostScope, now: DateTime<Utc>) -> Result<usize> {
	let mut qb = QueryBuilder::<Sqlite>::new(POST_COUNT);
	push_scope_filter(&mut qb, scope, now);
	let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
	Ok(usize::try_from(count).unwrap_or(0))
}

/// One page of the listing for `scope`. `page` is the raw `?page=` value.
pub async fn paginate_posts(
	pool: &SqlitePool,
	scope: PostScope,
	now: DateTime<Utc>,
	paginator: &Paginator,
	page: Option<&str>,
) -> Result<Page<PostListItem>> {
	let count = count_posts(pool, scope, now).await?;
	let window = paginator.window(count, page);

	let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
	push_scope_filter(&mut qb, scope, now);
	qb.push(" GROUP BY p.id ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
	qb.push_bind(window.limit as i64);
	qb.push(" OFFSET ");
	qb.push_bind(window.offset as i64);

	let rows = qb.build_query_as::<PostListItem>().fetch_all(pool).await?;
	Ok(Page::new(rows, window))
}

/// A single post with its relations, regardless of visibility.
pub async fn get_post_item(pool: &SqlitePool, post_id: i64) -> Result<Option<PostListItem>> {
	let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
	qb.push(" WHERE p.id = ");
	qb.push_bind(post_id);
	qb.push(" GROUP BY p.id");
	Ok(qb.build_query_as::<PostListItem>().fetch_optional(pool).await?)
}

/// Comments of a post, oldest first.
pub async fn post_comments(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentItem>> {
	Ok(sqlx::query_as(
		"SELECT cm.id, cm.text, cm.post_id, cm.author_id, u.username AS author_username, cm.created_at
		 FROM blog_comment cm
		 JOIN auth_user u ON u.id = cm.author_id
		 WHERE cm.post_id = ?
		 ORDER BY cm.created_at, cm.id",
	)
	.bind(post_id)
	.fetch_all(pool)
	.await?)
}
