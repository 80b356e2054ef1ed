//! Shared fixtures for the end-to-end view tests.

#![allow(dead_code)]

use blogicum::Settings;
use blogicum::apps::blog::models::Category;
use blogicum::apps::users::models::User;
use blogicum::test_utils::TestClient;
use blogicum::test_utils::database::test_pool;
use blogicum::test_utils::factories::{create_category, create_user};
use blogicum_http::UploadedFile;
use rstest::fixture;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// A freshly migrated project with its media root in a temporary
/// directory.
pub struct TestApp {
	pub pool: SqlitePool,
	pub settings: Settings,
	pub media: TempDir,
}

impl TestApp {
	/// A new anonymous browser.
	pub fn client(&self) -> TestClient {
		TestClient::from_pool(self.settings.clone(), self.pool.clone()).unwrap()
	}

	/// A new browser logged in as `user`.
	pub async fn client_for(&self, user: &User) -> TestClient {
		let client = self.client();
		client.force_login(user.id).await.unwrap();
		client
	}

	pub fn media_file_exists(&self, name: &str) -> bool {
		self.media.path().join(name).exists()
	}
}

#[fixture]
pub async fn app() -> TestApp {
	let media = tempfile::tempdir().unwrap();
	let settings = Settings {
		media_root: media.path().to_path_buf(),
		serve_media: true,
		posts_per_page: 10,
		..Settings::default()
	};
	TestApp {
		pool: test_pool().await.unwrap(),
		settings,
		media,
	}
}

/// An author with a published category to post in.
pub struct Author {
	pub user: User,
	pub category: Category,
}

pub async fn author(app: &TestApp, username: &str) -> Author {
	Author {
		user: create_user(&app.pool, username).await.unwrap(),
		category: create_category(&app.pool, &format!("{}-travel", username), true)
			.await
			.unwrap(),
	}
}

pub fn png(name: &str) -> UploadedFile {
	UploadedFile::new(name, PNG)
}
