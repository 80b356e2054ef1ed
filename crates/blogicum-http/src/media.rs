//! Storage and serving of user uploaded files.
//!
//! Files live under a media root and are referenced from the database by a
//! relative name such as `posts_images/3f1c..e2.jpg`.

use async_trait::async_trait;
use hyper::StatusCode;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

use crate::multipart::UploadedFile;
use crate::{Handler, Request, Response};
use blogicum_core::{Error, Result};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
	#[error("File too large: {0} bytes (max: {1} bytes)")]
	FileTooLarge(usize, usize),
	#[error("Invalid file type: {0}")]
	InvalidFileType(String),
	#[error("Path traversal detected in file name")]
	PathTraversal,
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl From<UploadError> for Error {
	fn from(err: UploadError) -> Self {
		match err {
			UploadError::Io(e) => Error::Io(e),
			other => Error::Validation(other.to_string()),
		}
	}
}

/// Rejects stored names that could escape the media root.
///
/// Both the raw and the percent-decoded form are checked so `%2e%2e%2f`
/// cannot slip through.
pub fn validate_relative_name(name: &str) -> std::result::Result<(), UploadError> {
	if name.is_empty() {
		return Err(UploadError::PathTraversal);
	}
	let decoded = percent_decode_str(name).decode_utf8_lossy();
	for candidate in [name, decoded.as_ref()] {
		if candidate.contains('\0') || candidate.contains('\\') {
			return Err(UploadError::PathTraversal);
		}
		let all_normal = Path::new(candidate)
			.components()
			.all(|c| matches!(c, Component::Normal(_)));
		if !all_normal {
			return Err(UploadError::PathTraversal);
		}
	}
	Ok(())
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
	root: PathBuf,
	url_prefix: String,
	max_size: usize,
}

impl MediaStorage {
	/// Storage rooted at `root`, served under `/media/`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			url_prefix: "/media/".to_string(),
			max_size: 10 * 1024 * 1024,
		}
	}

	pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
		let mut prefix = prefix.into();
		if !prefix.ends_with('/') {
			prefix.push('/');
		}
		self.url_prefix = prefix;
		self
	}

	pub fn with_max_size(mut self, max_size: usize) -> Self {
		self.max_size = max_size;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn max_size(&self) -> usize {
		self.max_size
	}

	/// Public URL of a stored file.
	///
	/// ```
	/// use blogicum_http::MediaStorage;
	///
	/// let storage = MediaStorage::new("/srv/media");
	/// assert_eq!(storage.url("posts_images/a.png"), "/media/posts_images/a.png");
	/// ```
	pub fn url(&self, name: &str) -> String {
		format!("{}{}", self.url_prefix, name)
	}

	/// Absolute filesystem path of a stored file.
	pub fn path(&self, name: &str) -> std::result::Result<PathBuf, UploadError> {
		validate_relative_name(name)?;
		Ok(self.root.join(name))
	}

	/// Writes `file` into `upload_to` under a fresh random name that keeps
	/// the original extension. Returns the stored relative name.
	pub async fn save(
		&self,
		upload_to: &str,
		file: &UploadedFile,
	) -> std::result::Result<String, UploadError> {
		if file.size() > self.max_size {
			return Err(UploadError::FileTooLarge(file.size(), self.max_size));
		}
		let upload_to = upload_to.trim_matches('/');
		validate_relative_name(upload_to)?;

		let unique = uuid::Uuid::new_v4().simple().to_string();
		let name = match file.extension() {
			Some(ext) if ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
				format!("{}/{}.{}", upload_to, unique, ext)
			}
			_ => format!("{}/{}", upload_to, unique),
		};

		let path = self.root.join(&name);
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(&path, &file.content).await?;
		tracing::debug!(name = %name, size = file.size(), "stored upload");
		Ok(name)
	}

	/// Removes a stored file. A file that is already gone is not an error.
	pub async fn delete(&self, name: &str) -> std::result::Result<(), UploadError> {
		let path = self.path(name)?;
		match tokio::fs::remove_file(&path).await {
			Ok(()) => {
				tracing::debug!(name = %name, "deleted upload");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn exists(&self, name: &str) -> bool {
		match self.path(name) {
			Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
			Err(_) => false,
		}
	}
}

fn guess_content_type(path: &Path) -> String {
	mime_guess::from_path(path)
		.first_or_octet_stream()
		.to_string()
}

/// Serves files from a [`MediaStorage`]. Expects the route to capture the
/// file name as the `path` parameter.
pub struct MediaHandler {
	storage: MediaStorage,
}

impl MediaHandler {
	pub fn new(storage: MediaStorage) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl Handler for MediaHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		let name = request
			.path_param("path")
			.ok_or_else(|| Error::NotFound("media file".to_string()))?;
		let path = self
			.storage
			.path(name)
			.map_err(|_| Error::NotFound(name.to_string()))?;

		match tokio::fs::read(&path).await {
			Ok(content) => Ok(Response::new(StatusCode::OK)
				.with_content_type(&guess_content_type(&path))
				.with_body(content)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(Error::NotFound(name.to_string()))
			}
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;
	use rstest::{fixture, rstest};
	use tempfile::TempDir;

	#[fixture]
	fn media_dir() -> TempDir {
		tempfile::tempdir().unwrap()
	}

	#[rstest]
	#[case("posts_images/a.png", true)]
	#[case("a.png", true)]
	#[case("../etc/passwd", false)]
	#[case("/etc/passwd", false)]
	#[case("posts_images/%2e%2e/%2e%2e/secret", false)]
	#[case("posts_images\\..\\x", false)]
	#[case("", false)]
	fn test_validate_relative_name(#[case] name: &str, #[case] ok: bool) {
		assert_eq!(validate_relative_name(name).is_ok(), ok);
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_and_delete(media_dir: TempDir) {
		// Arrange
		let storage = MediaStorage::new(media_dir.path());
		let file = UploadedFile::new("photo.JPG", Bytes::from_static(b"jpeg-bytes"));

		// Act
		let name = storage.save("posts_images", &file).await.unwrap();

		// Assert
		assert!(name.starts_with("posts_images/"));
		assert!(name.ends_with(".jpg"));
		assert!(storage.exists(&name).await);
		let stored = std::fs::read(media_dir.path().join(&name)).unwrap();
		assert_eq!(stored, b"jpeg-bytes");

		storage.delete(&name).await.unwrap();
		assert!(!storage.exists(&name).await);
		// Deleting twice is fine
		storage.delete(&name).await.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_rejects_large_files(media_dir: TempDir) {
		let storage = MediaStorage::new(media_dir.path()).with_max_size(4);
		let file = UploadedFile::new("a.png", Bytes::from_static(b"12345"));

		let result = storage.save("posts_images", &file).await;

		assert!(matches!(result, Err(UploadError::FileTooLarge(5, 4))));
	}

	#[rstest]
	#[case("posts_images/a.png", "image/png")]
	#[case("posts_images/B.JPG", "image/jpeg")]
	#[case("posts_images/c.webp", "image/webp")]
	#[case("docs/rules.pdf", "application/pdf")]
	#[case("posts_images/no_extension", "application/octet-stream")]
	fn test_content_type_from_extension(#[case] name: &str, #[case] expected: &str) {
		assert_eq!(guess_content_type(Path::new(name)), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_media_handler_serves_files(media_dir: TempDir) {
		let storage = MediaStorage::new(media_dir.path());
		let name = storage
			.save("posts_images", &UploadedFile::new("a.png", Bytes::from_static(b"png")))
			.await
			.unwrap();
		let handler = MediaHandler::new(storage);

		let mut request = Request::builder().uri(format!("/media/{}", name)).build().unwrap();
		request.set_path_param("path", name.clone());
		let response = handler.handle(request).await.unwrap();

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.headers.get("content-type").unwrap(), "image/png");
		assert_eq!(response.text(), "png");

		let mut missing = Request::builder().uri("/media/none.png").build().unwrap();
		missing.set_path_param("path", "none.png");
		assert!(matches!(
			handler.handle(missing).await,
			Err(Error::NotFound(_))
		));
	}
}
