//! `multipart/form-data` parsing on top of `multer`.

use bytes::Bytes;
use futures_util::stream::once;
use std::collections::HashMap;
use std::future::ready;

use blogicum_core::{Error, Result};

/// A file submitted through a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
	pub filename: String,
	pub content_type: Option<String>,
	pub content: Bytes,
}

impl UploadedFile {
	pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
		Self {
			filename: filename.into(),
			content_type: None,
			content: content.into(),
		}
	}

	pub fn size(&self) -> usize {
		self.content.len()
	}

	/// Lowercased extension of the submitted file name, if any.
	pub fn extension(&self) -> Option<String> {
		std::path::Path::new(&self.filename)
			.extension()
			.and_then(|e| e.to_str())
			.map(str::to_ascii_lowercase)
	}
}

/// Text fields and files of a submitted form.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
	pub fields: HashMap<String, String>,
	pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
	pub async fn parse(content_type: &str, body: Bytes) -> Result<Self> {
		let boundary = multer::parse_boundary(content_type)
			.map_err(|e| Error::BadRequest(format!("Failed to parse boundary: {}", e)))?;

		let stream = once(ready(Ok::<_, std::io::Error>(body)));
		let mut multipart = multer::Multipart::new(stream, boundary);

		let mut form = MultipartForm::default();
		while let Some(field) = multipart
			.next_field()
			.await
			.map_err(|e| Error::BadRequest(format!("malformed multipart body: {}", e)))?
		{
			let Some(name) = field.name().map(str::to_string) else {
				continue;
			};
			let filename = field.file_name().map(str::to_string);
			let content_type = field.content_type().map(|m| m.to_string());
			let data = field
				.bytes()
				.await
				.map_err(|e| Error::BadRequest(format!("malformed multipart field: {}", e)))?;

			match filename {
				// Browsers send an empty part for an untouched file input
				Some(filename) if filename.is_empty() && data.is_empty() => {}
				Some(filename) => {
					form.files.insert(
						name,
						UploadedFile {
							filename,
							content_type,
							content: data,
						},
					);
				}
				None => {
					form.fields
						.insert(name, String::from_utf8_lossy(&data).into_owned());
				}
			}
		}
		Ok(form)
	}
}

/// Encodes fields and files as a multipart body. Returns the body and the
/// matching `Content-Type` header value.
pub fn encode_multipart(
	fields: &[(&str, &str)],
	files: &[(&str, &UploadedFile)],
) -> (Bytes, String) {
	let boundary = format!("----blogicum{}", uuid::Uuid::new_v4().simple());
	let mut body: Vec<u8> = Vec::new();

	for (name, value) in fields {
		body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
		body.extend_from_slice(
			format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
		);
		body.extend_from_slice(value.as_bytes());
		body.extend_from_slice(b"\r\n");
	}
	for (name, file) in files {
		body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
		body.extend_from_slice(
			format!(
				"Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
				name, file.filename
			)
			.as_bytes(),
		);
		let content_type = file
			.content_type
			.as_deref()
			.unwrap_or("application/octet-stream");
		body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
		body.extend_from_slice(&file.content);
		body.extend_from_slice(b"\r\n");
	}
	body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

	(
		Bytes::from(body),
		format!("multipart/form-data; boundary={}", boundary),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_parse_fields_and_files() {
		// Arrange
		let image = UploadedFile {
			filename: "cat.PNG".to_string(),
			content_type: Some("image/png".to_string()),
			content: Bytes::from_static(b"\x89PNG\r\n\x1a\nrest"),
		};
		let (body, content_type) =
			encode_multipart(&[("title", "Кот"), ("text", "мяу")], &[("image", &image)]);

		// Act
		let form = MultipartForm::parse(&content_type, body).await.unwrap();

		// Assert
		assert_eq!(form.fields.get("title").map(String::as_str), Some("Кот"));
		assert_eq!(form.fields.get("text").map(String::as_str), Some("мяу"));
		let file = form.files.get("image").unwrap();
		assert_eq!(file.filename, "cat.PNG");
		assert_eq!(file.extension().as_deref(), Some("png"));
		assert_eq!(file.content, image.content);
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_file_input_is_ignored() {
		let empty = UploadedFile::new("", Bytes::new());
		let (body, content_type) = encode_multipart(&[("title", "x")], &[("image", &empty)]);

		let form = MultipartForm::parse(&content_type, body).await.unwrap();

		assert!(form.files.is_empty());
		assert_eq!(form.fields.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_boundary_is_bad_request() {
		let result = MultipartForm::parse("multipart/form-data", Bytes::new()).await;
		assert!(matches!(result, Err(Error::BadRequest(_))));
	}
}
