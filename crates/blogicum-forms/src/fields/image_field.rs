//! Image upload field

use blogicum_http::UploadedFile;
use serde_json::Value;

use crate::field::{FieldError, FieldResult, FormField, Widget};

const INVALID_IMAGE: &str = "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";
const CONTRADICTION: &str = "Пожалуйста, загрузите файл или поставьте флажок \"Очистить\", но не совершайте оба действия одновременно.";
const EMPTY_FILE: &str = "Отправленный файл пуст.";

pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];

pub struct ImageField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub help_text: Option<String>,
	pub max_size: Option<usize>,
	widget: Widget,
}

impl ImageField {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: false,
			help_text: None,
			max_size: None,
			widget: Widget::ClearableFileInput,
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_max_size(mut self, max_size: usize) -> Self {
		self.max_size = Some(max_size);
		self
	}

	/// Checks that the leading bytes agree with the claimed extension.
	fn validate_magic_bytes(extension: &str, bytes: &[u8]) -> bool {
		match extension {
			"jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
			"png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
			"gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
			"webp" => bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP",
			"bmp" => bytes.starts_with(b"BM"),
			_ => false,
		}
	}

	fn validate(&self, upload: &UploadedFile) -> FieldResult<()> {
		if upload.content.is_empty() {
			return Err(FieldError::validation(EMPTY_FILE));
		}
		if let Some(max_size) = self.max_size {
			if upload.size() > max_size {
				return Err(FieldError::validation(format!(
					"Размер файла не должен превышать {} байт.",
					max_size
				)));
			}
		}
		let extension = upload.extension().unwrap_or_default();
		if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
			return Err(FieldError::validation(format!(
				"Расширение файлов “{}” не допускается. Разрешенные расширения: {}.",
				extension,
				IMAGE_EXTENSIONS.join(", ")
			)));
		}
		if !Self::validate_magic_bytes(&extension, &upload.content) {
			return Err(FieldError::invalid(INVALID_IMAGE));
		}
		Ok(())
	}
}

impl FormField for ImageField {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	fn required(&self) -> bool {
		self.required
	}

	fn help_text(&self) -> Option<&str> {
		self.help_text.as_deref()
	}

	fn widget(&self) -> &Widget {
		&self.widget
	}

	fn clean(&self, _value: Option<&Value>) -> FieldResult<Value> {
		Ok(Value::Null)
	}

	fn is_file_field(&self) -> bool {
		true
	}

	fn clean_upload(
		&self,
		upload: Option<&UploadedFile>,
		clear: bool,
		has_initial: bool,
	) -> FieldResult<Value> {
		match upload {
			Some(_) if clear => Err(FieldError::invalid(CONTRADICTION)),
			Some(file) => {
				self.validate(file)?;
				Ok(Value::String(file.filename.clone()))
			}
			None if clear && self.required => Err(FieldError::required(None)),
			None if clear => Ok(Value::Bool(false)),
			None if self.required && !has_initial => Err(FieldError::required(None)),
			None => Ok(Value::Null),
		}
	}
}
