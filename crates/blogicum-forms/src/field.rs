//! The [`FormField`] trait, widgets and field errors.

use blogicum_http::UploadedFile;
use serde_json::Value;

pub const REQUIRED_MESSAGE: &str = "Обязательное поле.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
	#[error("{0}")]
	Required(String),
	#[error("{0}")]
	Invalid(String),
	#[error("{0}")]
	Validation(String),
}

impl FieldError {
	pub fn required(custom: Option<&str>) -> Self {
		FieldError::Required(custom.unwrap_or(REQUIRED_MESSAGE).to_string())
	}

	pub fn invalid(message: impl Into<String>) -> Self {
		FieldError::Invalid(message.into())
	}

	pub fn validation(message: impl Into<String>) -> Self {
		FieldError::Validation(message.into())
	}
}

pub type FieldResult<T> = Result<T, FieldError>;

/// How a field is presented in HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
	TextInput,
	TextArea { rows: u32 },
	EmailInput,
	PasswordInput,
	/// `<input type="datetime-local">`
	DateTimeInput,
	Select,
	/// File input with a "clear" checkbox when a file is already stored.
	ClearableFileInput,
}

impl Widget {
	/// Short name templates switch on.
	pub fn kind(&self) -> &'static str {
		match self {
			Widget::TextInput => "text",
			Widget::TextArea { .. } => "textarea",
			Widget::EmailInput => "email",
			Widget::PasswordInput => "password",
			Widget::DateTimeInput => "datetime-local",
			Widget::Select => "select",
			Widget::ClearableFileInput => "file",
		}
	}

	pub fn rows(&self) -> Option<u32> {
		match self {
			Widget::TextArea { rows } => Some(*rows),
			_ => None,
		}
	}
}

/// A single form field: knows its name, how to render and how to clean a
/// submitted value.
pub trait FormField: Send + Sync {
	fn name(&self) -> &str;

	fn label(&self) -> Option<&str>;

	fn required(&self) -> bool;

	fn widget(&self) -> &Widget;

	fn help_text(&self) -> Option<&str> {
		None
	}

	/// `(value, label)` pairs for choice widgets.
	fn choices(&self) -> Vec<(String, String)> {
		Vec::new()
	}

	/// Normalises a submitted value.
	fn clean(&self, value: Option<&Value>) -> FieldResult<Value>;

	fn is_file_field(&self) -> bool {
		false
	}

	/// Cleans an uploaded file. Only called when [`is_file_field`] is true.
	///
	/// The result is `Null` to keep the stored file, `false` to clear it,
	/// or the uploaded file name when a new file replaces it.
	///
	/// [`is_file_field`]: FormField::is_file_field
	fn clean_upload(
		&self,
		_upload: Option<&UploadedFile>,
		_clear: bool,
		_has_initial: bool,
	) -> FieldResult<Value> {
		Ok(Value::Null)
	}
}

/// Reads a submitted value as a string; missing and `null` give `None`.
pub(crate) fn value_as_str(value: Option<&Value>) -> FieldResult<Option<&str>> {
	match value {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) => Ok(Some(s.as_str())),
		Some(_) => Err(FieldError::invalid("Значение должно быть строкой.")),
	}
}
