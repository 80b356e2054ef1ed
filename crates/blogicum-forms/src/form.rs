use blogicum_http::UploadedFile;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::field::{FieldError, FormField, Widget};
use crate::fields::CLEANED_FORMAT;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
	#[error("Field error in {field}: {error}")]
	Field { field: String, error: FieldError },
	#[error("{0}")]
	Validation(String),
}

pub type FormResult<T> = Result<T, FormError>;

type CleanFunction = Box<dyn Fn(&HashMap<String, Value>) -> FormResult<()> + Send + Sync>;

/// Key for form-level (non-field-specific) errors.
pub const ALL_FIELDS_KEY: &str = "_all";

/// Suffix of the checkbox that clears a stored file.
pub const CLEAR_SUFFIX: &str = "-clear";

/// A set of fields bound to submitted data.
///
/// ```
/// use blogicum_forms::{Form, fields::CharField};
/// use std::collections::HashMap;
///
/// let mut form = Form::new();
/// form.add_field(Box::new(CharField::new("text").required()));
///
/// form.bind_strings(HashMap::from([("text".to_string(), " hi ".to_string())]));
/// assert!(form.is_valid());
/// assert_eq!(form.cleaned_str("text"), Some("hi"));
/// ```
pub struct Form {
	fields: Vec<Box<dyn FormField>>,
	data: HashMap<String, Value>,
	files: HashMap<String, UploadedFile>,
	initial: HashMap<String, Value>,
	cleaned: HashMap<String, Value>,
	errors: HashMap<String, Vec<String>>,
	is_bound: bool,
	clean_functions: Vec<CleanFunction>,
}

impl Form {
	pub fn new() -> Self {
		Self {
			fields: Vec::new(),
			data: HashMap::new(),
			files: HashMap::new(),
			initial: HashMap::new(),
			cleaned: HashMap::new(),
			errors: HashMap::new(),
			is_bound: false,
			clean_functions: Vec::new(),
		}
	}

	pub fn add_field(&mut self, field: Box<dyn FormField>) {
		self.fields.push(field);
	}

	pub fn with_field(mut self, field: impl FormField + 'static) -> Self {
		self.fields.push(Box::new(field));
		self
	}

	pub fn set_initial(&mut self, initial: HashMap<String, Value>) {
		self.initial = initial;
	}

	pub fn with_initial(mut self, initial: HashMap<String, Value>) -> Self {
		self.initial = initial;
		self
	}

	pub fn bind(&mut self, data: HashMap<String, Value>) {
		self.data = data;
		self.is_bound = true;
	}

	/// Binds decoded form fields, the usual shape of a POST body.
	pub fn bind_strings(&mut self, data: HashMap<String, String>) {
		self.bind(
			data.into_iter()
				.map(|(k, v)| (k, Value::String(v)))
				.collect(),
		);
	}

	pub fn bind_files(&mut self, files: HashMap<String, UploadedFile>) {
		self.files = files;
		self.is_bound = true;
	}

	/// Runs a check over the cleaned data after every field is clean.
	pub fn add_clean_function<F>(&mut self, f: F)
	where
		F: Fn(&HashMap<String, Value>) -> FormResult<()> + Send + Sync + 'static,
	{
		self.clean_functions.push(Box::new(f));
	}

	/// Records an error found outside the form, e.g. a uniqueness check
	/// against the database. Pass [`ALL_FIELDS_KEY`] for form-level errors.
	pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
		self.errors
			.entry(field.to_string())
			.or_default()
			.push(message.into());
		self.cleaned.remove(field);
	}

	pub fn is_valid(&mut self) -> bool {
		if !self.is_bound {
			return false;
		}

		self.errors.clear();
		self.cleaned.clear();

		for field in &self.fields {
			let name = field.name();
			let result = if field.is_file_field() {
				let clear = self
					.data
					.get(&format!("{}{}", name, CLEAR_SUFFIX))
					.map(is_truthy)
					.unwrap_or(false);
				let has_initial = self
					.initial
					.get(name)
					.map(|v| !v.is_null() && v.as_str() != Some(""))
					.unwrap_or(false);
				field.clean_upload(self.files.get(name), clear, has_initial)
			} else {
				field.clean(self.data.get(name))
			};

			match result {
				Ok(cleaned) => {
					self.cleaned.insert(name.to_string(), cleaned);
				}
				Err(e) => {
					self.errors
						.entry(name.to_string())
						.or_default()
						.push(e.to_string());
				}
			}
		}

		for clean_fn in &self.clean_functions {
			if let Err(e) = clean_fn(&self.cleaned) {
				match e {
					FormError::Field { field, error } => {
						self.errors.entry(field).or_default().push(error.to_string());
					}
					FormError::Validation(msg) => {
						self.errors
							.entry(ALL_FIELDS_KEY.to_string())
							.or_default()
							.push(msg);
					}
				}
			}
		}

		self.errors.is_empty()
	}

	pub fn is_bound(&self) -> bool {
		self.is_bound
	}

	pub fn fields(&self) -> &[Box<dyn FormField>] {
		&self.fields
	}

	pub fn errors(&self) -> &HashMap<String, Vec<String>> {
		&self.errors
	}

	pub fn non_field_errors(&self) -> &[String] {
		self.errors
			.get(ALL_FIELDS_KEY)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	pub fn cleaned_data(&self) -> &HashMap<String, Value> {
		&self.cleaned
	}

	pub fn cleaned_str(&self, name: &str) -> Option<&str> {
		self.cleaned.get(name).and_then(Value::as_str)
	}

	pub fn cleaned_i64(&self, name: &str) -> Option<i64> {
		self.cleaned.get(name).and_then(Value::as_i64)
	}

	/// Cleaned date/time field interpreted as UTC.
	pub fn cleaned_datetime(&self, name: &str) -> Option<DateTime<Utc>> {
		self.cleaned_str(name)
			.and_then(|s| NaiveDateTime::parse_from_str(s, CLEANED_FORMAT).ok())
			.map(|naive| naive.and_utc())
	}

	/// Newly uploaded file for a file field, if one replaced the stored file.
	pub fn cleaned_file(&self, name: &str) -> Option<&UploadedFile> {
		match self.cleaned.get(name) {
			Some(Value::String(_)) => self.files.get(name),
			_ => None,
		}
	}

	/// Whether the "clear" checkbox of a file field was accepted.
	pub fn file_cleared(&self, name: &str) -> bool {
		matches!(self.cleaned.get(name), Some(Value::Bool(false)))
	}

	/// Serializable view of the form for templates.
	pub fn context(&self) -> FormContext {
		let fields = self
			.fields
			.iter()
			.map(|field| self.bound_field(field.as_ref()))
			.collect();
		FormContext {
			fields,
			non_field_errors: self.non_field_errors().to_vec(),
			is_bound: self.is_bound,
			has_errors: !self.errors.is_empty(),
		}
	}

	fn bound_field(&self, field: &dyn FormField) -> BoundFieldContext {
		let name = field.name();
		let widget = field.widget();

		let raw = if self.is_bound && !field.is_file_field() {
			self.data.get(name)
		} else {
			self.initial.get(name)
		};
		let value = match (widget, raw) {
			(Widget::PasswordInput, _) => String::new(),
			(_, Some(Value::String(s))) => s.clone(),
			(_, Some(Value::Null)) | (_, None) => String::new(),
			(_, Some(other)) => other.to_string(),
		};

		let choices = field
			.choices()
			.into_iter()
			.map(|(choice, label)| ChoiceContext {
				selected: choice == value,
				value: choice,
				label,
			})
			.collect();

		BoundFieldContext {
			name: name.to_string(),
			id: format!("id_{}", name),
			label: field.label().unwrap_or(name).to_string(),
			help_text: field.help_text().map(str::to_string),
			widget: widget.kind(),
			rows: widget.rows(),
			required: field.required(),
			value,
			choices,
			errors: self.errors.get(name).cloned().unwrap_or_default(),
		}
	}
}

impl Default for Form {
	fn default() -> Self {
		Self::new()
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::String(s) => matches!(s.as_str(), "on" | "true" | "1"),
		_ => false,
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceContext {
	pub value: String,
	pub label: String,
	pub selected: bool,
}

/// One field as the templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct BoundFieldContext {
	pub name: String,
	pub id: String,
	pub label: String,
	pub help_text: Option<String>,
	pub widget: &'static str,
	pub rows: Option<u32>,
	pub required: bool,
	/// Submitted value when bound, initial value otherwise.
	pub value: String,
	pub choices: Vec<ChoiceContext>,
	pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormContext {
	pub fields: Vec<BoundFieldContext>,
	pub non_field_errors: Vec<String>,
	pub is_bound: bool,
	pub has_errors: bool,
}
