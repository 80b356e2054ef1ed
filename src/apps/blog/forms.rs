//! Forms of the blog app.

use blogicum_core::Result;
use blogicum_forms::fields::{CharField, DateTimeField, ImageField, ModelChoiceField};
use blogicum_forms::{Form, Widget};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::apps::blog::models::{Category, Comment, Location, Post, PostData};

const PUB_DATE_HELP: &str =
	"Если установить дату и время в будущем — можно делать отложенные публикации.";

/// Post creation and editing.
///
/// Category and location choices are limited to published rows, so the
/// form is built per request.
pub struct PostForm {
	pub form: Form,
}

impl PostForm {
	pub async fn new(pool: &SqlitePool, max_upload_size: usize) -> Result<Self> {
		let categories = Category::published_choices(pool).await?;
		let locations = Location::published_choices(pool).await?;

		let form = Form::new()
			.with_field(
				CharField::new("title")
					.required()
					.with_max_length(256)
					.with_label("Заголовок"),
			)
			.with_field(
				CharField::new("text")
					.required()
					.with_label("Текст")
					.with_widget(Widget::TextArea { rows: 10 }),
			)
			.with_field(
				DateTimeField::new("pub_date")
					.with_label("Дата и время публикации")
					.with_help_text(PUB_DATE_HELP),
			)
			.with_field(ModelChoiceField::new("location", locations).with_label("Местоположение"))
			.with_field(
				ModelChoiceField::new("category", categories)
					.required()
					.with_label("Категория"),
			)
			.with_field(
				ImageField::new("image")
					.with_label("Фото")
					.with_max_size(max_upload_size),
			);
		Ok(Self { form })
	}

	/// Prefills the form from a stored post.
	pub fn with_instance(mut self, post: &Post) -> Self {
		let mut initial = HashMap::new();
		initial.insert("title".to_string(), Value::String(post.title.clone()));
		initial.insert("text".to_string(), Value::String(post.text.clone()));
		initial.insert(
			"pub_date".to_string(),
			Value::String(post.pub_date.format("%Y-%m-%dT%H:%M").to_string()),
		);
		initial.insert("location".to_string(), post.location_id.map(Value::from).unwrap_or(Value::Null));
		initial.insert("category".to_string(), post.category_id.map(Value::from).unwrap_or(Value::Null));
		initial.insert(
			"image".to_string(),
			post.image.clone().map(Value::String).unwrap_or(Value::Null),
		);
		self.form.set_initial(initial);
		self
	}

	/// Post fields from a valid form. `image` is the stored name to keep,
	/// resolved by the caller from the upload and the clear checkbox.
	pub fn post_data(&self, image: Option<String>) -> Option<PostData> {
		let form = &self.form;
		Some(PostData {
			title: form.cleaned_str("title")?.to_string(),
			text: form.cleaned_str("text")?.to_string(),
			pub_date: form.cleaned_datetime("pub_date")?,
			location_id: form.cleaned_i64("location"),
			category_id: form.cleaned_i64("category"),
			image,
		})
	}
}

/// Comment creation and editing.
pub fn comment_form() -> Form {
	Form::new().with_field(
		CharField::new("text")
			.required()
			.with_label("Текст комментария")
			.with_widget(Widget::TextArea { rows: 5 }),
	)
}

pub fn comment_form_for(comment: &Comment) -> Form {
	comment_form().with_initial(HashMap::from([(
		"text".to_string(),
		Value::String(comment.text.clone()),
	)]))
}

/// Confirmation of a deletion; carries no fields.
pub fn delete_confirm_form() -> Form {
	Form::new()
}
