//! Account forms: registration, login and profile editing.

use blogicum_core::Result;
use blogicum_forms::fields::{CharField, EmailField};
use blogicum_forms::{ALL_FIELDS_KEY, FieldError, Form, FormError, Widget};
use regex::Regex;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::apps::users::models::{NewUser, User};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

static USERNAME_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("USERNAME_RE: invalid regex pattern"));

const USERNAME_HELP: &str =
	"Обязательное поле. Не более 150 символов. Только буквы, цифры и символы @/./+/-/_.";
const USERNAME_INVALID: &str = "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.";
const USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
const PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const INVALID_LOGIN: &str = "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.";

fn name_fields(form: Form) -> Form {
	form.with_field(
		CharField::new("first_name")
			.with_max_length(NAME_MAX_LENGTH)
			.with_label("Имя"),
	)
	.with_field(
		CharField::new("last_name")
			.with_max_length(NAME_MAX_LENGTH)
			.with_label("Фамилия"),
	)
	.with_field(EmailField::new("email").with_label("Адрес электронной почты"))
}

/// Sign-up form. Uniqueness of the username needs the database and is
/// checked by [`validate_registration`].
pub fn registration_form() -> Form {
	let form = Form::new().with_field(
		CharField::new("username")
			.required()
			.with_max_length(USERNAME_MAX_LENGTH)
			.with_label("Имя пользователя")
			.with_help_text(USERNAME_HELP)
			.with_validator(USERNAME_RE.clone(), USERNAME_INVALID),
	);
	let mut form = name_fields(form)
		.with_field(
			CharField::new("password1")
				.required()
				.no_strip()
				.with_min_length(PASSWORD_MIN_LENGTH)
				.with_label("Пароль")
				.with_widget(Widget::PasswordInput),
		)
		.with_field(
			CharField::new("password2")
				.required()
				.no_strip()
				.with_label("Подтверждение пароля")
				.with_help_text("Для подтверждения введите, пожалуйста, пароль ещё раз.")
				.with_widget(Widget::PasswordInput),
		);

	form.add_clean_function(|data| {
		let first = data.get("password1").and_then(Value::as_str);
		let second = data.get("password2").and_then(Value::as_str);
		match (first, second) {
			(Some(a), Some(b)) if a != b => Err(FormError::Field {
				field: "password2".to_string(),
				error: FieldError::validation(PASSWORD_MISMATCH),
			}),
			_ => Ok(()),
		}
	});
	form
}

/// Runs the field checks and the username uniqueness check.
pub async fn validate_registration(form: &mut Form, pool: &SqlitePool) -> Result<bool> {
	if !form.is_valid() {
		return Ok(false);
	}
	let username = form.cleaned_str("username").unwrap_or_default().to_string();
	if User::username_exists(pool, &username).await? {
		form.add_error("username", USERNAME_TAKEN);
		return Ok(false);
	}
	Ok(true)
}

/// The account described by a valid registration form.
pub fn new_user(form: &Form) -> NewUser {
	let text = |name: &str| form.cleaned_str(name).unwrap_or_default().to_string();
	NewUser {
		username: text("username"),
		password: text("password1"),
		first_name: text("first_name"),
		last_name: text("last_name"),
		email: text("email"),
		is_staff: false,
	}
}

pub fn login_form() -> Form {
	Form::new()
		.with_field(
			CharField::new("username")
				.required()
				.with_max_length(USERNAME_MAX_LENGTH)
				.with_label("Имя пользователя"),
		)
		.with_field(
			CharField::new("password")
				.required()
				.no_strip()
				.with_label("Пароль")
				.with_widget(Widget::PasswordInput),
		)
}

/// Marks a login form as failed without pointing at a single field.
pub fn reject_login(form: &mut Form) {
	form.add_error(ALL_FIELDS_KEY, INVALID_LOGIN);
}

/// Name and email of `user`, prefilled.
pub fn profile_form(user: &User) -> Form {
	let initial = HashMap::from([
		("first_name".to_string(), Value::String(user.first_name.clone())),
		("last_name".to_string(), Value::String(user.last_name.clone())),
		("email".to_string(), Value::String(user.email.clone())),
	]);
	name_fields(Form::new()).with_initial(initial)
}
