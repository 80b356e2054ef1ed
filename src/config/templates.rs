//! Template engine setup and page rendering.
//!
//! Templates are compiled into the binary. Besides Tera's builtins they can
//! use:
//!
//! - `url(name=..., **params)`: reverses a named route, e.g.
//!   `{{ url(name="blog:post_detail", post_id=post.id) }}`
//! - `ru_date`: formats an RFC 3339 timestamp as `5 марта 2024 г., 14:30`
//!   (`ru_date(format="date")` drops the time)
//! - `truncatewords(count=N)`: keeps the first N words

use blogicum_auth::{CsrfToken, CurrentUser, Session};
use blogicum_core::messages::MessageContext;
use blogicum_core::Result;
use blogicum_http::{Request, Response, UrlResolver};
use chrono::{DateTime, Datelike, Timelike};
use hyper::StatusCode;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

use crate::apps::users::models::User;
use crate::config::state::AppState;

const TEMPLATES: &[(&str, &str)] = &[
	("base.html", include_str!("../../templates/base.html")),
	("includes/header.html", include_str!("../../templates/includes/header.html")),
	("includes/footer.html", include_str!("../../templates/includes/footer.html")),
	("includes/messages.html", include_str!("../../templates/includes/messages.html")),
	("includes/paginator.html", include_str!("../../templates/includes/paginator.html")),
	("includes/post_card.html", include_str!("../../templates/includes/post_card.html")),
	("includes/form_fields.html", include_str!("../../templates/includes/form_fields.html")),
	("blog/index.html", include_str!("../../templates/blog/index.html")),
	("blog/detail.html", include_str!("../../templates/blog/detail.html")),
	("blog/category.html", include_str!("../../templates/blog/category.html")),
	("blog/profile.html", include_str!("../../templates/blog/profile.html")),
	("blog/create.html", include_str!("../../templates/blog/create.html")),
	("blog/comment.html", include_str!("../../templates/blog/comment.html")),
	("blog/user.html", include_str!("../../templates/blog/user.html")),
	("registration/login.html", include_str!("../../templates/registration/login.html")),
	(
		"registration/registration_form.html",
		include_str!("../../templates/registration/registration_form.html"),
	),
	("registration/logged_out.html", include_str!("../../templates/registration/logged_out.html")),
	("pages/about.html", include_str!("../../templates/pages/about.html")),
	("pages/rules.html", include_str!("../../templates/pages/rules.html")),
	("pages/403.html", include_str!("../../templates/pages/403.html")),
	("pages/403csrf.html", include_str!("../../templates/pages/403csrf.html")),
	("pages/404.html", include_str!("../../templates/pages/404.html")),
	("pages/500.html", include_str!("../../templates/pages/500.html")),
];

const MONTHS_GENITIVE: [&str; 12] = [
	"января",
	"февраля",
	"марта",
	"апреля",
	"мая",
	"июня",
	"июля",
	"августа",
	"сентября",
	"октября",
	"ноября",
	"декабря",
];

/// Compiles every template and registers the project's functions and
/// filters.
pub fn build_engine(urls: UrlResolver) -> Result<Tera> {
	let mut tera = Tera::default();
	tera.add_raw_templates(TEMPLATES.iter().copied())?;
	tera.register_function("url", move |args: &HashMap<String, Value>| {
		reverse_url(&urls, args)
	});
	tera.register_filter("ru_date", ru_date);
	tera.register_filter("truncatewords", truncatewords);
	tracing::debug!(templates = TEMPLATES.len(), "templates compiled");
	Ok(tera)
}

/// Names of the compiled templates.
pub fn template_names() -> impl Iterator<Item = &'static str> {
	TEMPLATES.iter().map(|(name, _)| *name)
}

fn reverse_url(urls: &UrlResolver, args: &HashMap<String, Value>) -> tera::Result<Value> {
	let name = args
		.get("name")
		.and_then(Value::as_str)
		.ok_or_else(|| tera::Error::msg("url() requires a `name` argument"))?;

	let params: Vec<(String, String)> = args
		.iter()
		.filter(|(key, _)| key.as_str() != "name")
		.map(|(key, value)| {
			let value = match value {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			};
			(key.clone(), value)
		})
		.collect();
	let borrowed: Vec<(&str, &str)> = params
		.iter()
		.map(|(k, v)| (k.as_str(), v.as_str()))
		.collect();

	urls.reverse(name, &borrowed)
		.map(Value::String)
		.map_err(|e| tera::Error::msg(e.to_string()))
}

/// `5 марта 2024 г., 14:30`
pub fn ru_date(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
	let raw = match value {
		Value::Null => return Ok(Value::String(String::new())),
		Value::String(s) => s,
		_ => return Err(tera::Error::msg("ru_date filter requires a string")),
	};
	let dt = DateTime::parse_from_rfc3339(raw)
		.map_err(|e| tera::Error::msg(format!("ru_date: cannot parse `{}`: {}", raw, e)))?;

	let date = format!(
		"{} {} {} г.",
		dt.day(),
		MONTHS_GENITIVE[dt.month0() as usize],
		dt.year()
	);
	let with_time = args.get("format").and_then(Value::as_str) != Some("date");
	if with_time {
		Ok(Value::String(format!(
			"{}, {:02}:{:02}",
			date,
			dt.hour(),
			dt.minute()
		)))
	} else {
		Ok(Value::String(date))
	}
}

/// Keeps the first `count` words, appending `…` when something was cut.
pub fn truncatewords(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
	let s = value
		.as_str()
		.ok_or_else(|| tera::Error::msg("truncatewords filter requires a string"))?;
	let count = args
		.get("count")
		.and_then(Value::as_u64)
		.ok_or_else(|| tera::Error::msg("truncatewords filter requires a `count` parameter"))?
		as usize;

	let words: Vec<&str> = s.split_whitespace().collect();
	if words.len() <= count {
		return Ok(Value::String(s.to_string()));
	}
	Ok(Value::String(format!("{} …", words[..count].join(" "))))
}

/// Renders `template` with the request-wide variables every page uses:
/// `user`, `messages`, `csrf_token` and `request_path`.
///
/// Rendering consumes the pending flash messages.
pub fn render(
	request: &Request,
	state: &AppState,
	template: &str,
	context: Context,
) -> Result<Response> {
	render_with_status(request, state, template, context, StatusCode::OK)
}

pub fn render_with_status(
	request: &Request,
	state: &AppState,
	template: &str,
	mut context: Context,
	status: StatusCode,
) -> Result<Response> {
	add_request_context(request, state, &mut context);
	let html = state.templates.render(template, &context)?;
	Ok(Response::html(status, html))
}

pub(crate) fn add_request_context(request: &Request, state: &AppState, context: &mut Context) {
	let current = CurrentUser::<User>::from_request(request);
	context.insert("user", &current.user());
	context.insert("user_is_authenticated", &current.is_authenticated());

	let messages: Vec<MessageContext> = request
		.extensions
		.get::<Session>()
		.map(|session| session.take_messages())
		.unwrap_or_default()
		.iter()
		.map(MessageContext::from)
		.collect();
	context.insert("messages", &messages);

	let csrf_token = request
		.extensions
		.get::<CsrfToken>()
		.map(|token| token.0)
		.unwrap_or_default();
	context.insert("csrf_token", &csrf_token);
	context.insert("request_path", request.path());
	context.insert("debug", &state.settings.debug);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[rstest]
	#[case("2024-03-05T14:30:00+00:00", None, "5 марта 2024 г., 14:30")]
	#[case("2024-12-31T09:05:59.123+00:00", None, "31 декабря 2024 г., 09:05")]
	#[case("2024-01-01T00:00:00Z", Some("date"), "1 января 2024 г.")]
	fn test_ru_date(#[case] input: &str, #[case] format: Option<&str>, #[case] expected: &str) {
		let args = match format {
			Some(f) => args(&[("format", json!(f))]),
			None => HashMap::new(),
		};
		assert_eq!(ru_date(&json!(input), &args).unwrap(), json!(expected));
	}

	#[rstest]
	fn test_ru_date_rejects_garbage() {
		assert!(ru_date(&json!("yesterday"), &HashMap::new()).is_err());
		assert_eq!(ru_date(&Value::Null, &HashMap::new()).unwrap(), json!(""));
	}

	#[rstest]
	#[case("раз два три", 5, "раз два три")]
	#[case("раз два три четыре", 2, "раз два …")]
	fn test_truncatewords(#[case] input: &str, #[case] count: u64, #[case] expected: &str) {
		let result = truncatewords(&json!(input), &args(&[("count", json!(count))])).unwrap();
		assert_eq!(result, json!(expected));
	}

	#[rstest]
	fn test_all_templates_compile() {
		let router = crate::config::urls::url_patterns(&crate::config::Settings::default()).unwrap();

		let tera = build_engine(router.resolver()).unwrap();

		for name in template_names() {
			assert!(tera.get_template_names().any(|n| n == name), "{} missing", name);
		}
	}
}
