//! Registration, login and logout.

use blogicum_auth::{CurrentUser, Session, login as login_session, logout as logout_session};
use blogicum_core::{Error, Result};
use blogicum_http::shortcuts::is_safe_redirect;
use blogicum_http::{Request, Response, redirect};
use tera::Context;

use crate::apps::users::forms::{
	login_form, new_user, registration_form, reject_login, validate_registration,
};
use crate::apps::users::models::User;
use crate::config::state::AppState;
use crate::config::templates::render;

fn session(request: &Request) -> Result<Session> {
	request
		.extensions
		.get::<Session>()
		.ok_or_else(|| Error::Internal("session middleware is not installed".to_string()))
}

/// Creates an account and logs the new user in.
pub async fn registration(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let mut form = registration_form();

	if request.is_post() {
		form.bind_strings(request.form_data().await?);
		if validate_registration(&mut form, &state.pool).await? {
			let user = User::create(&state.pool, state.hasher.clone(), &new_user(&form)).await?;
			login_session(&session(&request)?, &user)?;
			return Ok(redirect(state.reverse("blog:index", &[])?));
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.context());
	render(&request, &state, "registration/registration_form.html", context)
}

/// Logs a user in and sends them to `next` when it is a local path.
pub async fn login(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let mut form = login_form();
	let submitted = if request.is_post() {
		Some(request.form_data().await?)
	} else {
		None
	};
	let next = submitted
		.as_ref()
		.and_then(|data| data.get("next").cloned())
		.or_else(|| request.query("next").map(str::to_string))
		.filter(|target| is_safe_redirect(target));

	if let Some(data) = submitted {
		form.bind_strings(data);
		if form.is_valid() {
			let username = form.cleaned_str("username").unwrap_or_default();
			let password = form.cleaned_str("password").unwrap_or_default();
			match User::authenticate(&state.pool, state.hasher.clone(), username, password).await? {
				Some(user) => {
					login_session(&session(&request)?, &user)?;
					let target = match next {
						Some(target) => target,
						None => state.reverse("blog:index", &[])?,
					};
					return Ok(redirect(target));
				}
				None => reject_login(&mut form),
			}
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.context());
	context.insert("next", &next);
	render(&request, &state, "registration/login.html", context)
}

pub async fn logout(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	if let Some(session) = request.extensions.get::<Session>() {
		logout_session(&session);
	}
	request.extensions.insert(CurrentUser::<User>::anonymous());
	render(&request, &state, "registration/logged_out.html", Context::new())
}
