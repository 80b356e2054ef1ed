//! Routes of the `users` namespace.

use blogicum_core::Result;
use blogicum_http::{Router, handler_fn};

use crate::apps::users::views;

pub fn url_patterns() -> Result<Router> {
	Ok(Router::new()
		.with_namespace("users")
		.route("/registration/", Some("registration"), handler_fn(views::registration))?
		.route("/login/", Some("login"), handler_fn(views::login))?
		.route("/logout/", Some("logout"), handler_fn(views::logout))?)
}
