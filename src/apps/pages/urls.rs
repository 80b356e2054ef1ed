//! Routes of the `pages` namespace.

use blogicum_core::Result;
use blogicum_http::{Router, handler_fn};

use crate::apps::pages::views;

pub fn url_patterns() -> Result<Router> {
	Ok(Router::new()
		.with_namespace("pages")
		.route("/about/", Some("about"), handler_fn(views::about))?
		.route("/rules/", Some("rules"), handler_fn(views::rules))?)
}
