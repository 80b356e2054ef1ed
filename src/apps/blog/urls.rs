//! Routes of the `blog` namespace.

use blogicum_core::Result;
use blogicum_http::{Router, handler_fn};

use crate::apps::blog::views;

pub fn url_patterns() -> Result<Router> {
	let router = Router::new()
		.with_namespace("blog")
		.route("/", Some("index"), handler_fn(views::index))?
		.route("/posts/create/", Some("create_post"), handler_fn(views::create_post))?
		.route("/posts/{post_id:int}/", Some("post_detail"), handler_fn(views::post_detail))?
		.route("/posts/{post_id:int}/edit/", Some("edit_post"), handler_fn(views::edit_post))?
		.route("/posts/{post_id:int}/delete/", Some("delete_post"), handler_fn(views::delete_post))?
		.route("/posts/{post_id:int}/comment/", Some("add_comment"), handler_fn(views::add_comment))?
		.route(
			"/posts/{post_id:int}/edit_comment/{comment_id:int}/",
			Some("edit_comment"),
			handler_fn(views::edit_comment),
		)?
		.route(
			"/posts/{post_id:int}/delete_comment/{comment_id:int}/",
			Some("delete_comment"),
			handler_fn(views::delete_comment),
		)?
		.route(
			"/category/{category_slug:slug}/",
			Some("category_posts"),
			handler_fn(views::category_posts),
		)?
		// Before the profile route, which would take "edit" as a username
		.route("/profile/edit/", Some("edit_profile"), handler_fn(views::edit_profile))?
		.route("/profile/{username}/", Some("profile"), handler_fn(views::profile))?;
	Ok(router)
}
