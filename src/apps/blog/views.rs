//! Views of the blog app.
//!
//! Views that change data require a logged-in user: anonymous visitors are
//! sent to the login page with the current path in `next`.

use blogicum_auth::{CurrentUser, Session};
use blogicum_core::messages::Message;
use blogicum_core::{Error, Result};
use blogicum_http::shortcuts::redirect_to_login;
use blogicum_http::{Request, Response, get_or_404, redirect};
use chrono::Utc;
use tera::Context;

use crate::apps::blog::forms::{PostForm, comment_form, comment_form_for, delete_confirm_form};
use crate::apps::blog::models::{Category, Comment, Post};
use crate::apps::blog::queries::{PostScope, get_post_item, paginate_posts, post_comments};
use crate::apps::users::forms::profile_form;
use crate::apps::users::models::User;
use crate::config::state::AppState;
use crate::config::templates::render;

const POST_IMAGES_DIR: &str = "posts_images";

const CANNOT_EDIT_POST: &str = "Вы не можете редактировать этот пост";
const CANNOT_DELETE_POST: &str = "Вы не можете удалить этот пост";
const POST_UPDATED: &str = "Пост успешно обновлён";
const POST_DELETED: &str = "Пост успешно удалён";

/// The logged-in user, or the redirect to the login page.
fn authenticated_user(request: &Request, state: &AppState) -> std::result::Result<User, Response> {
	CurrentUser::<User>::from_request(request)
		.into_user()
		.ok_or_else(|| redirect_to_login(&state.settings.login_url, &request.full_path()))
}

fn add_message(request: &Request, message: Message) -> Result<()> {
	match request.extensions.get::<Session>() {
		Some(session) => session.add_message(message),
		None => Ok(()),
	}
}

fn post_detail_url(state: &AppState, post_id: i64) -> Result<String> {
	state.reverse("blog:post_detail", &[("post_id", &post_id.to_string())])
}

fn profile_url(state: &AppState, username: &str) -> Result<String> {
	state.reverse("blog:profile", &[("username", username)])
}

async fn get_post(state: &AppState, post_id: i64) -> Result<Post> {
	get_or_404(Post::get(&state.pool, post_id).await?, "post")
}

/// Stored image name after a valid post form was submitted, and the stored
/// file that is no longer referenced.
async fn resolve_image(
	state: &AppState,
	form: &PostForm,
	current: Option<&str>,
) -> Result<(Option<String>, Option<String>)> {
	if let Some(file) = form.form.cleaned_file("image") {
		let stored = state.media.save(POST_IMAGES_DIR, file).await?;
		return Ok((Some(stored), current.map(str::to_string)));
	}
	if form.form.file_cleared("image") {
		return Ok((None, current.map(str::to_string)));
	}
	Ok((current.map(str::to_string), None))
}

async fn remove_image(state: &AppState, name: Option<String>) {
	if let Some(name) = name {
		if let Err(e) = state.media.delete(&name).await {
			tracing::warn!(image = %name, error = %e, "failed to delete post image");
		}
	}
}

/// Main feed.
pub async fn index(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let now = Utc::now();

	let page = paginate_posts(
		&state.pool,
		PostScope::Public,
		now,
		&state.paginator,
		request.query("page"),
	)
	.await?
	.map(|item| item.into_context(&state.media, now));

	let mut context = Context::new();
	context.insert("page_obj", &page);
	render(&request, &state, "blog/index.html", context)
}

pub async fn post_detail(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let post_id = request.path_param_i64("post_id")?;
	let now = Utc::now();

	let post = get_or_404(get_post_item(&state.pool, post_id).await?, "post")?;
	let viewer = CurrentUser::<User>::from_request(&request);
	if !post.is_visible(now) && viewer.id() != Some(post.author_id) {
		return Err(Error::NotFound(format!("post {} is not published", post_id)));
	}

	let comments = post_comments(&state.pool, post_id).await?;
	let mut context = Context::new();
	context.insert("post", &post.into_context(&state.media, now));
	context.insert("comments", &comments);
	context.insert("form", &comment_form().context());
	render(&request, &state, "blog/detail.html", context)
}

pub async fn category_posts(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let slug = request.path_param("category_slug").unwrap_or_default();
	let now = Utc::now();

	let category = get_or_404(
		Category::get_published_by_slug(&state.pool, slug).await?,
		"category",
	)?;
	let page = paginate_posts(
		&state.pool,
		PostScope::Category(category.id),
		now,
		&state.paginator,
		request.query("page"),
	)
	.await?
	.map(|item| item.into_context(&state.media, now));

	let mut context = Context::new();
	context.insert("category", &category);
	context.insert("page_obj", &page);
	render(&request, &state, "blog/category.html", context)
}

/// Posts of one user. The owner also sees unpublished and scheduled posts.
pub async fn profile(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let username = request.path_param("username").unwrap_or_default();
	let now = Utc::now();

	let owner = get_or_404(User::get_by_username(&state.pool, username).await?, "user")?;
	let include_hidden = CurrentUser::<User>::from_request(&request).id() == Some(owner.id);
	let page = paginate_posts(
		&state.pool,
		PostScope::Author {
			author_id: owner.id,
			include_hidden,
		},
		now,
		&state.paginator,
		request.query("page"),
	)
	.await?
	.map(|item| item.into_context(&state.media, now));

	let mut context = Context::new();
	context.insert("profile", &owner);
	context.insert("profile_full_name", &owner.full_name());
	context.insert("page_obj", &page);
	render(&request, &state, "blog/profile.html", context)
}

pub async fn edit_profile(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let mut user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};

	let mut form = profile_form(&user);
	if request.is_post() {
		form.bind_strings(request.form_data().await?);
		if form.is_valid() {
			let first_name = form.cleaned_str("first_name").unwrap_or_default().to_string();
			let last_name = form.cleaned_str("last_name").unwrap_or_default().to_string();
			let email = form.cleaned_str("email").unwrap_or_default().to_string();
			user.update_profile(&state.pool, &first_name, &last_name, &email)
				.await?;
			return Ok(redirect(profile_url(&state, &user.username)?));
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.context());
	render(&request, &state, "blog/user.html", context)
}

pub async fn create_post(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};

	let mut form = PostForm::new(&state.pool, state.settings.max_upload_size).await?;
	if request.is_post() {
		let submitted = request.multipart().await?;
		form.form.bind_strings(submitted.fields);
		form.form.bind_files(submitted.files);
		if form.form.is_valid() {
			let (image, _) = resolve_image(&state, &form, None).await?;
			if let Some(data) = form.post_data(image) {
				Post::create(&state.pool, user.id, &data).await?;
				return Ok(redirect(profile_url(&state, &user.username)?));
			}
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.form.context());
	render(&request, &state, "blog/create.html", context)
}

pub async fn edit_post(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};
	let post_id = request.path_param_i64("post_id")?;
	let mut post = get_post(&state, post_id).await?;

	if post.author_id != user.id {
		add_message(&request, Message::error(CANNOT_EDIT_POST))?;
		return Ok(redirect(post_detail_url(&state, post.id)?));
	}

	let mut form = PostForm::new(&state.pool, state.settings.max_upload_size)
		.await?
		.with_instance(&post);
	if request.is_post() {
		let submitted = request.multipart().await?;
		form.form.bind_strings(submitted.fields);
		form.form.bind_files(submitted.files);
		if form.form.is_valid() {
			let (image, obsolete) = resolve_image(&state, &form, post.image.as_deref()).await?;
			if let Some(data) = form.post_data(image) {
				post.update(&state.pool, &data).await?;
				remove_image(&state, obsolete).await;
				add_message(&request, Message::success(POST_UPDATED))?;
				return Ok(redirect(post_detail_url(&state, post.id)?));
			}
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.form.context());
	context.insert("image_url", &post.image.as_deref().map(|name| state.media.url(name)));
	context.insert("is_edit", &true);
	render(&request, &state, "blog/create.html", context)
}

/// Deletion by the author only; anyone else, anonymous visitors included,
/// is sent back to the post with an error message.
pub async fn delete_post(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let post_id = request.path_param_i64("post_id")?;
	let post = get_post(&state, post_id).await?;

	let viewer = CurrentUser::<User>::from_request(&request);
	let Some(user) = viewer.user().filter(|u| u.id == post.author_id) else {
		add_message(&request, Message::error(CANNOT_DELETE_POST))?;
		return Ok(redirect(post_detail_url(&state, post.id)?));
	};

	if request.is_post() {
		post.delete(&state.pool).await?;
		remove_image(&state, post.image.clone()).await;
		add_message(&request, Message::success(POST_DELETED))?;
		return Ok(redirect(profile_url(&state, &user.username)?));
	}

	let item = get_or_404(get_post_item(&state.pool, post.id).await?, "post")?;
	let mut context = Context::new();
	context.insert("form", &delete_confirm_form().context());
	context.insert("post", &item.into_context(&state.media, Utc::now()));
	context.insert("is_delete", &true);
	render(&request, &state, "blog/create.html", context)
}

/// Adds a comment on POST. Whatever happens, the visitor lands back on the
/// post.
pub async fn add_comment(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};
	let post_id = request.path_param_i64("post_id")?;
	let post = get_post(&state, post_id).await?;

	if request.is_post() {
		let mut form = comment_form();
		form.bind_strings(request.form_data().await?);
		if form.is_valid() {
			let text = form.cleaned_str("text").unwrap_or_default();
			Comment::create(&state.pool, post.id, user.id, text).await?;
		}
	}
	Ok(redirect(post_detail_url(&state, post.id)?))
}

/// The comment addressed by the URL. A comment of another post is a 404.
async fn get_comment(state: &AppState, post_id: i64, comment_id: i64) -> Result<Comment> {
	let comment = get_or_404(Comment::get(&state.pool, comment_id).await?, "comment")?;
	if comment.post_id != post_id {
		return Err(Error::NotFound(format!(
			"comment {} does not belong to post {}",
			comment_id, post_id
		)));
	}
	Ok(comment)
}

pub async fn edit_comment(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};
	let post_id = request.path_param_i64("post_id")?;
	let comment_id = request.path_param_i64("comment_id")?;
	let mut comment = get_comment(&state, post_id, comment_id).await?;

	if comment.author_id != user.id {
		return Ok(redirect(post_detail_url(&state, post_id)?));
	}

	let mut form = comment_form_for(&comment);
	if request.is_post() {
		form.bind_strings(request.form_data().await?);
		if form.is_valid() {
			let text = form.cleaned_str("text").unwrap_or_default().to_string();
			comment.update_text(&state.pool, &text).await?;
			return Ok(redirect(post_detail_url(&state, post_id)?));
		}
	}

	let mut context = Context::new();
	context.insert("form", &form.context());
	context.insert("comment", &comment);
	render(&request, &state, "blog/comment.html", context)
}

/// Comment authors and staff may delete a comment.
pub async fn delete_comment(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let user = match authenticated_user(&request, &state) {
		Ok(user) => user,
		Err(response) => return Ok(response),
	};
	let post_id = request.path_param_i64("post_id")?;
	let comment_id = request.path_param_i64("comment_id")?;
	let post = get_post(&state, post_id).await?;
	let comment = get_comment(&state, post.id, comment_id).await?;

	if request.is_post() {
		if comment.author_id != user.id && !user.is_staff {
			return Err(Error::PermissionDenied(format!(
				"user {} may not delete comment {}",
				user.id, comment.id
			)));
		}
		comment.delete(&state.pool).await?;
		return Ok(redirect(post_detail_url(&state, post.id)?));
	}

	let mut context = Context::new();
	context.insert("post", &post);
	context.insert("comment", &comment);
	render(&request, &state, "blog/comment.html", context)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::settings::Settings;
	use crate::test_utils::TestClient;
	use crate::test_utils::database::test_pool;
	use crate::test_utils::factories::{PostFactory, create_category, create_user};
	use hyper::StatusCode;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_anonymous_is_sent_to_login() {
		// Arrange
		let pool = test_pool().await.unwrap();
		let client = TestClient::from_pool(Settings::default(), pool).unwrap();

		// Act
		let response = client.get("/posts/create/").await.unwrap();

		// Assert
		assert_eq!(response.status, StatusCode::FOUND);
		assert_eq!(response.location(), Some("/auth/login/?next=/posts/create/"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_hidden_post_is_visible_to_author_only() {
		let pool = test_pool().await.unwrap();
		let author = create_user(&pool, "anna").await.unwrap();
		let category = create_category(&pool, "open", true).await.unwrap();
		let post = PostFactory::new(author.id)
			.category(category.id)
			.published(false)
			.title("Черновик")
			.create(&pool)
			.await
			.unwrap();
		let path = format!("/posts/{}/", post.id);

		let anonymous = TestClient::from_pool(Settings::default(), pool.clone()).unwrap();
		assert_eq!(anonymous.get(&path).await.unwrap().status, StatusCode::NOT_FOUND);

		let owner = TestClient::from_pool(Settings::default(), pool.clone()).unwrap();
		owner.force_login(author.id).await.unwrap();
		let response = owner.get(&path).await.unwrap();
		assert_eq!(response.status, StatusCode::OK);
		assert!(response.text().contains("Черновик"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_comment_of_other_post_is_not_found() {
		let pool = test_pool().await.unwrap();
		let author = create_user(&pool, "anna").await.unwrap();
		let first = PostFactory::new(author.id).create(&pool).await.unwrap();
		let second = PostFactory::new(author.id).create(&pool).await.unwrap();
		let comment = Comment::create(&pool, first.id, author.id, "привет").await.unwrap();
		let client = TestClient::from_pool(Settings::default(), pool.clone()).unwrap();
		client.force_login(author.id).await.unwrap();

		let response = client
			.get(&format!("/posts/{}/edit_comment/{}/", second.id, comment.id))
			.await
			.unwrap();

		assert_eq!(response.status, StatusCode::NOT_FOUND);
	}
}
