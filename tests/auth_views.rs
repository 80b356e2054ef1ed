//! End-to-end tests of registration, login and logout.

mod common;

use blogicum::apps::users::models::User;
use blogicum::test_utils::factories::{DEFAULT_PASSWORD, create_user};
use blogicum_auth::middleware::SESSION_COOKIE_NAME;
use common::{TestApp, app};
use hyper::StatusCode;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_registration_logs_user_in(#[future] app: TestApp) {
	// Arrange
	let app = app.await;
	let client = app.client();

	// Act
	let response = client
		.post_form(
			"/auth/registration/",
			&[
				("username", "new.user"),
				("first_name", "Новый"),
				("last_name", "Автор"),
				("email", "new@example.com"),
				("password1", "s3cret-passw0rd"),
				("password2", "s3cret-passw0rd"),
			],
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(response.location(), Some("/"));
	let user = User::get_by_username(&app.pool, "new.user").await.unwrap().unwrap();
	assert_eq!(user.first_name, "Новый");
	assert_ne!(user.password, "s3cret-passw0rd");
	let index = client.get("/").await.unwrap().text();
	assert!(index.contains("Новая публикация"));
}

#[rstest]
#[tokio::test]
async fn test_registration_errors(#[future] app: TestApp) {
	let app = app.await;
	create_user(&app.pool, "taken").await.unwrap();
	let client = app.client();

	let duplicate = client
		.post_form(
			"/auth/registration/",
			&[
				("username", "taken"),
				("password1", "s3cret-passw0rd"),
				("password2", "s3cret-passw0rd"),
			],
		)
		.await
		.unwrap();
	let mismatch = client
		.post_form(
			"/auth/registration/",
			&[
				("username", "other"),
				("password1", "s3cret-passw0rd"),
				("password2", "another-passw0rd"),
			],
		)
		.await
		.unwrap();

	assert_eq!(duplicate.status, StatusCode::OK);
	assert!(duplicate.text().contains("Пользователь с таким именем уже существует."));
	assert_eq!(mismatch.status, StatusCode::OK);
	assert!(mismatch.text().contains("Введенные пароли не совпадают."));
	assert!(!User::username_exists(&app.pool, "other").await.unwrap());
}

#[rstest]
#[tokio::test]
async fn test_login_with_wrong_password(#[future] app: TestApp) {
	let app = app.await;
	create_user(&app.pool, "anna").await.unwrap();
	let client = app.client();

	let response = client
		.post_form("/auth/login/", &[("username", "anna"), ("password", "wrong")])
		.await
		.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert!(response.text().contains("Пожалуйста, введите правильные имя пользователя и пароль."));
	assert!(client.cookie(SESSION_COOKIE_NAME).await.is_none());
}

#[rstest]
#[case(Some("/profile/edit/"), "/profile/edit/")]
#[case(Some("https://evil.example.com/"), "/")]
#[case(Some("//evil.example.com/"), "/")]
#[case(None, "/")]
#[tokio::test]
async fn test_login_redirects_to_safe_next(
	#[future] app: TestApp,
	#[case] next: Option<&str>,
	#[case] expected: &str,
) {
	// Arrange
	let app = app.await;
	create_user(&app.pool, "anna").await.unwrap();
	let client = app.client();
	let mut fields = vec![("username", "anna"), ("password", DEFAULT_PASSWORD)];
	if let Some(next) = next {
		fields.push(("next", next));
	}

	// Act
	let response = client.post_form("/auth/login/", &fields).await.unwrap();

	// Assert
	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(response.location(), Some(expected));
	assert!(client.cookie(SESSION_COOKIE_NAME).await.is_some());
}

#[rstest]
#[tokio::test]
async fn test_login_page_keeps_next_from_query(#[future] app: TestApp) {
	let app = app.await;

	let response = app.client().get("/auth/login/?next=/posts/create/").await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert!(response.text().contains("value=\"&#x2F;posts&#x2F;create&#x2F;\""));
}

#[rstest]
#[tokio::test]
async fn test_logout_ends_session(#[future] app: TestApp) {
	let app = app.await;
	let anna = create_user(&app.pool, "anna").await.unwrap();
	let client = app.client_for(&anna).await;

	let response = client.post_form("/auth/logout/", &[]).await.unwrap();
	let after = client.get("/profile/edit/").await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	let html = response.text();
	assert!(html.contains("Вы вышли из системы"));
	assert!(!html.contains("Новая публикация"));
	assert_eq!(after.status, StatusCode::FOUND);
	assert_eq!(after.location(), Some("/auth/login/?next=/profile/edit/"));
}
