//! Small helpers used by almost every view.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::Response;
use blogicum_core::{Error, Result};

/// Characters kept verbatim in a `next` query value.
const NEXT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'/')
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'~');

/// 302 redirect to `location`.
pub fn redirect(location: impl AsRef<str>) -> Response {
	Response::temporary_redirect(location)
}

/// Unwraps a lookup result or raises a 404 naming `what`.
///
/// ```
/// use blogicum_http::get_or_404;
///
/// assert_eq!(get_or_404(Some(3), "post").unwrap(), 3);
/// assert!(get_or_404(None::<i32>, "post").is_err());
/// ```
pub fn get_or_404<T>(value: Option<T>, what: &str) -> Result<T> {
	value.ok_or_else(|| Error::NotFound(format!("No {} matches the given query", what)))
}

/// Redirect to the login page carrying the current path in `next`.
///
/// ```
/// use blogicum_http::shortcuts::redirect_to_login;
///
/// let response = redirect_to_login("/auth/login/", "/posts/create/?x=1");
/// assert_eq!(response.location(), Some("/auth/login/?next=/posts/create/%3Fx%3D1"));
/// ```
pub fn redirect_to_login(login_url: &str, next: &str) -> Response {
	let separator = if login_url.contains('?') { '&' } else { '?' };
	redirect(format!(
		"{}{}next={}",
		login_url,
		separator,
		utf8_percent_encode(next, NEXT_SAFE)
	))
}

/// Whether `target` is a local path that is safe to redirect to after
/// login. Absolute and scheme-relative URLs are rejected.
pub fn is_safe_redirect(target: &str) -> bool {
	target.starts_with('/')
		&& !target.starts_with("//")
		&& !target.starts_with("/\\")
		&& !target.chars().any(|c| c.is_control())
}
