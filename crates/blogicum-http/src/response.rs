use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue, LOCATION, SET_COOKIE};
use hyper::{HeaderMap, StatusCode};
use percent_encoding::{CONTROLS, utf8_percent_encode};

use crate::cookie::Cookie;

/// HTTP Response representation
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	pub fn forbidden() -> Self {
		Self::new(StatusCode::FORBIDDEN)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// 405 with the `Allow` header listing `allowed`.
	pub fn method_not_allowed(allowed: &[&str]) -> Self {
		Self::new(StatusCode::METHOD_NOT_ALLOWED).with_header("allow", &allowed.join(", "))
	}

	/// Create a Response with HTTP 301 Moved Permanently
	pub fn permanent_redirect(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::MOVED_PERMANENTLY).with_location(location.as_ref())
	}

	/// Create a Response with HTTP 302 Found (temporary redirect)
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::temporary_redirect("/profile/alice/");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.location(), Some("/profile/alice/"));
	/// ```
	pub fn temporary_redirect(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::FOUND).with_location(location.as_ref())
	}

	/// HTML document with the given status.
	pub fn html(status: StatusCode, body: impl Into<Bytes>) -> Self {
		Self::new(status)
			.with_body(body)
			.with_content_type("text/html; charset=utf-8")
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a header, replacing earlier values. Invalid names or values are
	/// ignored.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn with_content_type(self, content_type: &str) -> Self {
		self.with_header(CONTENT_TYPE.as_str(), content_type)
	}

	/// Sets `Location`. Non-ASCII characters are percent-encoded.
	pub fn with_location(mut self, location: &str) -> Self {
		let encoded = utf8_percent_encode(location, CONTROLS).to_string();
		if let Ok(value) = HeaderValue::from_str(&encoded) {
			self.headers.insert(LOCATION, value);
		}
		self
	}

	/// Appends a `Set-Cookie` header; several cookies may be set at once.
	pub fn set_cookie(&mut self, cookie: &Cookie) {
		if let Ok(value) = HeaderValue::from_str(&cookie.to_header_value()) {
			self.headers.append(SET_COOKIE, value);
		}
	}

	pub fn with_cookie(mut self, cookie: &Cookie) -> Self {
		self.set_cookie(cookie);
		self
	}

	pub fn location(&self) -> Option<&str> {
		self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
	}

	pub fn is_redirect(&self) -> bool {
		self.status.is_redirection()
	}

	/// Body decoded as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
