use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, COOKIE, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::cookie::parse_cookie_header;
use crate::extensions::Extensions;
use crate::multipart::MultipartForm;
use blogicum_core::{Error, Result};

/// HTTP request as seen by middleware and views.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Parameters captured by the router, already converted to strings.
	pub path_params: HashMap<String, String>,
	/// URL-decoded query parameters. For repeated keys the last value wins.
	pub query_params: HashMap<String, String>,
	pub remote_addr: Option<SocketAddr>,
	pub extensions: Extensions,
}

impl Request {
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			query_params,
			remote_addr: None,
			extensions: Extensions::new(),
		}
	}

	/// Builder used mostly by tests and the in-process test client.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/posts/create/?page=2")
	///     .header("content-type", "application/x-www-form-urlencoded")
	///     .body("title=Hi")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/posts/create/");
	/// assert_eq!(request.query("page"), Some("2"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
			.map(|pairs| pairs.into_iter().collect())
			.unwrap_or_default()
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Path plus query string, as used for `?next=` redirects.
	pub fn full_path(&self) -> String {
		match self.uri.query() {
			Some(q) if !q.is_empty() => format!("{}?{}", self.uri.path(), q),
			_ => self.uri.path().to_string(),
		}
	}

	pub fn query(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}

	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	/// Integer path parameter. Routes declare these with the `int`
	/// converter, so a parse failure means the route table is wrong.
	pub fn path_param_i64(&self, name: &str) -> Result<i64> {
		self.path_param(name)
			.and_then(|v| v.parse().ok())
			.ok_or_else(|| Error::NotFound(format!("missing path parameter `{}`", name)))
	}

	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	pub fn is_post(&self) -> bool {
		self.method == Method::POST
	}

	/// Whether the method is one that does not change server state.
	pub fn is_safe_method(&self) -> bool {
		matches!(
			self.method,
			Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
		)
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
	}

	pub fn cookies(&self) -> HashMap<String, String> {
		self.headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.flat_map(|v| parse_cookie_header(v).into_iter())
			.collect()
	}

	pub fn cookie(&self, name: &str) -> Option<String> {
		self.cookies().remove(name)
	}

	fn is_multipart(&self) -> bool {
		self.content_type()
			.map(|ct| ct.starts_with("multipart/form-data"))
			.unwrap_or(false)
	}

	/// Decodes an `application/x-www-form-urlencoded` body.
	///
	/// Multipart bodies yield only their text fields; use
	/// [`Request::multipart`] when uploaded files are needed.
	pub async fn form_data(&self) -> Result<HashMap<String, String>> {
		if self.is_multipart() {
			return Ok(self.multipart().await?.fields);
		}
		if self.body.is_empty() {
			return Ok(HashMap::new());
		}
		serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
			.map(|pairs| pairs.into_iter().collect())
			.map_err(|e| Error::BadRequest(format!("malformed form body: {}", e)))
	}

	/// Parses the request body as a form that may carry files.
	///
	/// Non-multipart bodies are decoded as urlencoded text fields with no
	/// files, so views can call this unconditionally.
	pub async fn multipart(&self) -> Result<MultipartForm> {
		if !self.is_multipart() {
			let fields = if self.body.is_empty() {
				HashMap::new()
			} else {
				serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
					.map(|pairs| pairs.into_iter().collect())
					.map_err(|e| Error::BadRequest(format!("malformed form body: {}", e)))?
			};
			return Ok(MultipartForm {
				fields,
				files: HashMap::new(),
			});
		}
		let content_type = self.content_type().unwrap_or_default();
		MultipartForm::parse(content_type, self.body.clone()).await
	}
}

#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	/// Appends a header. Invalid names or values are skipped.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.append(name, value);
		}
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri: Uri = self
			.uri
			.as_deref()
			.unwrap_or("/")
			.parse()
			.map_err(|e| Error::BadRequest(format!("invalid uri: {}", e)))?;
		let mut request = Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			Version::HTTP_11,
			self.headers,
			self.body,
		);
		request.remote_addr = self.remote_addr;
		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_query_params_are_decoded() {
		let request = Request::builder()
			.uri("/?q=hello%20world&tag=a+b&page=1&page=3")
			.build()
			.unwrap();

		assert_eq!(request.query("q"), Some("hello world"));
		assert_eq!(request.query("tag"), Some("a b"));
		assert_eq!(request.query("page"), Some("3"));
		assert_eq!(request.query("missing"), None);
	}

	#[rstest]
	#[case("/posts/1/", "/posts/1/")]
	#[case("/posts/?page=2", "/posts/?page=2")]
	#[case("/posts/?", "/posts/")]
	fn test_full_path(#[case] uri: &str, #[case] expected: &str) {
		let request = Request::builder().uri(uri).build().unwrap();
		assert_eq!(request.full_path(), expected);
	}

	#[rstest]
	fn test_cookies_from_multiple_headers() {
		let request = Request::builder()
			.header("cookie", "sessionid=abc")
			.header("cookie", "csrftoken=xyz")
			.build()
			.unwrap();

		assert_eq!(request.cookie("sessionid").as_deref(), Some("abc"));
		assert_eq!(request.cookie("csrftoken").as_deref(), Some("xyz"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_urlencoded_form_data() {
		// Arrange
		let request = Request::builder()
			.method(Method::POST)
			.header("content-type", "application/x-www-form-urlencoded")
			.body("title=%D0%9F%D1%80%D0%B8%D0%B2%D0%B5%D1%82&text=a+b")
			.build()
			.unwrap();

		// Act
		let form = request.form_data().await.unwrap();

		// Assert
		assert_eq!(form.get("title").map(String::as_str), Some("Привет"));
		assert_eq!(form.get("text").map(String::as_str), Some("a b"));
	}

	#[rstest]
	fn test_path_param_i64() {
		let mut request = Request::builder().uri("/posts/5/").build().unwrap();
		request.set_path_param("post_id", "5");

		assert_eq!(request.path_param_i64("post_id").unwrap(), 5);
		assert!(request.path_param_i64("comment_id").is_err());
	}

	#[rstest]
	#[case(Method::GET, true)]
	#[case(Method::HEAD, true)]
	#[case(Method::POST, false)]
	#[case(Method::DELETE, false)]
	fn test_safe_methods(#[case] method: Method, #[case] safe: bool) {
		let request = Request::builder().method(method).build().unwrap();
		assert_eq!(request.is_safe_method(), safe);
	}
}
