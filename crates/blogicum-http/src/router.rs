//! URL routing with named, reversible routes.
//!
//! Patterns use `{name}` placeholders with an optional converter:
//!
//! | placeholder      | matches                    |
//! |------------------|----------------------------|
//! | `{name}`         | one segment (no `/`)       |
//! | `{name:int}`     | ASCII digits               |
//! | `{name:slug}`    | letters, digits, `-`, `_`  |
//! | `{name:*}`       | the rest of the path       |
//!
//! Routers can be nested under a prefix and a namespace, so the route
//! `detail` inside the `blog` router is reversed as `blog:detail`.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Handler, Request, Response};
use blogicum_core::{Error, Result};

/// Characters escaped when a value is substituted into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}')
	.add(b'/')
	.add(b'%');

/// Maximum allowed length for a URL pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Converter {
	Str,
	Int,
	Slug,
	Path,
}

impl Converter {
	fn parse(name: &str) -> std::result::Result<Self, String> {
		match name {
			"" | "str" => Ok(Converter::Str),
			"int" => Ok(Converter::Int),
			"slug" => Ok(Converter::Slug),
			"*" | "path" => Ok(Converter::Path),
			other => Err(format!("unknown path converter `{}`", other)),
		}
	}

	fn regex(&self) -> &'static str {
		match self {
			Converter::Str => "[^/]+",
			Converter::Int => "[0-9]+",
			Converter::Slug => "[-a-zA-Z0-9_]+",
			Converter::Path => ".+",
		}
	}
}

/// A compiled path pattern such as `/posts/{post_id:int}/`.
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	regex: regex::Regex,
	params: Vec<(String, Converter)>,
}

impl PathPattern {
	/// Compiles a pattern.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_http::PathPattern;
	///
	/// let pattern = PathPattern::new("/posts/{post_id:int}/edit/").unwrap();
	/// let params = pattern.matches("/posts/42/edit/").unwrap();
	/// assert_eq!(params.get("post_id").map(String::as_str), Some("42"));
	/// assert!(pattern.matches("/posts/abc/edit/").is_none());
	/// ```
	pub fn new(pattern: &str) -> std::result::Result<Self, String> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(format!(
				"Pattern length {} exceeds maximum allowed length of {} bytes",
				pattern.len(),
				MAX_PATTERN_LENGTH
			));
		}

		let mut regex_str = String::from("^");
		let mut params = Vec::new();
		let mut rest = pattern;

		while let Some(start) = rest.find('{') {
			regex_str.push_str(&regex::escape(&rest[..start]));
			let after = &rest[start + 1..];
			let end = after
				.find('}')
				.ok_or_else(|| format!("unclosed placeholder in `{}`", pattern))?;
			let placeholder = &after[..end];
			let (name, converter) = match placeholder.split_once(':') {
				Some((name, conv)) => (name, Converter::parse(conv)?),
				None => (placeholder, Converter::Str),
			};
			if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
				return Err(format!("invalid parameter name `{}`", name));
			}
			regex_str.push_str(&format!("(?P<{}>{})", name, converter.regex()));
			params.push((name.to_string(), converter));
			rest = &after[end + 1..];
		}
		regex_str.push_str(&regex::escape(rest));
		regex_str.push('$');

		let regex = regex::Regex::new(&regex_str)
			.map_err(|e| format!("Failed to compile pattern regex: {}", e))?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			params,
		})
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn param_names(&self) -> impl Iterator<Item = &str> {
		self.params.iter().map(|(name, _)| name.as_str())
	}

	/// Matches `path`, returning percent-decoded parameters.
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let caps = self.regex.captures(path)?;
		let mut out = HashMap::new();
		for (name, _) in &self.params {
			let raw = caps.name(name)?.as_str();
			out.insert(
				name.clone(),
				percent_decode_str(raw).decode_utf8_lossy().into_owned(),
			);
		}
		Some(out)
	}

	/// Builds a path from parameter values. Returns `None` when a parameter is
	/// missing or its value does not satisfy the converter.
	///
	/// ```
	/// use blogicum_http::PathPattern;
	///
	/// let pattern = PathPattern::new("/profile/{username}/").unwrap();
	/// assert_eq!(
	///     pattern.reverse(&[("username", "анна")]).as_deref(),
	///     Some("/profile/%D0%B0%D0%BD%D0%BD%D0%B0/")
	/// );
	/// ```
	pub fn reverse(&self, params: &[(&str, &str)]) -> Option<String> {
		let mut result = self.pattern.clone();
		for (name, converter) in &self.params {
			let value = params.iter().find(|(k, _)| k == name).map(|(_, v)| *v)?;
			let valid = match converter {
				Converter::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
				Converter::Slug => {
					!value.is_empty()
						&& value
							.bytes()
							.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
				}
				Converter::Str | Converter::Path => !value.is_empty(),
			};
			if !valid {
				return None;
			}
			let encoded = match converter {
				Converter::Path => value
					.split('/')
					.map(|seg| utf8_percent_encode(seg, SEGMENT).to_string())
					.collect::<Vec<_>>()
					.join("/"),
				_ => utf8_percent_encode(value, SEGMENT).to_string(),
			};
			let placeholder = self
				.pattern
				.split('{')
				.skip(1)
				.filter_map(|s| s.split_once('}').map(|(inner, _)| inner))
				.find(|inner| inner.split(':').next() == Some(name.as_str()))?;
			result = result.replace(&format!("{{{}}}", placeholder), &encoded);
		}
		Some(result)
	}
}

/// A pattern bound to a handler, optionally named for reversing.
#[derive(Clone)]
pub struct Route {
	pub pattern: PathPattern,
	pub name: Option<String>,
	pub handler: Arc<dyn Handler>,
}

/// Name to pattern lookup shared with views and templates.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
	names: Arc<HashMap<String, PathPattern>>,
}

impl UrlResolver {
	/// Reverses a named route.
	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
		self.names
			.get(name)
			.and_then(|p| p.reverse(params))
			.ok_or_else(|| Error::Internal(format!("Reverse for `{}` not found", name)))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.names.keys().map(String::as_str)
	}
}

pub struct Router {
	namespace: Option<String>,
	routes: Vec<Route>,
	append_slash: bool,
}

impl Default for Router {
	fn default() -> Self {
		Self::new()
	}
}

impl Router {
	pub fn new() -> Self {
		Self {
			namespace: None,
			routes: Vec::new(),
			append_slash: true,
		}
	}

	/// Namespace prefixed to route names when this router is included.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	/// Whether `/path` should redirect to `/path/` when only the latter
	/// matches. On by default.
	pub fn with_append_slash(mut self, enabled: bool) -> Self {
		self.append_slash = enabled;
		self
	}

	/// Registers a route. Fails when the pattern does not compile.
	pub fn route(
		mut self,
		pattern: &str,
		name: Option<&str>,
		handler: Arc<dyn Handler>,
	) -> std::result::Result<Self, String> {
		self.routes.push(Route {
			pattern: PathPattern::new(pattern)?,
			name: name.map(str::to_string),
			handler,
		});
		Ok(self)
	}

	/// Mounts every route of `child` under `prefix`. Route names get the
	/// child's namespace, if any.
	pub fn include(mut self, prefix: &str, child: Router) -> std::result::Result<Self, String> {
		let prefix = prefix.trim_end_matches('/');
		for route in child.routes {
			let pattern = PathPattern::new(&format!("{}{}", prefix, route.pattern.pattern()))?;
			let name = match (&child.namespace, route.name) {
				(Some(ns), Some(name)) => Some(format!("{}:{}", ns, name)),
				(None, name) => name,
				(Some(_), None) => None,
			};
			self.routes.push(Route {
				pattern,
				name,
				handler: route.handler,
			});
		}
		Ok(self)
	}

	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	pub fn resolver(&self) -> UrlResolver {
		let names = self
			.routes
			.iter()
			.filter_map(|r| r.name.clone().map(|n| (n, r.pattern.clone())))
			.collect();
		UrlResolver {
			names: Arc::new(names),
		}
	}

	/// First route whose pattern matches `path`.
	pub fn resolve(&self, path: &str) -> Option<(&Route, HashMap<String, String>)> {
		self.routes
			.iter()
			.find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let path = request.path().to_string();

		if let Some((route, params)) = self.resolve(&path) {
			request.path_params.extend(params);
			return route.handler.handle(request).await;
		}

		if self.append_slash && !path.ends_with('/') {
			let with_slash = format!("{}/", path);
			if self.resolve(&with_slash).is_some() {
				let location = match request.uri.query() {
					Some(q) => format!("{}?{}", with_slash, q),
					None => with_slash,
				};
				return Ok(Response::permanent_redirect(location));
			}
		}

		Err(Error::NotFound(format!("No route matches `{}`", path)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::handler_fn;
	use hyper::StatusCode;
	use rstest::rstest;

	async fn echo(request: Request) -> Result<Response> {
		let mut params: Vec<_> = request
			.path_params
			.iter()
			.map(|(k, v)| format!("{}={}", k, v))
			.collect();
		params.sort();
		Ok(Response::ok().with_body(params.join("&")))
	}

	fn blog_router() -> Router {
		Router::new()
			.with_namespace("blog")
			.route("/", Some("index"), handler_fn(echo))
			.unwrap()
			.route("/posts/{post_id:int}/", Some("post_detail"), handler_fn(echo))
			.unwrap()
			.route(
				"/posts/{post_id:int}/edit_comment/{comment_id:int}/",
				Some("edit_comment"),
				handler_fn(echo),
			)
			.unwrap()
			.route("/category/{category_slug:slug}/", Some("category_posts"), handler_fn(echo))
			.unwrap()
	}

	#[rstest]
	#[case("/posts/{id:int}/", "/posts/7/", Some(vec![("id", "7")]))]
	#[case("/posts/{id:int}/", "/posts/x/", None)]
	#[case("/category/{slug:slug}/", "/category/travel-2024/", Some(vec![("slug", "travel-2024")]))]
	#[case("/category/{slug:slug}/", "/category/a.b/", None)]
	#[case("/profile/{username}/", "/profile/%D0%B0%D0%BD%D0%BD%D0%B0/", Some(vec![("username", "анна")]))]
	#[case("/media/{path:*}", "/media/posts_images/a.png", Some(vec![("path", "posts_images/a.png")]))]
	#[case("/pages/about/", "/pages/about/", Some(vec![]))]
	#[case("/pages/about/", "/pages/about", None)]
	fn test_pattern_matching(
		#[case] pattern: &str,
		#[case] path: &str,
		#[case] expected: Option<Vec<(&str, &str)>>,
	) {
		let pattern = PathPattern::new(pattern).unwrap();
		let expected = expected.map(|pairs| {
			pairs
				.into_iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect::<HashMap<_, _>>()
		});
		assert_eq!(pattern.matches(path), expected);
	}

	#[rstest]
	fn test_literal_regex_characters_are_escaped() {
		let compiled = PathPattern::new("/a.b/").unwrap();

		assert!(compiled.matches("/aXb/").is_none());
		assert!(compiled.matches("/a.b/").is_some());
	}

	#[rstest]
	#[case("/posts/{id:float}/")]
	#[case("/posts/{id/")]
	#[case("/posts/{}/")]
	fn test_invalid_patterns(#[case] pattern: &str) {
		assert!(PathPattern::new(pattern).is_err());
	}

	#[rstest]
	fn test_reverse_with_namespace() {
		// Arrange
		let root = Router::new().include("/", blog_router()).unwrap();

		// Act
		let resolver = root.resolver();

		// Assert
		assert_eq!(resolver.reverse("blog:index", &[]).unwrap(), "/");
		assert_eq!(
			resolver
				.reverse("blog:edit_comment", &[("post_id", "3"), ("comment_id", "9")])
				.unwrap(),
			"/posts/3/edit_comment/9/"
		);
		assert!(resolver.reverse("blog:post_detail", &[("post_id", "abc")]).is_err());
		assert!(resolver.reverse("blog:missing", &[]).is_err());
	}

	#[rstest]
	fn test_include_under_prefix() {
		let users = Router::new()
			.with_namespace("users")
			.route("/registration/", Some("registration"), handler_fn(echo))
			.unwrap();
		let root = Router::new().include("/auth/", users).unwrap();

		assert_eq!(
			root.resolver().reverse("users:registration", &[]).unwrap(),
			"/auth/registration/"
		);
		assert!(root.resolve("/auth/registration/").is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_router_dispatches_with_params() {
		let router = Router::new().include("/", blog_router()).unwrap();
		let request = Request::builder()
			.uri("/posts/3/edit_comment/9/")
			.build()
			.unwrap();

		let response = router.handle(request).await.unwrap();

		assert_eq!(response.text(), "comment_id=9&post_id=3");
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_trailing_slash_redirects() {
		let router = Router::new().include("/", blog_router()).unwrap();
		let request = Request::builder().uri("/posts/3?page=2").build().unwrap();

		let response = router.handle(request).await.unwrap();

		assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
		assert_eq!(response.location(), Some("/posts/3/?page=2"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_path_is_not_found() {
		let router = Router::new().include("/", blog_router()).unwrap();
		let request = Request::builder().uri("/nope/").build().unwrap();

		let result = router.handle(request).await;

		assert!(matches!(result, Err(Error::NotFound(_))));
	}
}
