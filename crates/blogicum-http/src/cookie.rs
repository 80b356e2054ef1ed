//! `Set-Cookie` construction and `Cookie` header parsing.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
	Strict,
	Lax,
	None,
}

impl SameSite {
	fn as_str(&self) -> &'static str {
		match self {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		}
	}
}

/// A cookie to be sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
	pub name: String,
	pub value: String,
	pub path: String,
	/// Lifetime in seconds. `None` makes a browser-session cookie.
	pub max_age: Option<i64>,
	pub http_only: bool,
	pub secure: bool,
	pub same_site: Option<SameSite>,
}

impl Cookie {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			path: "/".to_string(),
			max_age: None,
			http_only: false,
			secure: false,
			same_site: Some(SameSite::Lax),
		}
	}

	/// Cookie that instructs the browser to drop `name` immediately.
	pub fn removal(name: impl Into<String>) -> Self {
		Self::new(name, "").with_max_age(0)
	}

	pub fn with_max_age(mut self, seconds: i64) -> Self {
		self.max_age = Some(seconds);
		self
	}

	pub fn with_http_only(mut self, http_only: bool) -> Self {
		self.http_only = http_only;
		self
	}

	pub fn with_secure(mut self, secure: bool) -> Self {
		self.secure = secure;
		self
	}

	pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
		self.same_site = same_site;
		self
	}

	/// Renders the `Set-Cookie` header value.
	///
	/// ```
	/// use blogicum_http::Cookie;
	///
	/// let cookie = Cookie::new("sessionid", "abc").with_http_only(true).with_max_age(60);
	/// assert_eq!(
	///     cookie.to_header_value(),
	///     "sessionid=abc; Path=/; Max-Age=60; HttpOnly; SameSite=Lax"
	/// );
	/// ```
	pub fn to_header_value(&self) -> String {
		let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
		if let Some(max_age) = self.max_age {
			out.push_str(&format!("; Max-Age={}", max_age));
		}
		if self.http_only {
			out.push_str("; HttpOnly");
		}
		if self.secure {
			out.push_str("; Secure");
		}
		if let Some(same_site) = self.same_site {
			out.push_str("; SameSite=");
			out.push_str(same_site.as_str());
		}
		out
	}
}

/// Parses a `Cookie` request header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
	header
		.split(';')
		.filter_map(|pair| {
			let (name, value) = pair.trim().split_once('=')?;
			let name = name.trim();
			if name.is_empty() {
				return None;
			}
			Some((name.to_string(), value.trim().trim_matches('"').to_string()))
		})
		.collect()
}

/// Parses `Set-Cookie` header values into name/value pairs, ignoring
/// attributes. Cookies with `Max-Age=0` map to `None`.
pub fn parse_set_cookie(header: &str) -> Option<(String, Option<String>)> {
	let mut parts = header.split(';');
	let (name, value) = parts.next()?.trim().split_once('=')?;
	let expired = parts
		.map(str::trim)
		.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
	Some((
		name.to_string(),
		if expired { None } else { Some(value.to_string()) },
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_cookie_header() {
		let cookies = parse_cookie_header("sessionid=abc; csrftoken=\"xyz\"; empty=");

		assert_eq!(cookies.get("sessionid").map(String::as_str), Some("abc"));
		assert_eq!(cookies.get("csrftoken").map(String::as_str), Some("xyz"));
		assert_eq!(cookies.get("empty").map(String::as_str), Some(""));
	}

	#[rstest]
	#[case("sessionid=abc; Path=/; HttpOnly", Some(("sessionid", Some("abc"))))]
	#[case("sessionid=; Path=/; Max-Age=0", Some(("sessionid", None)))]
	#[case("garbage", None)]
	fn test_parse_set_cookie(#[case] header: &str, #[case] expected: Option<(&str, Option<&str>)>) {
		let parsed = parse_set_cookie(header);
		let expected = expected.map(|(n, v)| (n.to_string(), v.map(str::to_string)));
		assert_eq!(parsed, expected);
	}

	#[rstest]
	fn test_removal_cookie() {
		let cookie = Cookie::removal("sessionid");
		assert_eq!(
			cookie.to_header_value(),
			"sessionid=; Path=/; Max-Age=0; SameSite=Lax"
		);
	}
}
