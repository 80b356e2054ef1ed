//! Page-number pagination.
//!
//! The paginator never loads the whole result set: callers first count the
//! matching rows, ask the paginator for a [`PageWindow`] (lenient page lookup
//! that mirrors Django's `Paginator.get_page`), fetch that window with
//! `LIMIT/OFFSET`, and wrap the rows into a [`Page`].
//!
//! ```
//! use blogicum_core::pagination::Paginator;
//!
//! let paginator = Paginator::new(10);
//! let window = paginator.window(25, Some("7"));
//! // Out of range page numbers fall back to the last page
//! assert_eq!(window.number, 3);
//! assert_eq!(window.offset, 20);
//! assert_eq!(window.limit, 10);
//! ```

use serde::Serialize;

/// Query parameter that carries the page number.
pub const PAGE_QUERY_PARAM: &str = "page";

/// Error raised by strict page number validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPage {
	#[error("That page number is not an integer")]
	NotAnInteger,
	#[error("That page number is less than 1")]
	LessThanOne,
	#[error("That page contains no results")]
	Empty,
}

/// Slice of the result set that belongs to one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	/// 1-based page number
	pub number: usize,
	pub num_pages: usize,
	pub count: usize,
	pub offset: usize,
	pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct Paginator {
	per_page: usize,
	last_page_strings: Vec<String>,
}

impl Paginator {
	/// Creates a paginator that puts `per_page` items on each page.
	///
	/// A `per_page` of zero is treated as one.
	pub fn new(per_page: usize) -> Self {
		Self {
			per_page: per_page.max(1),
			last_page_strings: vec!["last".to_string()],
		}
	}

	pub fn per_page(&self) -> usize {
		self.per_page
	}

	/// Number of pages needed for `count` items. An empty result set still
	/// has one (empty) page.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_core::pagination::Paginator;
	///
	/// let paginator = Paginator::new(10);
	/// assert_eq!(paginator.num_pages(0), 1);
	/// assert_eq!(paginator.num_pages(10), 1);
	/// assert_eq!(paginator.num_pages(11), 2);
	/// ```
	pub fn num_pages(&self, count: usize) -> usize {
		if count == 0 {
			1
		} else {
			count.div_ceil(self.per_page)
		}
	}

	/// Strictly validates a page number against `count` items.
	pub fn validate_number(&self, page: &str, count: usize) -> Result<usize, InvalidPage> {
		let num_pages = self.num_pages(count);
		let page = page.trim();

		if self.last_page_strings.iter().any(|s| s == page) {
			return Ok(num_pages);
		}

		let number = page
			.parse::<i64>()
			.map_err(|_| InvalidPage::NotAnInteger)?;

		if number < 1 {
			return Err(InvalidPage::LessThanOne);
		}
		let number = number as usize;
		if number > num_pages {
			return Err(InvalidPage::Empty);
		}
		Ok(number)
	}

	/// Lenient lookup: a missing or malformed page number yields the first
	/// page, a number past the end yields the last page.
	pub fn window(&self, count: usize, page: Option<&str>) -> PageWindow {
		let num_pages = self.num_pages(count);
		let number = match page {
			None => 1,
			Some(raw) => match self.validate_number(raw, count) {
				Ok(n) => n,
				Err(InvalidPage::Empty) => num_pages,
				Err(_) => 1,
			},
		};

		PageWindow {
			number,
			num_pages,
			count,
			offset: (number - 1) * self.per_page,
			limit: self.per_page,
		}
	}
}

/// One page of results, ready for template rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
	pub object_list: Vec<T>,
	pub number: usize,
	pub num_pages: usize,
	pub count: usize,
	pub per_page: usize,
	pub has_next: bool,
	pub has_previous: bool,
	pub next_page_number: Option<usize>,
	pub previous_page_number: Option<usize>,
	pub page_range: Vec<Option<usize>>,
}

impl<T> Page<T> {
	/// Wraps the rows fetched for `window`.
	pub fn new(object_list: Vec<T>, window: PageWindow) -> Self {
		let has_next = window.number < window.num_pages;
		let has_previous = window.number > 1;
		let mut page = Self {
			object_list,
			number: window.number,
			num_pages: window.num_pages,
			count: window.count,
			per_page: window.limit,
			has_next,
			has_previous,
			next_page_number: has_next.then(|| window.number + 1),
			previous_page_number: has_previous.then(|| window.number - 1),
			page_range: Vec::new(),
		};
		page.page_range = page.elided_page_range(3, 2);
		page
	}

	/// 1-based index of the first item on this page, 0 when empty.
	pub fn start_index(&self) -> usize {
		if self.object_list.is_empty() {
			0
		} else {
			(self.number - 1) * self.per_page + 1
		}
	}

	/// 1-based index of the last item on this page, 0 when empty.
	pub fn end_index(&self) -> usize {
		if self.object_list.is_empty() {
			0
		} else {
			self.start_index() + self.object_list.len() - 1
		}
	}

	/// Converts the rows while keeping the page metadata.
	///
	/// ```
	/// use blogicum_core::pagination::{Page, Paginator};
	///
	/// let window = Paginator::new(2).window(3, Some("2"));
	/// let page = Page::new(vec![3], window).map(|n| n * 10);
	/// assert_eq!(page.object_list, vec![30]);
	/// assert_eq!(page.number, 2);
	/// ```
	pub fn map<U, F>(self, f: F) -> Page<U>
	where
		F: FnMut(T) -> U,
	{
		Page {
			object_list: self.object_list.into_iter().map(f).collect(),
			number: self.number,
			num_pages: self.num_pages,
			count: self.count,
			per_page: self.per_page,
			has_next: self.has_next,
			has_previous: self.has_previous,
			next_page_number: self.next_page_number,
			previous_page_number: self.previous_page_number,
			page_range: self.page_range,
		}
	}

	pub fn has_other_pages(&self) -> bool {
		self.has_previous || self.has_next
	}

	pub fn len(&self) -> usize {
		self.object_list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.object_list.is_empty()
	}

	/// Page numbers with `None` standing for an ellipsis, like Django's
	/// `get_elided_page_range`.
	pub fn elided_page_range(&self, on_each_side: usize, on_ends: usize) -> Vec<Option<usize>> {
		let needed_pages = on_each_side * 2 + 1 + on_ends * 2;
		if self.num_pages <= needed_pages {
			return (1..=self.num_pages).map(Some).collect();
		}

		let mut result = Vec::new();

		let left = self.number.saturating_sub(on_each_side).max(1);
		if left > on_ends + 1 {
			result.extend((1..=on_ends).map(Some));
			result.push(None);
			result.extend((left..=self.number).map(Some));
		} else {
			result.extend((1..=self.number).map(Some));
		}

		let right = (self.number + on_each_side).min(self.num_pages);
		if right + on_ends < self.num_pages {
			result.extend((self.number + 1..=right).map(Some));
			result.push(None);
			result.extend((self.num_pages - on_ends + 1..=self.num_pages).map(Some));
		} else {
			result.extend((self.number + 1..=self.num_pages).map(Some));
		}

		result
	}
}
