//! Type-keyed storage attached to a request.
//!
//! Middleware uses it to hand values (the session, the current user, the
//! CSRF token) down to views without widening the `Request` struct.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, replacing any earlier value of the same type.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(42u32);
	/// extensions.insert(7u32);
	///
	/// assert_eq!(extensions.get::<u32>(), Some(7));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		self.map.lock().insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Get a cloned value from extensions
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		self.map
			.lock()
			.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		self.map.lock().contains_key(&TypeId::of::<T>())
	}

	pub fn remove<T>(&self) -> Option<T>
	where
		T: Send + Sync + 'static,
	{
		let mut map = self.map.lock();
		let boxed = map.remove(&TypeId::of::<T>())?;
		match boxed.downcast::<T>() {
			Ok(val) => Some(*val),
			Err(boxed) => {
				map.insert(TypeId::of::<T>(), boxed);
				None
			}
		}
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extensions")
			.field("len", &self.map.lock().len())
			.finish()
	}
}
