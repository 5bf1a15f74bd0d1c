//! Session history.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use url::Url;

use crate::document::Document;
use crate::error::DomError;
use crate::event::Event;

/// One session history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
	pub state: Option<serde_json::Value>,
	pub title: String,
	pub url: Url,
}

struct HistoryInner {
	entries: Vec<HistoryEntry>,
	index: usize,
}

/// `window.history`. Traversal dispatches `popstate` on the window synchronously.
#[derive(Clone)]
pub struct History {
	document: Document,
	inner: Rc<RefCell<HistoryInner>>,
}

impl History {
	pub(crate) fn new(document: Document, url: Url) -> Self {
		Self {
			document,
			inner: Rc::new(RefCell::new(HistoryInner {
				entries: vec![HistoryEntry {
					state: None,
					title: String::new(),
					url,
				}],
				index: 0,
			})),
		}
	}

	fn resolve(&self, url: Option<&str>) -> Result<Url, DomError> {
		let current = self.location();
		match url {
			None => Ok(current),
			Some(url) => current
				.join(url)
				.map_err(|_| DomError::InvalidUrl(url.to_string())),
		}
	}

	/// Adds an entry after the current one, dropping any forward entries.
	pub fn push_state(&self, state: Option<serde_json::Value>, title: &str, url: Option<&str>) -> Result<(), DomError> {
		let url = self.resolve(url)?;
		let mut inner = self.inner.borrow_mut();
		let keep = inner.index + 1;
		inner.entries.truncate(keep);
		inner.entries.push(HistoryEntry {
			state,
			title: title.to_string(),
			url,
		});
		inner.index = keep;
		Ok(())
	}

	/// Overwrites the current entry.
	pub fn replace_state(&self, state: Option<serde_json::Value>, title: &str, url: Option<&str>) -> Result<(), DomError> {
		let url = self.resolve(url)?;
		let mut inner = self.inner.borrow_mut();
		let index = inner.index;
		inner.entries[index] = HistoryEntry {
			state,
			title: title.to_string(),
			url,
		};
		Ok(())
	}

	/// State of the current entry.
	pub fn state(&self) -> Option<serde_json::Value> {
		let inner = self.inner.borrow();
		inner.entries[inner.index].state.clone()
	}

	pub fn length(&self) -> usize {
		self.inner.borrow().entries.len()
	}

	pub fn index(&self) -> usize {
		self.inner.borrow().index
	}

	pub fn location(&self) -> Url {
		let inner = self.inner.borrow();
		inner.entries[inner.index].url.clone()
	}

	pub fn entries(&self) -> Vec<HistoryEntry> {
		self.inner.borrow().entries.clone()
	}

	pub fn back(&self) {
		self.go(-1);
	}

	pub fn forward(&self) {
		self.go(1);
	}

	/// Moves `delta` entries and fires `popstate`. Out-of-range moves are ignored.
	pub fn go(&self, delta: isize) {
		let state = {
			let mut inner = self.inner.borrow_mut();
			let Some(target) = inner.index.checked_add_signed(delta) else {
				return;
			};
			if delta == 0 || target >= inner.entries.len() {
				return;
			}
			inner.index = target;
			inner.entries[target].state.clone()
		};
		let event = Event::builder("popstate").bubbles(false).state(state).build();
		self.document.dispatch_window_event(&event);
	}
}

impl fmt::Debug for History {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("History")
			.field("index", &inner.index)
			.field("entries", &inner.entries)
			.finish()
	}
}
