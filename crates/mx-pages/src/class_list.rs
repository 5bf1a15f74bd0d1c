//! Array-like view over an element's `class` attribute.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mx_dom::Node;

use crate::value::Value;

/// Class tokens mirrored onto an element.
///
/// Every mutation rewrites the element's `class` attribute, so the tokens and
/// `element.classList` never diverge. Tokens are deduplicated and keep the order
/// in which they were added.
#[derive(Clone)]
pub struct ClassList {
	inner: Rc<RefCell<ClassListInner>>,
}

struct ClassListInner {
	element: Option<Node>,
	tokens: Vec<String>,
}

/// Splits a class string or array-like value into tokens, dropping falsy entries.
pub fn class_tokens(value: &Value) -> Vec<String> {
	let raw: Vec<String> = match value {
		Value::String(s) => s.split_ascii_whitespace().map(str::to_string).collect(),
		Value::ClassList(list) => list.tokens(),
		other => match other.list_values() {
			Some(values) => values
				.iter()
				.filter(|value| value.truthy())
				.flat_map(|value| {
					value
						.to_js_string()
						.split_ascii_whitespace()
						.map(str::to_string)
						.collect::<Vec<_>>()
				})
				.collect(),
			None if other.truthy() => vec![other.to_js_string()],
			None => Vec::new(),
		},
	};
	dedup(raw)
}

fn dedup(tokens: Vec<String>) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(tokens.len());
	for token in tokens {
		if !token.is_empty() && !out.contains(&token) {
			out.push(token);
		}
	}
	out
}

impl ClassList {
	/// Binds `tokens` to `element`, writing them through immediately.
	pub fn bound(element: &Node, tokens: Vec<String>) -> Self {
		let list = Self {
			inner: Rc::new(RefCell::new(ClassListInner {
				element: Some(element.clone()),
				tokens: dedup(tokens),
			})),
		};
		list.sync();
		list
	}

	/// Reads the element's current classes without rewriting them.
	pub fn from_element(element: &Node) -> Self {
		Self {
			inner: Rc::new(RefCell::new(ClassListInner {
				element: Some(element.clone()),
				tokens: element.class_list(),
			})),
		}
	}

	pub fn element(&self) -> Option<Node> {
		self.inner.borrow().element.clone()
	}

	pub fn ptr_eq(&self, other: &ClassList) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn sync(&self) {
		let (element, value) = {
			let inner = self.inner.borrow();
			(inner.element.clone(), inner.tokens.join(" "))
		};
		if let Some(element) = element {
			element.set_class_name(&value);
		}
	}

	pub fn tokens(&self) -> Vec<String> {
		self.inner.borrow().tokens.clone()
	}

	/// Space separated tokens, as `className`.
	pub fn value(&self) -> String {
		self.inner.borrow().tokens.join(" ")
	}

	pub fn len(&self) -> usize {
		self.inner.borrow().tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<String> {
		self.inner.borrow().tokens.get(index).cloned()
	}

	pub fn contains(&self, token: &str) -> bool {
		self.inner.borrow().tokens.iter().any(|existing| existing == token)
	}

	pub fn add(&self, tokens: &[&str]) {
		{
			let mut inner = self.inner.borrow_mut();
			for token in tokens {
				if !token.is_empty() && !inner.tokens.iter().any(|existing| existing == token) {
					inner.tokens.push(token.to_string());
				}
			}
		}
		self.sync();
	}

	pub fn remove(&self, tokens: &[&str]) {
		self.inner
			.borrow_mut()
			.tokens
			.retain(|existing| !tokens.contains(&existing.as_str()));
		self.sync();
	}

	/// Toggles `token` (or forces it). Returns whether it is present afterwards.
	pub fn toggle(&self, token: &str, force: Option<bool>) -> bool {
		let wanted = force.unwrap_or(!self.contains(token));
		if wanted {
			self.add(&[token]);
		} else {
			self.remove(&[token]);
		}
		wanted
	}

	/// Replaces `old` with `new` in place. Returns whether `old` was present.
	pub fn replace(&self, old: &str, new: &str) -> bool {
		let replaced = {
			let mut inner = self.inner.borrow_mut();
			match inner.tokens.iter().position(|existing| existing == old) {
				Some(index) => {
					if inner.tokens.iter().any(|existing| existing == new) {
						inner.tokens.remove(index);
					} else {
						inner.tokens[index] = new.to_string();
					}
					true
				}
				None => false,
			}
		};
		if replaced {
			self.sync();
		}
		replaced
	}

	/// Replaces the whole contents from a string or array-like value.
	pub fn assign(&self, value: &Value) {
		let tokens = class_tokens(value);
		self.inner.borrow_mut().tokens = tokens;
		self.sync();
	}

	pub fn clear(&self) {
		self.inner.borrow_mut().tokens.clear();
		self.sync();
	}
}

impl fmt::Debug for ClassList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ClassList").field(&self.tokens()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mx_dom::Document;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn element() -> Node {
		let document = Document::from_body(r#"<div class="card"></div>"#);
		document.body().first_child().unwrap()
	}

	#[rstest]
	fn test_mutations_write_through(element: Node) {
		let list = ClassList::from_element(&element);
		list.add(&["active", "card"]);
		assert_eq!(element.class_name(), "card active");
		list.toggle("card", None);
		assert_eq!(element.class_name(), "active");
		assert!(list.replace("active", "done"));
		assert_eq!(element.class_list(), list.tokens());
	}

	#[rstest]
	fn test_assign_accepts_strings_and_arrays(element: Node) {
		let list = ClassList::from_element(&element);
		list.assign(&Value::from("a  b a"));
		assert_eq!(list.tokens(), vec!["a", "b"]);
		list.assign(&Value::from(json!(["x", null, false, "y", "x"])));
		assert_eq!(element.class_name(), "x y");
	}
}
