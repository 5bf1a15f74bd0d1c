//! Observable state objects.
//!
//! A [`Proxy`] wraps the properties of one component, store or item and keeps a
//! per-property list of [`Reaction`]s. Every write goes through [`Proxy::set`],
//! which runs the reactions registered for that property synchronously and in
//! registration order.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use mx_dom::Node;

use crate::class_list::{ClassList, class_tokens};
use crate::error::Result;
use crate::items::SubArray;
use crate::reaction::Reaction;
use crate::registry::Mx;
use crate::value::Value;

/// Metadata injected into item proxies, naming the array they belong to.
#[derive(Clone)]
pub struct ItemMeta {
	pub component: WeakProxy,
	pub variable: String,
	pub component_name: String,
}

impl fmt::Debug for ItemMeta {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ItemMeta")
			.field("variable", &self.variable)
			.field("component_name", &self.component_name)
			.finish()
	}
}

#[derive(Clone)]
pub struct Proxy {
	inner: Rc<ProxyInner>,
}

/// Non-owning handle, used for back references from items and listeners.
#[derive(Clone)]
pub struct WeakProxy(Weak<ProxyInner>);

impl WeakProxy {
	pub fn upgrade(&self) -> Option<Proxy> {
		self.0.upgrade().map(|inner| Proxy { inner })
	}
}

struct ProxyInner {
	name: String,
	props: RefCell<IndexMap<String, Value>>,
	reactions: RefCell<HashMap<String, Vec<Reaction>>>,
	element: RefCell<Option<Node>>,
	item_meta: RefCell<Option<ItemMeta>>,
	sub_arrays: RefCell<HashMap<String, SubArray>>,
	initialized: Cell<bool>,
}

fn is_class_source(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Array(_) | Value::ClassList(_))
}

impl Proxy {
	/// Wraps `props`. `element` is the owning element (`$el`), `None` for stores.
	pub fn new(name: &str, props: IndexMap<String, Value>, element: Option<Node>) -> Self {
		Self {
			inner: Rc::new(ProxyInner {
				name: name.to_string(),
				props: RefCell::new(props),
				reactions: RefCell::new(HashMap::new()),
				element: RefCell::new(element),
				item_meta: RefCell::new(None),
				sub_arrays: RefCell::new(HashMap::new()),
				initialized: Cell::new(false),
			}),
		}
	}

	/// Name of the definition this proxy was created from.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn ptr_eq(&self, other: &Proxy) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	pub fn downgrade(&self) -> WeakProxy {
		WeakProxy(Rc::downgrade(&self.inner))
	}

	pub fn element(&self) -> Option<Node> {
		self.inner.element.borrow().clone()
	}

	pub(crate) fn set_element(&self, element: Option<Node>) {
		*self.inner.element.borrow_mut() = element;
	}

	pub fn item_meta(&self) -> Option<ItemMeta> {
		self.inner.item_meta.borrow().clone()
	}

	pub(crate) fn set_item_meta(&self, meta: ItemMeta) {
		*self.inner.item_meta.borrow_mut() = Some(meta);
	}

	/// Reads a property. `$el` yields the owning element.
	pub fn get(&self, key: &str) -> Value {
		if key == "$el" {
			return self.element().map(Value::Element).unwrap_or(Value::Null);
		}
		self.inner
			.props
			.borrow()
			.get(key)
			.cloned()
			.unwrap_or_default()
	}

	pub fn has(&self, key: &str) -> bool {
		key == "$el" || self.inner.props.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<String> {
		self.inner.props.borrow().keys().cloned().collect()
	}

	/// Writes a property and runs its reactions with `(new, old)`.
	///
	/// A property already holding a class list or a bound sub-array is updated
	/// in place so the DOM binding survives reassignment.
	pub fn set(&self, key: &str, value: Value) {
		let old = self.get(key);
		let stored = self.coerce(key, &old, value);
		self.inner
			.props
			.borrow_mut()
			.insert(key.to_string(), stored.clone());
		self.dispatch(key, &stored, &old);
	}

	/// Writes a property without running reactions (hydration).
	pub fn set_silent(&self, key: &str, value: Value) {
		self.inner.props.borrow_mut().insert(key.to_string(), value);
	}

	/// Re-runs the reactions of `key` with its current value.
	pub fn notify(&self, key: &str) {
		let value = self.get(key);
		self.dispatch(key, &value, &value);
	}

	fn coerce(&self, key: &str, old: &Value, value: Value) -> Value {
		if let Value::ClassList(list) = old {
			if is_class_source(&value) && !value.strict_eq(old) {
				list.assign(&value);
				return old.clone();
			}
		}
		if let Some(sub_array) = self.sub_array(key) {
			if let Some(values) = value.list_values() {
				sub_array.assign(values);
				return if sub_array.is_empty() {
					Value::Null
				} else {
					Value::SubArray(sub_array)
				};
			}
		}
		if matches!(value, Value::String(_) | Value::Array(_)) {
			if let Some(element) = self.class_reaction_element(key) {
				return Value::ClassList(ClassList::bound(&element, class_tokens(&value)));
			}
		}
		value
	}

	fn class_reaction_element(&self, key: &str) -> Option<Node> {
		self.inner
			.reactions
			.borrow()
			.get(key)?
			.iter()
			.find_map(|reaction| match reaction {
				Reaction::Dom(dom) if reaction.is_class() => Some(dom.element.clone()),
				_ => None,
			})
	}

	fn dispatch(&self, key: &str, new: &Value, old: &Value) {
		let reactions = self.reactions(key);
		for reaction in reactions {
			reaction.run(new, old);
		}
	}

	pub fn register_reaction(&self, key: &str, reaction: Reaction) {
		self.inner
			.reactions
			.borrow_mut()
			.entry(key.to_string())
			.or_default()
			.push(reaction);
	}

	pub fn reactions(&self, key: &str) -> Vec<Reaction> {
		self.inner
			.reactions
			.borrow()
			.get(key)
			.cloned()
			.unwrap_or_default()
	}

	/// Drops every reaction (the component is being destroyed).
	pub(crate) fn clear_reactions(&self) {
		self.inner.reactions.borrow_mut().clear();
	}

	pub(crate) fn bind_sub_array(&self, key: &str, sub_array: SubArray) {
		self.inner
			.sub_arrays
			.borrow_mut()
			.insert(key.to_string(), sub_array);
	}

	pub fn sub_array(&self, key: &str) -> Option<SubArray> {
		self.inner.sub_arrays.borrow().get(key).cloned()
	}

	/// Returns the nested proxy at `key`, promoting a plain object in place.
	pub fn child(&self, key: &str) -> Option<Proxy> {
		match self.get(key) {
			Value::Proxy(proxy) => Some(proxy),
			Value::Object(object) => {
				let props = object.borrow().clone();
				let proxy = Proxy::new(key, props, self.element());
				self.set_silent(key, Value::Proxy(proxy.clone()));
				Some(proxy)
			}
			_ => None,
		}
	}

	pub(crate) fn is_initialized(&self) -> bool {
		self.inner.initialized.get()
	}

	pub(crate) fn mark_initialized(&self) {
		self.inner.initialized.set(true);
	}

	/// Calls method `name` with `this` bound to the proxy. `None` if there is no such method.
	pub fn call(&self, mx: &Mx, name: &str, args: &[Value]) -> Option<Result<Value>> {
		match self.get(name) {
			Value::Function(function) => Some(function.call(mx, &Value::Proxy(self.clone()), args)),
			_ => None,
		}
	}

	/// Plain data view of the properties, methods omitted.
	pub fn to_json(&self) -> serde_json::Value {
		let props = self.inner.props.borrow().clone();
		serde_json::Value::Object(
			props
				.iter()
				.filter(|(_, value)| !matches!(value, Value::Function(_)))
				.map(|(key, value)| (key.clone(), value.to_json()))
				.collect(),
		)
	}
}

impl fmt::Debug for Proxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Proxy")
			.field("name", &self.inner.name)
			.field("props", &self.to_json())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reaction::{DomReaction, ReactionKind};
	use mx_dom::Document;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn document() -> Document {
		Document::from_body(r#"<span id="a"></span><span id="b"></span>"#)
	}

	fn proxy() -> Proxy {
		Proxy::new("counter", IndexMap::new(), None)
	}

	#[rstest]
	fn test_reactions_fire_in_registration_order_with_old_value() {
		let proxy = proxy();
		proxy.set_silent("count", Value::Number(1.0));
		let log = Rc::new(RefCell::new(Vec::new()));
		for label in ["first", "second"] {
			let sink = log.clone();
			proxy.register_reaction(
				"count",
				Reaction::effect(move |new, old| {
					sink.borrow_mut().push(format!("{label}:{new}:{old}"));
				}),
			);
		}

		proxy.set("count", Value::Number(2.0));
		assert_eq!(*log.borrow(), vec!["first:2:1", "second:2:1"]);
	}

	#[rstest]
	fn test_set_without_reactions_updates_silently() {
		let proxy = proxy();
		proxy.set("name", Value::from("Ada"));
		assert_eq!(proxy.get("name"), Value::from("Ada"));
		assert_eq!(proxy.get("missing"), Value::Undefined);
	}

	#[rstest]
	fn test_dom_reactions_update_every_bound_element(document: Document) {
		let proxy = proxy();
		for id in ["a", "b"] {
			let element = document.get_element_by_id(id).unwrap();
			proxy.register_reaction("label", Reaction::Dom(DomReaction::new(element, ReactionKind::Text)));
		}
		proxy.set("label", Value::from("hello"));
		assert_eq!(document.body().text_content(), "hellohello");
	}

	#[rstest]
	fn test_string_is_promoted_to_class_list(document: Document) {
		let element = document.get_element_by_id("a").unwrap();
		let proxy = proxy();
		proxy.register_reaction("classes", Reaction::Dom(DomReaction::new(element.clone(), ReactionKind::Class)));

		proxy.set("classes", Value::from("btn primary"));
		let list = proxy.get("classes").as_class_list().cloned().unwrap();
		assert_eq!(element.class_name(), "btn primary");

		proxy.set("classes", Value::from(json!(["btn", "active"])));
		assert!(proxy.get("classes").as_class_list().unwrap().ptr_eq(&list));
		assert_eq!(element.class_list(), vec!["btn", "active"]);
	}

	#[rstest]
	fn test_el_is_exposed(document: Document) {
		let element = document.get_element_by_id("a").unwrap();
		let proxy = Proxy::new("widget", IndexMap::new(), Some(element.clone()));
		assert_eq!(proxy.get("$el"), Value::Element(element));
		assert_eq!(Proxy::new("store", IndexMap::new(), None).get("$el"), Value::Null);
	}

	#[rstest]
	fn test_child_promotes_plain_objects() {
		let proxy = Proxy::new("app", IndexMap::new(), None);
		proxy.set_silent("user", Value::from(json!({"name": "Ada"})));
		let child = proxy.child("user").unwrap();
		child.set("name", Value::from("Grace"));
		assert_eq!(proxy.to_json(), json!({"user": {"name": "Grace"}}));
	}
}
