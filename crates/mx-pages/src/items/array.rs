//! Observable item arrays.
//!
//! An [`ItemArray`] owns the item proxies of one `mx-item` collection and is the
//! only mutation surface for it. Each method comes in two flavours:
//!
//! - `add`, `delete`, ... validate synchronously, then mutate the DOM and the
//!   backing array on the next microtask. Code running right after the call
//!   still sees the old length.
//! - `add_now`, `delete_now`, ... (and the `async_*` wrappers) mutate before
//!   returning.
//!
//! The owning property is notified after every settled mutation, never during
//! hydration.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use mx_dom::Node;

use crate::error::{MxError, Result};
use crate::hydration;
use crate::proxy::{ItemMeta, Proxy};
use crate::registry::{Mx, WeakMx};
use crate::value::Value;
use crate::{debug_log, error_log};

use super::hydrate::build_item;

#[derive(Clone)]
pub struct ItemArray {
	inner: Rc<ItemArrayInner>,
}

struct ItemArrayInner {
	mx: WeakMx,
	meta: ItemMeta,
	items: RefCell<Vec<Proxy>>,
	/// Detached prototype cloned for every created item.
	template: RefCell<Option<Node>>,
	/// `<template mx-item>` element, new items of an empty array follow it.
	anchor: RefCell<Option<Node>>,
	parent: RefCell<Option<Node>>,
	/// Node that followed the last item when the array was emptied.
	tail: RefCell<Option<Node>>,
}

/// Props of a new item from `add(data)`.
fn item_props(data: &Value) -> IndexMap<String, Value> {
	match data {
		Value::Object(object) => object
			.borrow()
			.iter()
			.map(|(key, value)| (key.clone(), value.deep_copy()))
			.collect(),
		Value::Proxy(proxy) => proxy
			.keys()
			.into_iter()
			.map(|key| {
				let value = proxy.get(&key);
				(key, value)
			})
			.collect(),
		_ => IndexMap::new(),
	}
}

impl ItemArray {
	pub(crate) fn new(mx: &Mx, meta: ItemMeta) -> Self {
		Self {
			inner: Rc::new(ItemArrayInner {
				mx: mx.downgrade(),
				meta,
				items: RefCell::new(Vec::new()),
				template: RefCell::new(None),
				anchor: RefCell::new(None),
				parent: RefCell::new(None),
				tail: RefCell::new(None),
			}),
		}
	}

	fn mx(&self) -> Result<Mx> {
		self.inner
			.mx
			.upgrade()
			.ok_or_else(|| MxError::RuntimeDropped(self.inner.meta.variable.clone()))
	}

	pub fn meta(&self) -> &ItemMeta {
		&self.inner.meta
	}

	/// Name of the bound property.
	pub fn variable(&self) -> &str {
		&self.inner.meta.variable
	}

	pub fn has_template(&self) -> bool {
		self.inner.template.borrow().is_some()
	}

	pub(crate) fn set_template(&self, template: Node) {
		*self.inner.template.borrow_mut() = Some(template);
	}

	pub(crate) fn set_anchor(&self, anchor: &Node) {
		*self.inner.parent.borrow_mut() = anchor.parent();
		*self.inner.anchor.borrow_mut() = Some(anchor.clone());
	}

	/// Remembers where the collection lives so an emptied array can grow again.
	pub(crate) fn remember_position(&self, last: &Node) {
		if let Some(parent) = last.parent() {
			*self.inner.parent.borrow_mut() = Some(parent);
		}
		*self.inner.tail.borrow_mut() = last.next_sibling();
	}

	/// Takes over an item whose node is already in the DOM (hydration). The
	/// item lands before the first item whose node follows its own, so index
	/// order keeps matching sibling order.
	pub(crate) fn adopt(&self, item: Proxy) -> usize {
		let mut items = self.inner.items.borrow_mut();
		let index = item
			.element()
			.and_then(|node| {
				items
					.iter()
					.position(|other| other.element().is_some_and(|other| node.precedes(&other)))
			})
			.unwrap_or(items.len());
		items.insert(index, item);
		index
	}

	/// Re-reads the collection position from the current last item.
	pub(crate) fn remember_last_position(&self) {
		let last = self.inner.items.borrow().last().and_then(Proxy::element);
		if let Some(last) = last.filter(|last| last.parent().is_some()) {
			self.remember_position(&last);
		}
	}

	pub fn len(&self) -> usize {
		self.inner.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<Proxy> {
		self.inner.items.borrow().get(index).cloned()
	}

	pub fn index_of(&self, item: &Proxy) -> Option<usize> {
		self.inner
			.items
			.borrow()
			.iter()
			.position(|candidate| candidate.ptr_eq(item))
	}

	pub fn to_vec(&self) -> Vec<Proxy> {
		self.inner.items.borrow().clone()
	}

	pub fn ptr_eq(&self, other: &ItemArray) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn require_template(&self) -> Result<()> {
		if self.has_template() {
			Ok(())
		} else {
			Err(MxError::MissingTemplate(self.inner.meta.variable.clone()))
		}
	}

	fn notify(&self) {
		if let Some(owner) = self.inner.meta.component.upgrade() {
			owner.notify(&self.inner.meta.variable);
		}
	}

	/// Runs `op` on the next microtask. Failures are logged.
	fn defer(&self, op: impl FnOnce(&ItemArray) -> Result<()> + 'static) {
		let Ok(mx) = self.mx() else {
			return;
		};
		let weak: Weak<ItemArrayInner> = Rc::downgrade(&self.inner);
		let weak_mx = mx.downgrade();
		mx.event_loop().queue_microtask(move || {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let items = ItemArray { inner };
			if let Err(err) = op(&items) {
				if let Some(mx) = weak_mx.upgrade() {
					error_log!(mx, "mutation of '{}' failed: {}", items.variable(), err);
				}
			}
		});
	}

	// Placement

	fn insert_into_empty(&self, node: &Node) -> Result<()> {
		if let Some(anchor) = self.inner.anchor.borrow().clone() {
			if anchor.parent().is_some() {
				anchor.after(node)?;
				return Ok(());
			}
		}
		let parent = self
			.inner
			.parent
			.borrow()
			.clone()
			.ok_or_else(|| MxError::MissingTemplate(self.inner.meta.variable.clone()))?;
		let tail = self
			.inner
			.tail
			.borrow()
			.clone()
			.filter(|tail| tail.parent().as_ref() == Some(&parent));
		parent.insert_before(node, tail.as_ref())?;
		Ok(())
	}

	/// Inserts `node` before the node of item `before`, or after the last item.
	fn place(&self, node: &Node, before: Option<usize>) -> Result<()> {
		let reference = before.and_then(|index| self.get(index)).and_then(|item| item.element());
		if let Some(reference) = reference.filter(|reference| reference.parent().is_some()) {
			reference.before(node)?;
			return Ok(());
		}
		let last = self
			.inner
			.items
			.borrow()
			.last()
			.and_then(Proxy::element)
			.filter(|last| last.parent().is_some());
		match last {
			Some(last) => last.after(node)?,
			None => self.insert_into_empty(node)?,
		}
		Ok(())
	}

	/// Clones the template and builds the item proxy for `data`.
	fn create(&self, mx: &Mx, data: &Value) -> Result<(Proxy, Node)> {
		let template = self
			.inner
			.template
			.borrow()
			.clone()
			.ok_or_else(|| MxError::MissingTemplate(self.inner.meta.variable.clone()))?;
		let node = template.clone_node(true);
		let item = build_item(mx, &self.inner.meta, &node, Some(item_props(data)));
		Ok((item, node))
	}

	/// Creates and inserts an item at `index` (clamped to the end).
	pub(crate) fn insert_item(&self, data: &Value, index: usize, notify: bool) -> Result<Proxy> {
		let mx = self.mx()?;
		let (item, node) = self.create(&mx, data)?;
		let index = index.min(self.len());
		let before = (index < self.len()).then_some(index);
		self.place(&node, before)?;
		self.inner.items.borrow_mut().insert(index, item.clone());
		hydration::hydrate_item_node(&mx, &node, &item, true);
		debug_log!("inserted item {} into '{}'", index, self.variable());
		if notify {
			self.notify();
		}
		Ok(item)
	}

	// Immediate mutations

	pub fn add_now(&self, data: Value) -> Result<Proxy> {
		self.insert_item(&data, usize::MAX, true)
	}

	pub fn prepend_now(&self, data: Value) -> Result<Proxy> {
		self.insert_item(&data, 0, true)
	}

	pub fn insert_now(&self, data: Value, index: usize) -> Result<Proxy> {
		self.insert_item(&data, index, true)
	}

	/// Removes item `index`. `None` (and no DOM change) when out of bounds.
	pub fn delete_now(&self, index: usize) -> Option<Proxy> {
		let item = {
			let mut items = self.inner.items.borrow_mut();
			if index >= items.len() {
				return None;
			}
			items.remove(index)
		};
		if let Some(node) = item.element() {
			if index == self.len() {
				self.remember_position(&node);
			}
			node.remove();
		}
		self.notify();
		Some(item)
	}

	pub fn remove_now(&self, item: &Proxy) -> Option<Proxy> {
		let index = self.index_of(item)?;
		self.delete_now(index)
	}

	pub fn pop_now(&self) -> Option<Proxy> {
		let last = self.len().checked_sub(1)?;
		self.delete_now(last)
	}

	pub fn shift_now(&self) -> Option<Proxy> {
		self.delete_now(0)
	}

	/// Removes every item. The template and position are kept, so `add` still works.
	pub fn clear_now(&self) {
		let items = std::mem::take(&mut *self.inner.items.borrow_mut());
		if let Some(last) = items.last().and_then(Proxy::element) {
			self.remember_position(&last);
		}
		for item in &items {
			if let Some(node) = item.element() {
				node.remove();
			}
		}
		self.notify();
	}

	/// Swaps item `index` for a new one built from `data` and returns the old
	/// item. `Ok(None)` when out of bounds.
	pub fn replace_now(&self, index: usize, data: Value) -> Result<Option<Proxy>> {
		self.require_template()?;
		let Some(old) = self.get(index) else {
			return Ok(None);
		};
		let mx = self.mx()?;
		let (item, node) = self.create(&mx, &data)?;
		match old.element().filter(|old_node| old_node.parent().is_some()) {
			Some(old_node) => {
				old_node.before(&node)?;
				old_node.remove();
			}
			None => self.place(&node, None)?,
		}
		self.inner.items.borrow_mut()[index] = item.clone();
		hydration::hydrate_item_node(&mx, &node, &item, true);
		self.notify();
		Ok(Some(old))
	}

	// Deferred mutations

	/// Appends an item on the next microtask. Fails now if there is no template.
	pub fn add(&self, data: Value) -> Result<()> {
		self.require_template()?;
		self.defer(move |items| items.add_now(data).map(drop));
		Ok(())
	}

	pub fn prepend(&self, data: Value) -> Result<()> {
		self.require_template()?;
		self.defer(move |items| items.prepend_now(data).map(drop));
		Ok(())
	}

	pub fn insert(&self, data: Value, index: usize) -> Result<()> {
		self.require_template()?;
		self.defer(move |items| items.insert_now(data, index).map(drop));
		Ok(())
	}

	/// Returns the item currently at `index`; that item is removed on the next
	/// microtask. The index is resolved now, so two `delete(0)` calls in one
	/// tick name the same item and remove it once.
	pub fn delete(&self, index: usize) -> Option<Proxy> {
		let item = self.get(index)?;
		self.remove_deferred(&item);
		Some(item)
	}

	pub fn remove(&self, item: &Proxy) -> Option<Proxy> {
		self.index_of(item)?;
		self.remove_deferred(item);
		Some(item.clone())
	}

	pub fn pop(&self) -> Option<Proxy> {
		let item = self.get(self.len().checked_sub(1)?)?;
		self.remove_deferred(&item);
		Some(item)
	}

	pub fn shift(&self) -> Option<Proxy> {
		let item = self.get(0)?;
		self.remove_deferred(&item);
		Some(item)
	}

	fn remove_deferred(&self, item: &Proxy) {
		let target = item.clone();
		self.defer(move |items| {
			items.remove_now(&target);
			Ok(())
		});
	}

	pub fn clear(&self) {
		self.defer(|items| {
			items.clear_now();
			Ok(())
		});
	}

	/// Returns the item currently at `index`; that item is swapped on the next microtask.
	pub fn replace(&self, index: usize, data: Value) -> Result<Option<Proxy>> {
		self.require_template()?;
		let Some(old) = self.get(index) else {
			return Ok(None);
		};
		let target = old.clone();
		self.defer(move |items| match items.index_of(&target) {
			Some(index) => items.replace_now(index, data).map(drop),
			None => Ok(()),
		});
		Ok(Some(old))
	}

	// Awaitable mutations, settled when they resolve

	pub async fn async_add(&self, data: Value) -> Result<Proxy> {
		self.add_now(data)
	}

	pub async fn async_prepend(&self, data: Value) -> Result<Proxy> {
		self.prepend_now(data)
	}

	pub async fn async_insert(&self, data: Value, index: usize) -> Result<Proxy> {
		self.insert_now(data, index)
	}

	pub async fn async_delete(&self, index: usize) -> Option<Proxy> {
		self.delete_now(index)
	}

	pub async fn async_remove(&self, item: &Proxy) -> Option<Proxy> {
		self.remove_now(item)
	}

	pub async fn async_pop(&self) -> Option<Proxy> {
		self.pop_now()
	}

	pub async fn async_shift(&self) -> Option<Proxy> {
		self.shift_now()
	}

	pub async fn async_clear(&self) {
		self.clear_now();
	}

	pub async fn async_replace(&self, index: usize, data: Value) -> Result<Option<Proxy>> {
		self.replace_now(index, data)
	}
}

impl fmt::Debug for ItemArray {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ItemArray")
			.field("variable", &self.inner.meta.variable)
			.field("len", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StartConfig;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn mx() -> Mx {
		let mx = Mx::new();
		mx.component("todos", json!({"todos": []}));
		mx.document().body().set_inner_html(
			r#"<ul mx-data="todos"><li mx-item="todos" ::text="title">write</li><li mx-item="todos" ::text="title">test</li></ul><p id="footer"></p>"#,
		);
		mx.start(StartConfig::new().observe(false).history(false)).unwrap();
		mx
	}

	fn items(mx: &Mx) -> ItemArray {
		mx.get("todos").unwrap().get("todos").as_items().unwrap().clone()
	}

	fn titles(mx: &Mx) -> Vec<String> {
		mx.document()
			.query_selector_all("li")
			.unwrap()
			.iter()
			.map(Node::text_content)
			.collect()
	}

	#[rstest]
	fn test_add_settles_on_next_microtask(mx: Mx) {
		let todos = items(&mx);
		todos.add(Value::from_json(&json!({"title": "ship"}))).unwrap();
		assert_eq!(todos.len(), 2);
		mx.flush();
		assert_eq!(todos.len(), 3);
		assert_eq!(titles(&mx), vec!["write", "test", "ship"]);
		assert_eq!(todos.get(2).unwrap().get("title"), Value::from("ship"));
	}

	#[rstest]
	fn test_prepend_and_insert_place_nodes(mx: Mx) {
		let todos = items(&mx);
		todos.prepend_now(Value::from_json(&json!({"title": "plan"}))).unwrap();
		todos.insert_now(Value::from_json(&json!({"title": "review"})), 2).unwrap();
		assert_eq!(titles(&mx), vec!["plan", "write", "review", "test"]);
		// Clamped to the end.
		todos.insert_now(Value::from_json(&json!({"title": "last"})), 99).unwrap();
		assert_eq!(titles(&mx).last().map(String::as_str), Some("last"));
	}

	#[rstest]
	fn test_delete_out_of_bounds_is_noop(mx: Mx) {
		let todos = items(&mx);
		assert!(todos.delete_now(5).is_none());
		assert!(todos.delete(5).is_none());
		assert_eq!(titles(&mx), vec!["write", "test"]);
	}

	#[rstest]
	fn test_deferred_delete_returns_current_item(mx: Mx) {
		let todos = items(&mx);
		let removed = todos.delete(0).unwrap();
		assert_eq!(removed.get("title"), Value::from("write"));
		assert_eq!(todos.len(), 2);
		mx.flush();
		assert_eq!(titles(&mx), vec!["test"]);
	}

	#[rstest]
	fn test_clear_then_add_keeps_position(mx: Mx) {
		let todos = items(&mx);
		todos.clear_now();
		assert!(todos.is_empty());
		assert!(titles(&mx).is_empty());
		todos.add_now(Value::from_json(&json!({"title": "again"}))).unwrap();
		let list = mx.document().query_selector("ul").unwrap().unwrap();
		assert_eq!(list.children().len(), 1);
		assert_eq!(titles(&mx), vec!["again"]);
	}

	#[rstest]
	fn test_replace_returns_old_item(mx: Mx) {
		let todos = items(&mx);
		let old = todos.replace_now(1, Value::from_json(&json!({"title": "deploy"}))).unwrap().unwrap();
		assert_eq!(old.get("title"), Value::from("test"));
		assert_eq!(titles(&mx), vec!["write", "deploy"]);
		assert!(todos.replace_now(9, Value::from("x")).unwrap().is_none());
	}

	#[rstest]
	fn test_mutations_notify_owner(mx: Mx) {
		let todos = items(&mx);
		let seen = std::rc::Rc::new(std::cell::Cell::new(0));
		let counter = seen.clone();
		mx.watch("todos.todos", move |_, _| counter.set(counter.get() + 1)).unwrap();
		todos.pop_now();
		todos.shift_now();
		assert_eq!(seen.get(), 2);
		assert!(todos.is_empty());
	}

	#[rstest]
	fn test_repeated_deferred_delete_removes_once(mx: Mx) {
		let todos = items(&mx);
		let first = todos.delete(0).unwrap();
		let second = todos.delete(0).unwrap();
		assert!(first.ptr_eq(&second));
		mx.flush();
		assert_eq!(todos.len(), 1);
		assert_eq!(titles(&mx), vec!["test"]);
	}

	#[rstest]
	fn test_add_then_delete_restores_array_and_dom(mx: Mx) {
		let todos = items(&mx);
		let before = mx.document().body().inner_html();
		todos.add_now(Value::from_json(&json!({"title": "temp"}))).unwrap();
		assert!(todos.delete_now(todos.len() - 1).is_some());
		assert_eq!(todos.len(), 2);
		assert_eq!(mx.document().body().inner_html(), before);
	}

	#[rstest]
	fn test_empty_template_rejects_rendering_operations() {
		let mx = Mx::new();
		mx.component("todos", json!({"todos": []}));
		mx.document().body().set_inner_html(
			r#"<ul mx-data="todos"><template mx-item="todos"></template><button @click="todos.add({title: 'x'})">add</button></ul>"#,
		);
		mx.start(StartConfig::new().observe(false).history(false)).unwrap();
		let todos = items(&mx);
		assert!(!todos.has_template());
		let missing = |result: Result<()>| matches!(result, Err(MxError::MissingTemplate(ref name)) if name == "todos");
		assert!(missing(todos.add(Value::from("a"))));
		assert!(missing(todos.prepend(Value::from("a"))));
		assert!(missing(todos.replace(0, Value::from("a")).map(drop)));

		mx.document().query_selector("button").unwrap().unwrap().click();
		mx.flush();
		let errors = mx.console().errors();
		assert_eq!(errors.len(), 1);
		assert!(errors[0].contains("has no template element"));
		assert!(todos.is_empty());
	}

	#[rstest]
	fn test_async_variants_settle_before_resolving(mx: Mx) {
		let todos = items(&mx);
		let item = futures::executor::block_on(todos.async_add(Value::from_json(&json!({"title": "now"})))).unwrap();
		assert_eq!(todos.len(), 3);
		assert_eq!(todos.index_of(&item), Some(2));
	}
}
