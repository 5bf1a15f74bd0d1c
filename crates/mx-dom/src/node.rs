//! Node handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::str::FromStr;

use crate::document::Document;
use crate::error::DomError;
use crate::event::{Event, EventHandle, Target};
use crate::html;
use crate::selector::{Selector, SelectorError};
use crate::tree::{NodeId, NodeKind, Tree};

/// Node kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Element,
	Text,
	Comment,
	Document,
	Fragment,
}

/// Positions accepted by [`Node::insert_adjacent_html`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
	BeforeBegin,
	AfterBegin,
	BeforeEnd,
	AfterEnd,
}

impl FromStr for InsertPosition {
	type Err = DomError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.to_ascii_lowercase().as_str() {
			"beforebegin" => Ok(Self::BeforeBegin),
			"afterbegin" => Ok(Self::AfterBegin),
			"beforeend" => Ok(Self::BeforeEnd),
			"afterend" => Ok(Self::AfterEnd),
			_ => Err(DomError::InvalidPosition(value.to_string())),
		}
	}
}

/// Handle to a node of a [`Document`]. Cheap to clone; equality is identity.
#[derive(Clone)]
pub struct Node {
	pub(crate) document: Document,
	pub(crate) id: NodeId,
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id && self.document.ptr_eq(&other.document)
	}
}

impl Eq for Node {}

impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		Rc::as_ptr(&self.document.inner).hash(state);
		self.id.hash(state);
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.node_type() {
			NodeType::Element => write!(f, "<{}#{}>", self.tag_name().unwrap_or_default(), self.id.0),
			other => write!(f, "{:?}#{}", other, self.id.0),
		}
	}
}

const FORM_VALUE_TAGS: &[&str] = &["input", "textarea", "select", "option", "button", "output"];

impl Node {
	fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
		f(&self.document.inner.tree.borrow())
	}

	fn with_tree_mut<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
		f(&mut self.document.inner.tree.borrow_mut())
	}

	fn wrap(&self, id: NodeId) -> Node {
		self.document.node(id)
	}

	fn wrap_all(&self, ids: Vec<NodeId>) -> Vec<Node> {
		ids.into_iter().map(|id| self.wrap(id)).collect()
	}

	pub fn document(&self) -> Document {
		self.document.clone()
	}

	pub fn node_type(&self) -> NodeType {
		self.with_tree(|tree| match tree.get(self.id).kind {
			NodeKind::Document => NodeType::Document,
			NodeKind::Fragment => NodeType::Fragment,
			NodeKind::Element(_) => NodeType::Element,
			NodeKind::Text(_) => NodeType::Text,
			NodeKind::Comment(_) => NodeType::Comment,
		})
	}

	pub fn is_element(&self) -> bool {
		self.node_type() == NodeType::Element
	}

	/// Lowercase tag name for elements.
	pub fn tag_name(&self) -> Option<String> {
		self.with_tree(|tree| tree.tag(self.id).map(str::to_string))
	}

	pub fn parent(&self) -> Option<Node> {
		self.with_tree(|tree| tree.parent(self.id)).map(|id| self.wrap(id))
	}

	pub fn parent_element(&self) -> Option<Node> {
		self.with_tree(|tree| tree.parent_element(self.id))
			.map(|id| self.wrap(id))
	}

	pub fn child_nodes(&self) -> Vec<Node> {
		let ids = self.with_tree(|tree| tree.children(self.id).to_vec());
		self.wrap_all(ids)
	}

	/// Element children only.
	pub fn children(&self) -> Vec<Node> {
		let ids = self.with_tree(|tree| {
			tree.children(self.id)
				.iter()
				.copied()
				.filter(|child| tree.is_element(*child))
				.collect()
		});
		self.wrap_all(ids)
	}

	pub fn first_child(&self) -> Option<Node> {
		self.with_tree(|tree| tree.children(self.id).first().copied())
			.map(|id| self.wrap(id))
	}

	pub fn last_child(&self) -> Option<Node> {
		self.with_tree(|tree| tree.children(self.id).last().copied())
			.map(|id| self.wrap(id))
	}

	pub fn next_sibling(&self) -> Option<Node> {
		self.with_tree(|tree| {
			let parent = tree.parent(self.id)?;
			let index = tree.index_in_parent(self.id)?;
			tree.children(parent).get(index + 1).copied()
		})
		.map(|id| self.wrap(id))
	}

	pub fn previous_sibling(&self) -> Option<Node> {
		self.with_tree(|tree| {
			let parent = tree.parent(self.id)?;
			let index = tree.index_in_parent(self.id)?;
			index.checked_sub(1).map(|index| tree.children(parent)[index])
		})
		.map(|id| self.wrap(id))
	}

	pub fn next_element_sibling(&self) -> Option<Node> {
		self.with_tree(|tree| tree.next_element_sibling(self.id))
			.map(|id| self.wrap(id))
	}

	pub fn previous_element_sibling(&self) -> Option<Node> {
		self.with_tree(|tree| tree.previous_element_sibling(self.id))
			.map(|id| self.wrap(id))
	}

	/// Inclusive containment, as `Node.contains`.
	pub fn contains(&self, other: &Node) -> bool {
		self.document.ptr_eq(&other.document)
			&& self.with_tree(|tree| tree.is_inclusive_ancestor(self.id, other.id))
	}

	/// Whether `self` comes before `other` in tree order. Nodes of different
	/// trees are never ordered.
	pub fn precedes(&self, other: &Node) -> bool {
		if !self.document.ptr_eq(&other.document) {
			return false;
		}
		self.with_tree(|tree| {
			tree.root_of(self.id) == tree.root_of(other.id)
				&& tree.tree_position(self.id) < tree.tree_position(other.id)
		})
	}

	/// Whether the node is reachable from its document node.
	pub fn is_connected(&self) -> bool {
		let root = self.document.as_node().id;
		self.with_tree(|tree| tree.root_of(self.id) == root)
	}

	/// Descendant elements in document order, template contents excluded.
	pub fn descendant_elements(&self) -> Vec<Node> {
		let ids = self.with_tree(|tree| {
			tree.descendants(self.id, false)
				.into_iter()
				.filter(|id| tree.is_element(*id))
				.collect()
		});
		self.wrap_all(ids)
	}

	// Tree mutation

	fn check_document(&self, other: &Node) -> Result<(), DomError> {
		if self.document.ptr_eq(&other.document) {
			Ok(())
		} else {
			Err(DomError::WrongDocument)
		}
	}

	/// Inserts `child` (or the children of a fragment) before `reference`, or at the end.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		self.check_document(child)?;
		if let Some(reference) = reference {
			self.check_document(reference)?;
		}
		let (removed, added) = {
			let mut tree = self.document.inner.tree.borrow_mut();
			if !tree.can_have_children(self.id) {
				return Err(DomError::Hierarchy(format!("{:?} cannot have children", self.id)));
			}
			let nodes: Vec<NodeId> = match tree.get(child.id).kind {
				NodeKind::Fragment => tree.children(child.id).to_vec(),
				NodeKind::Document => {
					return Err(DomError::Hierarchy("cannot insert a document node".to_string()));
				}
				_ => vec![child.id],
			};
			for node in &nodes {
				if tree.is_inclusive_ancestor(*node, self.id) {
					return Err(DomError::Hierarchy("insertion would create a cycle".to_string()));
				}
			}
			let mut reference = reference.map(|node| node.id);
			if let Some(id) = reference {
				if tree.parent(id) != Some(self.id) {
					return Err(DomError::NotFound("reference node is not a child".to_string()));
				}
			}
			// Inserting a node before itself keeps it in place.
			while let Some(id) = reference {
				if !nodes.contains(&id) {
					break;
				}
				reference = tree.index_in_parent(id).and_then(|index| tree.children(self.id).get(index + 1).copied());
			}
			let mut removed: Vec<(NodeId, NodeId)> = Vec::new();
			for node in &nodes {
				if let Some(parent) = tree.detach(*node) {
					removed.push((parent, *node));
				}
			}
			let mut index = match reference {
				Some(id) => tree.index_in_parent(id).unwrap_or(usize::MAX),
				None => usize::MAX,
			};
			for node in &nodes {
				tree.insert_child(self.id, *node, index);
				index = tree.index_in_parent(*node).map_or(usize::MAX, |position| position + 1);
			}
			(removed, nodes)
		};
		for (parent, node) in removed {
			// Fragments are never observed.
			self.document.record_child_list(parent, Vec::new(), vec![node]);
		}
		self.document.record_child_list(self.id, added, Vec::new());
		Ok(())
	}

	pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
		self.insert_before(child, None)
	}

	pub fn prepend(&self, child: &Node) -> Result<(), DomError> {
		let first = self.first_child();
		self.insert_before(child, first.as_ref())
	}

	pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
		self.check_document(child)?;
		if child.parent().as_ref() != Some(self) {
			return Err(DomError::NotFound("node is not a child".to_string()));
		}
		child.remove();
		Ok(())
	}

	/// Detaches the node from its parent. No-op when already detached.
	pub fn remove(&self) {
		let parent = self.with_tree_mut(|tree| tree.detach(self.id));
		if let Some(parent) = parent {
			self.document.record_child_list(parent, Vec::new(), vec![self.id]);
		}
	}

	pub fn replace_with(&self, replacement: &Node) -> Result<(), DomError> {
		if replacement == self {
			return Ok(());
		}
		let parent = self.parent().ok_or(DomError::NoParent)?;
		parent.insert_before(replacement, Some(self))?;
		self.remove();
		Ok(())
	}

	/// Inserts `node` immediately before this node.
	pub fn before(&self, node: &Node) -> Result<(), DomError> {
		let parent = self.parent().ok_or(DomError::NoParent)?;
		parent.insert_before(node, Some(self))
	}

	/// Inserts `node` immediately after this node.
	pub fn after(&self, node: &Node) -> Result<(), DomError> {
		let parent = self.parent().ok_or(DomError::NoParent)?;
		let next = self.next_sibling();
		parent.insert_before(node, next.as_ref())
	}

	fn remove_all_children(&self) {
		let removed = self.with_tree_mut(|tree| {
			let children = tree.children(self.id).to_vec();
			for child in &children {
				tree.detach(*child);
			}
			children
		});
		self.document.record_child_list(self.id, Vec::new(), removed);
	}

	// Attributes

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		let name = name.to_ascii_lowercase();
		self.with_tree(|tree| tree.attr(self.id, &name).map(str::to_string))
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		let name = name.to_ascii_lowercase();
		self.with_tree_mut(|tree| {
			if let Some(element) = tree.element_mut(self.id) {
				match element.attrs.iter_mut().find(|(key, _)| *key == name) {
					Some(entry) => entry.1 = value.to_string(),
					None => element.attrs.push((name, value.to_string())),
				}
			}
		});
	}

	pub fn remove_attribute(&self, name: &str) {
		let name = name.to_ascii_lowercase();
		self.with_tree_mut(|tree| {
			if let Some(element) = tree.element_mut(self.id) {
				element.attrs.retain(|(key, _)| *key != name);
			}
		});
	}

	/// Attributes in stored order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.with_tree(|tree| {
			tree.element(self.id)
				.map(|element| element.attrs.clone())
				.unwrap_or_default()
		})
	}

	pub fn id(&self) -> String {
		self.get_attribute("id").unwrap_or_default()
	}

	pub fn class_name(&self) -> String {
		self.get_attribute("class").unwrap_or_default()
	}

	pub fn set_class_name(&self, value: &str) {
		self.set_attribute("class", value);
	}

	/// Class tokens, deduplicated, in order.
	pub fn class_list(&self) -> Vec<String> {
		let mut tokens: Vec<String> = Vec::new();
		for token in self.class_name().split_ascii_whitespace() {
			if !tokens.iter().any(|existing| existing == token) {
				tokens.push(token.to_string());
			}
		}
		tokens
	}

	fn write_class_list(&self, tokens: &[String]) {
		self.set_class_name(&tokens.join(" "));
	}

	pub fn has_class(&self, token: &str) -> bool {
		self.class_list().iter().any(|existing| existing == token)
	}

	pub fn add_class(&self, token: &str) {
		let mut tokens = self.class_list();
		if token.is_empty() || tokens.iter().any(|existing| existing == token) {
			return;
		}
		tokens.push(token.to_string());
		self.write_class_list(&tokens);
	}

	pub fn remove_class(&self, token: &str) {
		if !self.has_attribute("class") {
			return;
		}
		let mut tokens = self.class_list();
		tokens.retain(|existing| existing != token);
		self.write_class_list(&tokens);
	}

	/// Toggles `token`, or forces it with `force`. Returns whether it is now present.
	pub fn toggle_class(&self, token: &str, force: Option<bool>) -> bool {
		let present = self.has_class(token);
		let wanted = force.unwrap_or(!present);
		if wanted && !present {
			self.add_class(token);
		} else if !wanted && present {
			self.remove_class(token);
		}
		wanted
	}

	fn style_declarations(&self) -> Vec<(String, String)> {
		self.get_attribute("style")
			.unwrap_or_default()
			.split(';')
			.filter_map(|declaration| {
				let (name, value) = declaration.split_once(':')?;
				let name = name.trim().to_ascii_lowercase();
				(!name.is_empty()).then(|| (name, value.trim().to_string()))
			})
			.collect()
	}

	fn write_style(&self, declarations: &[(String, String)]) {
		if declarations.is_empty() {
			self.remove_attribute("style");
			return;
		}
		let style = declarations
			.iter()
			.map(|(name, value)| format!("{}: {};", name, value))
			.collect::<Vec<_>>()
			.join(" ");
		self.set_attribute("style", &style);
	}

	/// Inline style value, `""` when unset (as `element.style.<prop>`).
	pub fn style_property(&self, name: &str) -> String {
		let name = name.to_ascii_lowercase();
		self.style_declarations()
			.into_iter()
			.find(|(key, _)| *key == name)
			.map(|(_, value)| value)
			.unwrap_or_default()
	}

	/// Sets an inline style property; an empty value removes it.
	pub fn set_style_property(&self, name: &str, value: &str) {
		let name = name.to_ascii_lowercase();
		let mut declarations = self.style_declarations();
		if value.is_empty() {
			declarations.retain(|(key, _)| *key != name);
		} else {
			match declarations.iter_mut().find(|(key, _)| *key == name) {
				Some(entry) => entry.1 = value.to_string(),
				None => declarations.push((name, value.to_string())),
			}
		}
		self.write_style(&declarations);
	}

	pub fn remove_style_property(&self, name: &str) {
		self.set_style_property(name, "");
	}

	// Form state

	/// Whether the element has a `value` property distinct from its attribute.
	pub fn has_value_property(&self) -> bool {
		self.tag_name()
			.is_some_and(|tag| FORM_VALUE_TAGS.contains(&tag.as_str()))
	}

	fn input_type(&self) -> String {
		self.get_attribute("type")
			.unwrap_or_default()
			.to_ascii_lowercase()
	}

	pub fn is_checkable(&self) -> bool {
		self.tag_name().as_deref() == Some("input")
			&& matches!(self.input_type().as_str(), "checkbox" | "radio")
	}

	/// The `value` property.
	pub fn value(&self) -> String {
		let dirty = self.with_tree(|tree| tree.element(self.id).and_then(|element| element.value.clone()));
		if let Some(value) = dirty {
			return value;
		}
		match self.tag_name().as_deref() {
			Some("textarea") => self.text_content(),
			Some("select") => {
				let options = self.query_selector_all("option").unwrap_or_default();
				options
					.iter()
					.find(|option| option.has_attribute("selected"))
					.or_else(|| options.first())
					.map(Node::value)
					.unwrap_or_default()
			}
			Some("option") => self
				.get_attribute("value")
				.unwrap_or_else(|| self.text_content().trim().to_string()),
			Some("input") if self.is_checkable() => {
				self.get_attribute("value").unwrap_or_else(|| "on".to_string())
			}
			_ => self.get_attribute("value").unwrap_or_default(),
		}
	}

	pub fn set_value(&self, value: &str) {
		self.with_tree_mut(|tree| {
			if let Some(element) = tree.element_mut(self.id) {
				element.value = Some(value.to_string());
			}
		});
	}

	/// The `checked` property.
	pub fn checked(&self) -> bool {
		let dirty = self.with_tree(|tree| tree.element(self.id).and_then(|element| element.checked));
		dirty.unwrap_or_else(|| self.has_attribute("checked"))
	}

	pub fn set_checked(&self, checked: bool) {
		self.with_tree_mut(|tree| {
			if let Some(element) = tree.element_mut(self.id) {
				element.checked = Some(checked);
			}
		});
	}

	// Content

	pub fn text_content(&self) -> String {
		self.with_tree(|tree| tree.text_content(self.id))
	}

	/// Replaces the children with one text node (none for an empty string).
	pub fn set_text_content(&self, text: &str) {
		let kind_is_text = self.with_tree_mut(|tree| match &mut tree.get_mut(self.id).kind {
			NodeKind::Text(content) | NodeKind::Comment(content) => {
				*content = text.to_string();
				true
			}
			_ => false,
		});
		if kind_is_text {
			return;
		}
		self.remove_all_children();
		if !text.is_empty() {
			let node = self.document.create_text_node(text);
			// Element and fragment nodes always accept text children.
			let _ = self.append_child(&node);
		}
	}

	pub fn inner_html(&self) -> String {
		self.with_tree(|tree| html::serialize_children(tree, self.id))
	}

	pub fn set_inner_html(&self, markup: &str) {
		self.remove_all_children();
		let fragment = self.document.parse_fragment(markup);
		// A fresh fragment can always be inserted.
		let _ = self.append_child(&fragment);
	}

	pub fn outer_html(&self) -> String {
		self.with_tree(|tree| html::serialize(tree, self.id))
	}

	/// Replaces this node with the parsed `markup`.
	pub fn set_outer_html(&self, markup: &str) -> Result<(), DomError> {
		let parent = self.parent().ok_or(DomError::NoParent)?;
		let fragment = self.document.parse_fragment(markup);
		parent.insert_before(&fragment, Some(self))?;
		self.remove();
		Ok(())
	}

	pub fn insert_adjacent_html(&self, position: InsertPosition, markup: &str) -> Result<(), DomError> {
		let fragment = self.document.parse_fragment(markup);
		self.insert_adjacent(position, &fragment)
	}

	/// Inserts `node` relative to this element.
	pub fn insert_adjacent(&self, position: InsertPosition, node: &Node) -> Result<(), DomError> {
		match position {
			InsertPosition::BeforeBegin => self.before(node),
			InsertPosition::AfterBegin => self.prepend(node),
			InsertPosition::BeforeEnd => self.append_child(node),
			InsertPosition::AfterEnd => self.after(node),
		}
	}

	/// Detached copy. Form state (dirty value/checked) is copied with the node.
	pub fn clone_node(&self, deep: bool) -> Node {
		let id = self.with_tree_mut(|tree| tree.clone_subtree(self.id, deep));
		self.wrap(id)
	}

	// Queries

	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.select_first(&selector))
	}

	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.select(&selector))
	}

	/// Descendants matching `selector`, template contents excluded.
	pub fn select(&self, selector: &Selector) -> Vec<Node> {
		let ids = self.with_tree(|tree| {
			tree.descendants(self.id, false)
				.into_iter()
				.filter(|id| selector.matches(tree, *id))
				.collect()
		});
		self.wrap_all(ids)
	}

	pub fn select_first(&self, selector: &Selector) -> Option<Node> {
		self.with_tree(|tree| {
			tree.descendants(self.id, false)
				.into_iter()
				.find(|id| selector.matches(tree, *id))
		})
		.map(|id| self.wrap(id))
	}

	/// Like [`Node::select`] but also searching inside `<template>` contents.
	pub fn select_including_templates(&self, selector: &Selector) -> Vec<Node> {
		let ids = self.with_tree(|tree| {
			tree.descendants(self.id, true)
				.into_iter()
				.filter(|id| selector.matches(tree, *id))
				.collect()
		});
		self.wrap_all(ids)
	}

	pub fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.matches_selector(&selector))
	}

	pub fn matches_selector(&self, selector: &Selector) -> bool {
		self.with_tree(|tree| selector.matches(tree, self.id))
	}

	/// Nearest inclusive ancestor matching `selector`.
	pub fn closest(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.closest_selector(&selector))
	}

	pub fn closest_selector(&self, selector: &Selector) -> Option<Node> {
		self.with_tree(|tree| {
			let mut current = Some(self.id);
			while let Some(id) = current {
				if selector.matches(tree, id) {
					return Some(id);
				}
				current = tree.parent(id);
			}
			None
		})
		.map(|id| self.wrap(id))
	}

	// Events

	pub fn add_event_listener(&self, event_type: &str, callback: impl Fn(&Event) + 'static) -> EventHandle {
		self.document
			.add_listener(Target::Node(self.id), event_type, Rc::new(callback), false)
	}

	/// Listener removed after its first invocation.
	pub fn add_event_listener_once(&self, event_type: &str, callback: impl Fn(&Event) + 'static) -> EventHandle {
		self.document
			.add_listener(Target::Node(self.id), event_type, Rc::new(callback), true)
	}

	pub fn listener_count(&self, event_type: &str) -> usize {
		self.document
			.inner
			.listeners
			.borrow()
			.count(Target::Node(self.id), event_type)
	}

	/// Dispatches `event` at this node, bubbling through its ancestors.
	/// Returns `false` when a listener called `prevent_default`.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		let path = self.with_tree(|tree| {
			let mut path = vec![self.id];
			let mut current = tree.parent(self.id);
			while let Some(id) = current {
				path.push(id);
				current = tree.parent(id);
			}
			path
		});
		event.set_target(Some(self.clone()));
		for id in path {
			let callbacks = self
				.document
				.inner
				.listeners
				.borrow_mut()
				.take_matching(Target::Node(id), event.event_type());
			if !callbacks.is_empty() {
				event.set_current_target(Some(self.wrap(id)));
				for callback in callbacks {
					callback(event);
				}
			}
			if event.propagation_stopped() || !event.bubbles() {
				break;
			}
		}
		event.set_current_target(None);
		!event.default_prevented()
	}

	/// Simulates a user click, including checkbox/radio activation and the
	/// resulting `input`/`change` events.
	pub fn click(&self) -> bool {
		let checkable = self.is_checkable();
		let previous = self.checked();
		if checkable {
			let next = if self.input_type() == "radio" { true } else { !previous };
			self.set_checked(next);
		}
		let event = Event::new("click");
		let proceed = self.dispatch_event(&event);
		if checkable {
			if !proceed {
				self.set_checked(previous);
			} else if previous != self.checked() {
				self.dispatch_event(&Event::new("input"));
				self.dispatch_event(&Event::new("change"));
			}
		}
		proceed
	}

	/// Sets the value as typed by a user and fires `input`.
	pub fn type_value(&self, value: &str) {
		self.set_value(value);
		self.dispatch_event(&Event::new("input"));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use rstest::{fixture, rstest};

	#[fixture]
	fn document() -> Document {
		Document::from_body(
			r#"<ul id="list"><li class="a">one</li><li class="b">two</li></ul><input type="checkbox" id="done">"#,
		)
	}

	fn list(document: &Document) -> Node {
		document.get_element_by_id("list").unwrap()
	}

	#[rstest]
	fn test_insert_before_moves_existing_node(document: Document) {
		let list = list(&document);
		let items = list.children();
		list.insert_before(&items[1], Some(&items[0])).unwrap();
		assert_eq!(list.inner_html(), r#"<li class="b">two</li><li class="a">one</li>"#);
	}

	#[rstest]
	fn test_insert_before_self_is_noop(document: Document) {
		let list = list(&document);
		let items = list.children();
		list.insert_before(&items[0], Some(&items[0])).unwrap();
		assert_eq!(list.children(), items);
	}

	#[rstest]
	fn test_precedes_follows_tree_order(document: Document) {
		let list = list(&document);
		let items = list.children();
		let checkbox = document.get_element_by_id("done").unwrap();
		assert!(items[0].precedes(&items[1]));
		assert!(!items[1].precedes(&items[0]));
		assert!(list.precedes(&items[0]));
		assert!(items[1].precedes(&checkbox));
		assert!(!items[0].precedes(&items[0].clone_node(true)));
	}

	#[rstest]
	fn test_cycle_is_rejected(document: Document) {
		let list = list(&document);
		let item = list.first_child().unwrap();
		assert!(matches!(item.append_child(&list), Err(DomError::Hierarchy(_))));
	}

	#[rstest]
	fn test_fragment_children_are_moved(document: Document) {
		let list = list(&document);
		let fragment = document.parse_fragment("<li>three</li><li>four</li>");
		list.append_child(&fragment).unwrap();
		assert_eq!(list.children().len(), 4);
		assert!(fragment.child_nodes().is_empty());
	}

	#[rstest]
	#[case("beforebegin", "<p></p><ul id=\"list\">")]
	#[case("afterend", "</ul><p></p>")]
	fn test_insert_adjacent_html(document: Document, #[case] position: &str, #[case] expected: &str) {
		let list = list(&document);
		list.insert_adjacent_html(position.parse().unwrap(), "<p></p>").unwrap();
		assert!(document.body().inner_html().contains(expected));
	}

	#[rstest]
	fn test_class_helpers_keep_tokens_unique(document: Document) {
		let item = list(&document).first_child().unwrap();
		item.add_class("a");
		item.add_class("active");
		assert_eq!(item.class_name(), "a active");
		assert!(!item.toggle_class("a", None));
		assert_eq!(item.class_list(), vec!["active"]);
	}

	#[rstest]
	fn test_style_property(document: Document) {
		let item = list(&document).first_child().unwrap();
		item.set_style_property("display", "none");
		assert_eq!(item.style_property("display"), "none");
		item.set_style_property("display", "");
		assert_eq!(item.style_property("display"), "");
		assert!(!item.has_attribute("style"));
	}

	#[rstest]
	fn test_click_toggles_checkbox_and_fires_change(document: Document) {
		let input = document.get_element_by_id("done").unwrap();
		let changes = Rc::new(RefCell::new(Vec::new()));
		let sink = changes.clone();
		let target = input.clone();
		input.add_event_listener("change", move |_| sink.borrow_mut().push(target.checked()));

		input.click();
		input.click();
		assert_eq!(*changes.borrow(), vec![true, false]);
	}

	#[rstest]
	fn test_prevented_click_reverts_checkbox(document: Document) {
		let input = document.get_element_by_id("done").unwrap();
		input.add_event_listener("click", |event| event.prevent_default());
		assert!(!input.click());
		assert!(!input.checked());
	}

	#[rstest]
	fn test_events_bubble_until_stopped(document: Document) {
		let list = list(&document);
		let item = list.first_child().unwrap();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		list.add_event_listener("ping", move |event| {
			sink.borrow_mut().push(event.current_target().unwrap().tag_name().unwrap());
		});
		let sink = seen.clone();
		document.body().add_event_listener("ping", move |_| sink.borrow_mut().push("body".to_string()));
		item.add_event_listener_once("ping", |event| event.stop_propagation());

		item.dispatch_event(&Event::new("ping"));
		item.dispatch_event(&Event::new("ping"));
		assert_eq!(*seen.borrow(), vec!["ul", "body"]);
	}

	#[rstest]
	fn test_closest_and_matches(document: Document) {
		let item = list(&document).first_child().unwrap();
		assert!(item.matches("ul > li.a").unwrap());
		assert_eq!(item.closest("#list").unwrap(), Some(list(&document)));
		assert!(item.closest("table").unwrap().is_none());
	}

	#[rstest]
	fn test_removed_node_is_disconnected(document: Document) {
		let list = list(&document);
		let item = list.first_child().unwrap();
		assert!(item.is_connected());
		item.remove();
		assert!(!item.is_connected());
		assert!(!list.contains(&item));
	}
}
