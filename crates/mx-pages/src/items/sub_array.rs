//! Sibling nodes bound to one array property (`::tag.array="tags"`).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mx_dom::Node;

use crate::error_log;
use crate::reaction::{DomReaction, Formatter, ReactionKind, resolve_reaction};
use crate::registry::{Mx, WeakMx};
use crate::value::Value;

/// N sibling elements rendering the N entries of an array.
///
/// Assigning an array of length M reconciles the DOM: missing nodes are cloned
/// from the last node of the original template, excess trailing nodes are
/// removed, and node `i` renders entry `i`.
#[derive(Clone)]
pub struct SubArray {
	inner: Rc<RefCell<SubArrayInner>>,
}

struct SubArrayInner {
	mx: WeakMx,
	nodes: Vec<Node>,
	values: Vec<Value>,
	/// Detached copy of the last node seen at binding time.
	template: Node,
	parent: Option<Node>,
	/// Node following the group, used to re-insert after the group was emptied.
	anchor: Option<Node>,
	kind: ReactionKind,
	formatter: Option<Formatter>,
}

impl SubArrayInner {
	fn render(&self, index: usize) {
		let (Some(node), Some(value)) = (self.nodes.get(index), self.values.get(index)) else {
			return;
		};
		let reaction = DomReaction::new(node.clone(), self.kind.clone()).with_formatter(self.formatter.clone());
		resolve_reaction(&reaction, value, &Value::Undefined);
	}

	/// Places `node` after the group, or at the remembered position once the
	/// group was emptied. Returns whether the node was attached.
	fn insert(&self, node: &Node) -> bool {
		if let Some(last) = self.nodes.last() {
			if last.parent().is_some() && last.after(node).is_ok() {
				return true;
			}
		}
		let Some(parent) = &self.parent else {
			return false;
		};
		let anchor = self
			.anchor
			.as_ref()
			.filter(|anchor| anchor.parent().as_ref() == Some(parent));
		match parent.insert_before(node, anchor) {
			Ok(()) => true,
			Err(err) => {
				if let Some(mx) = self.mx.upgrade() {
					error_log!(mx, "cannot grow sub-array: {}", err);
				}
				false
			}
		}
	}

	/// Appends a node cloned from the template. `false` when it could not be
	/// attached; the node count then stays as it was.
	fn grow(&mut self) -> bool {
		let node = self.template.clone_node(true);
		if !self.insert(&node) {
			return false;
		}
		self.nodes.push(node);
		true
	}

	fn shrink(&mut self) {
		if let Some(node) = self.nodes.pop() {
			if self.nodes.is_empty() {
				self.anchor = node.next_sibling();
			}
			node.remove();
		}
	}
}

impl SubArray {
	/// Binds `nodes` (document order) currently showing `values`. `None` when
	/// there is no node to use as a template.
	pub(crate) fn new(
		mx: &Mx,
		nodes: Vec<Node>,
		values: Vec<Value>,
		kind: ReactionKind,
		formatter: Option<Formatter>,
	) -> Option<Self> {
		let last = nodes.last()?;
		let template = last.clone_node(true);
		let parent = last.parent();
		let anchor = last.next_sibling();
		Some(Self {
			inner: Rc::new(RefCell::new(SubArrayInner {
				mx: mx.downgrade(),
				nodes,
				values,
				template,
				parent,
				anchor,
				kind,
				formatter,
			})),
		})
	}

	/// Replaces the contents, reconciling the sibling nodes.
	pub fn assign(&self, values: Vec<Value>) {
		let mut inner = self.inner.borrow_mut();
		while inner.nodes.len() > values.len() {
			inner.shrink();
		}
		while inner.nodes.len() < values.len() {
			if !inner.grow() {
				break;
			}
		}
		inner.values = values;
		for index in 0..inner.nodes.len() {
			inner.render(index);
		}
	}

	pub fn values(&self) -> Vec<Value> {
		self.inner.borrow().values.clone()
	}

	pub fn len(&self) -> usize {
		self.inner.borrow().values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<Value> {
		self.inner.borrow().values.get(index).cloned()
	}

	/// Writes entry `index`. Writing past the end extends the array with `null`.
	pub fn set(&self, index: usize, value: Value) {
		let mut values = self.values();
		if index >= values.len() {
			values.resize(index + 1, Value::Null);
		}
		values[index] = value;
		self.assign(values);
	}

	pub fn push(&self, value: Value) {
		let mut inner = self.inner.borrow_mut();
		inner.values.push(value);
		if inner.grow() {
			let last = inner.nodes.len() - 1;
			inner.render(last);
		}
	}

	pub fn pop(&self) -> Option<Value> {
		let mut inner = self.inner.borrow_mut();
		let value = inner.values.pop()?;
		inner.shrink();
		Some(value)
	}

	/// The bound nodes in document order.
	pub fn nodes(&self) -> Vec<Node> {
		self.inner.borrow().nodes.clone()
	}

	pub fn ptr_eq(&self, other: &SubArray) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for SubArray {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubArray")
			.field("values", &self.values())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn mx() -> Mx {
		let mx = Mx::new();
		mx.document()
			.body()
			.set_inner_html(r#"<ul id="tags"><li>a</li><li>b</li></ul><p id="after"></p>"#);
		mx
	}

	fn bind(mx: &Mx) -> SubArray {
		let list = mx.document().get_element_by_id("tags").unwrap();
		let nodes = list.children();
		let values = nodes.iter().map(|node| Value::String(node.text_content())).collect();
		SubArray::new(mx, nodes, values, ReactionKind::Text, None).unwrap()
	}

	fn texts(mx: &Mx) -> Vec<String> {
		mx.document()
			.get_element_by_id("tags")
			.unwrap()
			.children()
			.iter()
			.map(Node::text_content)
			.collect()
	}

	#[rstest]
	#[case(vec!["x", "y", "z", "w"])]
	#[case(vec!["x"])]
	#[case(vec!["x", "y"])]
	fn test_assign_reconciles_to_length(mx: Mx, #[case] data: Vec<&str>) {
		let sub_array = bind(&mx);
		sub_array.assign(data.iter().copied().map(Value::from).collect());
		assert_eq!(texts(&mx), data);
		assert_eq!(sub_array.len(), data.len());
	}

	#[rstest]
	fn test_empty_then_regrow_keeps_position(mx: Mx) {
		let sub_array = bind(&mx);
		sub_array.assign(Vec::new());
		assert!(texts(&mx).is_empty());
		sub_array.assign(vec![Value::from("again")]);
		assert_eq!(texts(&mx), vec!["again"]);
		assert!(mx.console().errors().is_empty());
	}

	#[rstest]
	fn test_push_after_emptying_appends_to_parent(mx: Mx) {
		let sub_array = bind(&mx);
		sub_array.assign(Vec::new());
		sub_array.push(Value::from("z"));
		assert_eq!(texts(&mx), vec!["z"]);
		assert_eq!(sub_array.nodes().len(), sub_array.len());
		assert!(mx.console().errors().is_empty());
	}

	#[rstest]
	fn test_push_pop_and_set(mx: Mx) {
		let sub_array = bind(&mx);
		sub_array.push(Value::from("c"));
		assert_eq!(texts(&mx), vec!["a", "b", "c"]);
		assert_eq!(sub_array.pop(), Some(Value::from("c")));
		sub_array.set(0, Value::from("first"));
		assert_eq!(texts(&mx), vec!["first", "b"]);
		assert_eq!(sub_array.get(1), Some(Value::from("b")));
	}
}
