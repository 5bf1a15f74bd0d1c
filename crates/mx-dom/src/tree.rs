//! Arena storage backing every [`Document`](crate::Document).
//!
//! Nodes are never freed: detached subtrees simply stop being reachable from
//! the document node. Handles ([`Node`](crate::Node)) are therefore always valid
//! for the lifetime of their document.

/// Index of a node inside its document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
	Document,
	Fragment,
	Element(ElementData),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
	pub(crate) tag: String,
	pub(crate) attrs: Vec<(String, String)>,
	/// Dirty `value` property, diverged from the `value` attribute.
	pub(crate) value: Option<String>,
	/// Dirty `checked` property, diverged from the `checked` attribute.
	pub(crate) checked: Option<bool>,
}

impl ElementData {
	pub(crate) fn new(tag: &str, attrs: Vec<(String, String)>) -> Self {
		Self {
			tag: tag.to_ascii_lowercase(),
			attrs,
			value: None,
			checked: None,
		}
	}

	pub(crate) fn attr(&self, name: &str) -> Option<&str> {
		self.attrs
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}
}

#[derive(Debug)]
pub(crate) struct NodeData {
	pub(crate) kind: NodeKind,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct Tree {
	nodes: Vec<NodeData>,
}

impl Tree {
	pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		});
		id
	}

	pub(crate) fn get(&self, id: NodeId) -> &NodeData {
		&self.nodes[id.0]
	}

	pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
		&mut self.nodes[id.0]
	}

	pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.get(id).parent
	}

	pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
		&self.get(id).children
	}

	pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
		match &self.get(id).kind {
			NodeKind::Element(data) => Some(data),
			_ => None,
		}
	}

	pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
		match &mut self.get_mut(id).kind {
			NodeKind::Element(data) => Some(data),
			_ => None,
		}
	}

	pub(crate) fn is_element(&self, id: NodeId) -> bool {
		matches!(self.get(id).kind, NodeKind::Element(_))
	}

	pub(crate) fn tag(&self, id: NodeId) -> Option<&str> {
		self.element(id).map(|data| data.tag.as_str())
	}

	pub(crate) fn is_template(&self, id: NodeId) -> bool {
		self.tag(id) == Some("template")
	}

	pub(crate) fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
		self.element(id).and_then(|data| data.attr(name))
	}

	pub(crate) fn can_have_children(&self, id: NodeId) -> bool {
		matches!(
			self.get(id).kind,
			NodeKind::Document | NodeKind::Fragment | NodeKind::Element(_)
		)
	}

	pub(crate) fn index_in_parent(&self, id: NodeId) -> Option<usize> {
		let parent = self.parent(id)?;
		self.children(parent).iter().position(|child| *child == id)
	}

	/// Unlinks `id` from its parent and returns the former parent.
	pub(crate) fn detach(&mut self, id: NodeId) -> Option<NodeId> {
		let parent = self.parent(id)?;
		self.get_mut(parent).children.retain(|child| *child != id);
		self.get_mut(id).parent = None;
		Some(parent)
	}

	/// Links a detached node under `parent` at `index` (clamped).
	pub(crate) fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
		let children = &mut self.get_mut(parent).children;
		let index = index.min(children.len());
		children.insert(index, child);
		self.get_mut(child).parent = Some(parent);
	}

	pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
		let len = self.children(parent).len();
		self.insert_child(parent, child, len);
	}

	pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == ancestor {
				return true;
			}
			current = self.parent(id);
		}
		false
	}

	/// Child indexes from the root down to `id`; comparing two of these orders
	/// nodes of one tree in document order.
	pub(crate) fn tree_position(&self, id: NodeId) -> Vec<usize> {
		let mut position = Vec::new();
		let mut current = id;
		while let Some(index) = self.index_in_parent(current) {
			position.push(index);
			current = self.parent(current).unwrap_or(current);
		}
		position.reverse();
		position
	}

	pub(crate) fn root_of(&self, id: NodeId) -> NodeId {
		let mut current = id;
		while let Some(parent) = self.parent(current) {
			current = parent;
		}
		current
	}

	pub(crate) fn parent_element(&self, id: NodeId) -> Option<NodeId> {
		self.parent(id).filter(|parent| self.is_element(*parent))
	}

	pub(crate) fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
		let parent = self.parent(id)?;
		let siblings = self.children(parent);
		let index = siblings.iter().position(|child| *child == id)?;
		siblings[..index]
			.iter()
			.rev()
			.copied()
			.find(|sibling| self.is_element(*sibling))
	}

	pub(crate) fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
		let parent = self.parent(id)?;
		let siblings = self.children(parent);
		let index = siblings.iter().position(|child| *child == id)?;
		siblings[index + 1..]
			.iter()
			.copied()
			.find(|sibling| self.is_element(*sibling))
	}

	/// Pre-order descendants of `id` (exclusive). Template contents are only
	/// visited when `into_templates` is set.
	pub(crate) fn descendants(&self, id: NodeId, into_templates: bool) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
		while let Some(current) = stack.pop() {
			out.push(current);
			if !into_templates && self.is_template(current) {
				continue;
			}
			stack.extend(self.children(current).iter().rev().copied());
		}
		out
	}

	pub(crate) fn clone_subtree(&mut self, id: NodeId, deep: bool) -> NodeId {
		let kind = self.get(id).kind.clone();
		let copy = self.alloc(kind);
		if deep {
			let children = self.children(id).to_vec();
			for child in children {
				let child_copy = self.clone_subtree(child, true);
				self.append_child(copy, child_copy);
			}
		}
		copy
	}

	pub(crate) fn text_content(&self, id: NodeId) -> String {
		match &self.get(id).kind {
			NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
			_ => {
				let mut out = String::new();
				for descendant in self.descendants(id, false) {
					if let NodeKind::Text(text) = &self.get(descendant).kind {
						out.push_str(text);
					}
				}
				out
			}
		}
	}
}
