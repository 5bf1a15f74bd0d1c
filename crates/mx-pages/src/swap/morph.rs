//! In-place tree reconciliation.
//!
//! [`diff`] compares a live subtree with an incoming one and returns the
//! [`Patch`]es that turn the first into the second; [`apply`] performs them.
//! Elements that survive keep their identity, so bindings and listeners on
//! them stay attached.
//!
//! Children are matched by position. Two nodes match when they have the same
//! type, and for elements the same tag and `id`; anything else is replaced
//! wholesale.

use mx_dom::{DomError, Node, NodeType};

/// One DOM mutation. Nodes taken from the incoming tree are cloned on apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
	SetAttribute { node: Node, name: String, value: String },
	RemoveAttribute { node: Node, name: String },
	SetText { node: Node, text: String },
	Replace { old: Node, new: Node },
	Append { parent: Node, new: Node },
	Remove { node: Node },
}

fn same_kind(old: &Node, new: &Node) -> bool {
	match (old.node_type(), new.node_type()) {
		(NodeType::Element, NodeType::Element) => {
			old.tag_name() == new.tag_name() && old.get_attribute("id") == new.get_attribute("id")
		}
		(old, new) => old == new && old != NodeType::Comment,
	}
}

fn diff_attributes(old: &Node, new: &Node, patches: &mut Vec<Patch>) {
	let incoming = new.attributes();
	for (name, _) in old.attributes() {
		if !incoming.iter().any(|(other, _)| *other == name) {
			patches.push(Patch::RemoveAttribute {
				node: old.clone(),
				name,
			});
		}
	}
	for (name, value) in incoming {
		if old.get_attribute(&name).as_deref() != Some(value.as_str()) {
			patches.push(Patch::SetAttribute {
				node: old.clone(),
				name,
				value,
			});
		}
	}
}

/// Patches that turn the children of `old` into those of `new`.
pub fn diff_children(old: &Node, new: &Node) -> Vec<Patch> {
	let mut patches = Vec::new();
	children_into(old, new, &mut patches);
	patches
}

/// Patches that turn `old` (attributes and children) into `new`.
pub fn diff(old: &Node, new: &Node) -> Vec<Patch> {
	let mut patches = Vec::new();
	node_into(old, new, &mut patches);
	patches
}

fn node_into(old: &Node, new: &Node, patches: &mut Vec<Patch>) {
	if !same_kind(old, new) {
		patches.push(Patch::Replace {
			old: old.clone(),
			new: new.clone(),
		});
		return;
	}
	match new.node_type() {
		NodeType::Text => {
			let text = new.text_content();
			if old.text_content() != text {
				patches.push(Patch::SetText {
					node: old.clone(),
					text,
				});
			}
		}
		NodeType::Element => {
			diff_attributes(old, new, patches);
			children_into(old, new, patches);
		}
		_ => children_into(old, new, patches),
	}
}

fn children_into(old: &Node, new: &Node, patches: &mut Vec<Patch>) {
	let current = old.child_nodes();
	let incoming = new.child_nodes();
	for (index, new_child) in incoming.iter().enumerate() {
		match current.get(index) {
			Some(old_child) => node_into(old_child, new_child, patches),
			None => patches.push(Patch::Append {
				parent: old.clone(),
				new: new_child.clone(),
			}),
		}
	}
	for old_child in current.iter().skip(incoming.len()) {
		patches.push(Patch::Remove {
			node: old_child.clone(),
		});
	}
}

/// Applies `patches` in order.
pub fn apply(patches: &[Patch]) -> Result<(), DomError> {
	for patch in patches {
		match patch {
			Patch::SetAttribute { node, name, value } => node.set_attribute(name, value),
			Patch::RemoveAttribute { node, name } => node.remove_attribute(name),
			Patch::SetText { node, text } => node.set_text_content(text),
			Patch::Replace { old, new } => old.replace_with(&new.clone_node(true))?,
			Patch::Append { parent, new } => parent.append_child(&new.clone_node(true))?,
			Patch::Remove { node } => node.remove(),
		}
	}
	Ok(())
}

/// Morphs `old` into `new` in place.
pub fn morph(old: &Node, new: &Node) -> Result<(), DomError> {
	apply(&diff(old, new))
}

/// Morphs the children of `old` into those of `new`, leaving `old`'s own
/// attributes untouched.
pub fn morph_children(old: &Node, new: &Node) -> Result<(), DomError> {
	apply(&diff_children(old, new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use mx_dom::Document;
	use rstest::rstest;

	fn pair(old: &str, new: &str) -> (Document, Node, Node) {
		let document = Document::from_body(old);
		let live = document.body().first_child().unwrap();
		let incoming = document.parse_fragment(new).first_child().unwrap();
		(document, live, incoming)
	}

	#[rstest]
	fn test_identical_trees_produce_no_patches() {
		let (_document, live, incoming) = pair(r#"<div id="a"><p>x</p></div>"#, r#"<div id="a"><p>x</p></div>"#);
		assert!(diff(&live, &incoming).is_empty());
	}

	#[rstest]
	fn test_text_change_keeps_element_identity() {
		let (_document, live, incoming) = pair(r#"<div id="a"><p>old</p></div>"#, r#"<div id="a"><p>new</p></div>"#);
		let paragraph = live.first_child().unwrap();
		let patches = diff(&live, &incoming);
		assert_eq!(patches.len(), 1);
		assert!(matches!(&patches[0], Patch::SetText { text, .. } if text == "new"));

		apply(&patches).unwrap();
		assert_eq!(live.first_child().unwrap(), paragraph);
		assert_eq!(live.outer_html(), r#"<div id="a"><p>new</p></div>"#);
	}

	#[rstest]
	fn test_attributes_tags_and_lengths() {
		let (_document, live, incoming) = pair(
			r#"<div id="a" class="x" hidden><p>1</p><p>2</p><span>3</span></div>"#,
			r#"<div id="a" class="y"><p>1</p><b>2</b></div>"#,
		);
		let patches = diff(&live, &incoming);
		assert!(patches.contains(&Patch::RemoveAttribute {
			node: live.clone(),
			name: "hidden".to_string()
		}));
		assert!(patches.iter().any(|patch| matches!(patch, Patch::Replace { .. })));
		assert!(patches.iter().any(|patch| matches!(patch, Patch::Remove { .. })));

		apply(&patches).unwrap();
		assert_eq!(live.outer_html(), r#"<div class="y" id="a"><p>1</p><b>2</b></div>"#);
	}

	#[rstest]
	fn test_children_only_morph_keeps_root_attributes() {
		let (_document, live, incoming) = pair(r#"<main class="live"></main>"#, r#"<main><h1>t</h1>more</main>"#);
		morph_children(&live, &incoming).unwrap();
		assert_eq!(live.outer_html(), r#"<main class="live"><h1>t</h1>more</main>"#);
	}
}
