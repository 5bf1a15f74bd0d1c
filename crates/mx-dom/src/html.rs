//! HTML parsing (via `scraper`) into the arena and serialization back to markup.

use scraper::Html;

use crate::tree::{ElementData, NodeId, NodeKind, Tree};

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Whether `markup` looks like a complete document rather than a fragment.
pub fn is_full_document(markup: &str) -> bool {
	let head = markup.trim_start();
	let lowered = head.get(..9).unwrap_or(head).to_ascii_lowercase();
	lowered.starts_with("<!doctype") || lowered.starts_with("<html")
}

/// Parses body content into a new detached fragment node.
pub(crate) fn parse_fragment(tree: &mut Tree, markup: &str) -> NodeId {
	let parsed = Html::parse_fragment(markup);
	let fragment = tree.alloc(NodeKind::Fragment);
	convert_children(tree, parsed.root_element(), fragment);
	fragment
}

/// Parses a full document into a new detached `<html>` element.
pub(crate) fn parse_document(tree: &mut Tree, markup: &str) -> NodeId {
	let parsed = Html::parse_document(markup);
	let root = parsed.root_element();
	let html = tree.alloc(element_kind(root.value()));
	convert_children(tree, root, html);
	html
}

fn element_kind(element: &scraper::node::Element) -> NodeKind {
	let mut attrs: Vec<(String, String)> = element
		.attrs()
		.map(|(name, value)| (name.to_string(), value.to_string()))
		.collect();
	// The parser does not guarantee source order, so keep serialization stable.
	attrs.sort_by(|a, b| a.0.cmp(&b.0));
	NodeKind::Element(ElementData::new(element.name(), attrs))
}

fn convert_children(tree: &mut Tree, source: scraper::ElementRef<'_>, parent: NodeId) {
	let mut stack: Vec<_> = source.children().rev().map(|child| (child, parent)).collect();
	while let Some((node, parent)) = stack.pop() {
		let kind = match node.value() {
			scraper::Node::Element(element) => element_kind(element),
			scraper::Node::Text(text) => NodeKind::Text(text.text.to_string()),
			scraper::Node::Comment(comment) => NodeKind::Comment(comment.comment.to_string()),
			// `<template>` contents arrive wrapped in a fragment; splice them into the template.
			scraper::Node::Fragment => {
				stack.extend(node.children().rev().map(|child| (child, parent)));
				continue;
			}
			_ => continue,
		};
		let is_element = matches!(kind, NodeKind::Element(_));
		let id = tree.alloc(kind);
		tree.append_child(parent, id);
		if is_element {
			stack.extend(node.children().rev().map(|child| (child, id)));
		}
	}
}

/// Serializes `id` including its own tag.
pub(crate) fn serialize(tree: &Tree, id: NodeId) -> String {
	let mut out = String::new();
	write_node(tree, id, &mut out);
	out
}

/// Serializes the children of `id`.
pub(crate) fn serialize_children(tree: &Tree, id: NodeId) -> String {
	let mut out = String::new();
	for child in tree.children(id) {
		write_node(tree, *child, &mut out);
	}
	out
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
	match &tree.get(id).kind {
		NodeKind::Document | NodeKind::Fragment => {
			for child in tree.children(id) {
				write_node(tree, *child, out);
			}
		}
		NodeKind::Text(text) => {
			let raw = tree
				.parent(id)
				.and_then(|parent| tree.tag(parent))
				.is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
			if raw {
				out.push_str(text);
			} else {
				escape_text(text, out);
			}
		}
		NodeKind::Comment(text) => {
			out.push_str("<!--");
			out.push_str(text);
			out.push_str("-->");
		}
		NodeKind::Element(element) => {
			out.push('<');
			out.push_str(&element.tag);
			for (name, value) in &element.attrs {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				escape_attribute(value, out);
				out.push('"');
			}
			out.push('>');
			if VOID_ELEMENTS.contains(&element.tag.as_str()) {
				return;
			}
			for child in tree.children(id) {
				write_node(tree, *child, out);
			}
			out.push_str("</");
			out.push_str(&element.tag);
			out.push('>');
		}
	}
}

fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(c),
		}
	}
}

fn escape_attribute(value: &str, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(c),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("<!DOCTYPE html><html><body></body></html>", true)]
	#[case("  <html lang=\"en\">", true)]
	#[case("<div id=\"content\"></div>", false)]
	#[case("plain text", false)]
	fn test_is_full_document(#[case] markup: &str, #[case] expected: bool) {
		assert_eq!(is_full_document(markup), expected);
	}

	#[rstest]
	#[case("<p>a &amp; b &lt; c</p>")]
	#[case("<input type=\"text\"><br>")]
	#[case("<ul><li>one</li><!-- note --><li>two</li></ul>")]
	#[case("<div title=\"say &quot;hi&quot;\">x</div>")]
	fn test_fragment_serialization_is_stable(#[case] markup: &str) {
		let mut tree = Tree::default();
		let fragment = parse_fragment(&mut tree, markup);
		assert_eq!(serialize_children(&tree, fragment), markup);
	}

	#[rstest]
	fn test_template_contents_stay_under_template() {
		let mut tree = Tree::default();
		let fragment = parse_fragment(&mut tree, "<template><li>x</li></template>");
		let template = tree.children(fragment)[0];
		assert!(tree.is_template(template));
		assert_eq!(serialize(&tree, template), "<template><li>x</li></template>");
	}

	#[rstest]
	fn test_nested_template_contents_survive_parsing() {
		let mut tree = Tree::default();
		let fragment = parse_fragment(
			&mut tree,
			"<ul><template mx-item=\"todos\"><li><template><b>inner</b></template></li></template></ul>",
		);
		assert_eq!(
			serialize_children(&tree, fragment),
			"<ul><template mx-item=\"todos\"><li><template><b>inner</b></template></li></template></ul>"
		);
	}

	#[rstest]
	fn test_document_templates_keep_contents() {
		let mut tree = Tree::default();
		let html = parse_document(
			&mut tree,
			"<!DOCTYPE html><html><head></head><body><template id=\"t\"><p>row</p></template></body></html>",
		);
		assert_eq!(
			serialize_children(&tree, html),
			"<head></head><body><template id=\"t\"><p>row</p></template></body>"
		);
	}

	#[rstest]
	fn test_parse_document_keeps_head_and_body() {
		let mut tree = Tree::default();
		let html = parse_document(
			&mut tree,
			"<!DOCTYPE html><html><head><title>T</title></head><body><main>m</main></body></html>",
		);
		assert_eq!(tree.tag(html), Some("html"));
		assert_eq!(
			serialize_children(&tree, html),
			"<head><title>T</title></head><body><main>m</main></body>"
		);
	}
}
