//! Smart swap: where to put a response that came without strategies.
//!
//! 1. top-level elements of the response whose `id` exists in the document
//!    are morphed into those elements;
//! 2. a full document is morphed into `document.body`;
//! 3. anything else is left alone.

use mx_dom::{DomError, Node, Selector};

use crate::registry::Mx;

use super::morph;
use super::strategy::{SelectorSpec, SwapMode};

/// A resolved smart-swap destination.
#[derive(Debug, Clone)]
pub(crate) enum SmartTarget {
	/// A live element matched by `id`.
	Element { live: Node, incoming: Node, id: String },
	/// The document body, from a full-document response.
	Body { incoming: Node, title: Option<String> },
}

fn id_selector(id: &str) -> String {
	let plain = id
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
	if plain && !id.starts_with(|c: char| c.is_ascii_digit()) {
		format!("#{}", id)
	} else {
		format!("[id=\"{}\"]", id.replace('\\', "\\\\").replace('"', "\\\""))
	}
}

fn first_match(root: &Node, selector: &str) -> Option<Node> {
	let selector = Selector::parse(selector).ok()?;
	root.select_first(&selector)
}

impl SmartTarget {
	/// Where the snapshot for history restoration is taken.
	pub(crate) fn snapshot_spec(&self) -> SelectorSpec {
		match self {
			Self::Element { id, .. } => SelectorSpec {
				selector: id_selector(id),
				mode: SwapMode::OuterHtml,
			},
			Self::Body { .. } => SelectorSpec {
				selector: "body".to_string(),
				mode: SwapMode::InnerHtml,
			},
		}
	}

	pub(crate) fn apply(&self, mx: &Mx) -> Result<(), DomError> {
		match self {
			Self::Element { live, incoming, .. } => morph::morph(live, incoming),
			Self::Body { incoming, title } => {
				morph::morph_children(&mx.document().body(), incoming)?;
				if let Some(title) = title {
					mx.document().set_title(title);
				}
				Ok(())
			}
		}
	}
}

/// Resolves the smart-swap destinations of a parsed response. `full_document`
/// is the `<html>` element when the response was a complete document.
pub(crate) fn resolve(mx: &Mx, source: &Node, full_document: bool) -> Vec<SmartTarget> {
	let roots = if full_document { vec![source.clone()] } else { source.children() };
	let document = mx.document();
	let by_id: Vec<SmartTarget> = roots
		.iter()
		.filter_map(|incoming| {
			let id = incoming.get_attribute("id").filter(|id| !id.is_empty())?;
			let live = document.get_element_by_id(&id)?;
			Some(SmartTarget::Element {
				live,
				incoming: incoming.clone(),
				id,
			})
		})
		.collect();
	if !by_id.is_empty() {
		return by_id;
	}
	if full_document && let Some(body) = first_match(source, "body") {
		let title = first_match(source, "title")
			.map(|title| title.text_content().trim().to_string())
			.filter(|title| !title.is_empty());
		return vec![SmartTarget::Body { incoming: body, title }];
	}
	Vec::new()
}
