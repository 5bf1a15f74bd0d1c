//! CSS selector parsing and matching.
//!
//! Selectors are parsed by the `selectors` crate using scraper's selector
//! implementation, so the full Selectors Level 4 grammar is available
//! (`:nth-child`, `:not(a, b)`, `:is`, `:has`, every attribute operator).
//! Matching runs directly against the arena through [`ElementView`].

use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{self, ElementSelectorFlags, MatchingContext};
use selectors::parser::{ParseRelative, SelectorImpl, SelectorList};
use selectors::{Element, OpaqueElement};

use crate::tree::{NodeId, NodeKind, Tree};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A selector could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
	/// The offending selector text.
	pub selector: String,
	/// Why parsing failed.
	pub reason: String,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	source: String,
	list: SelectorList<Simple>,
}

impl Selector {
	/// Parses a selector list.
	pub fn parse(input: &str) -> Result<Self, SelectorError> {
		let mut parser_input = cssparser::ParserInput::new(input);
		let mut parser = cssparser::Parser::new(&mut parser_input);
		let list = SelectorList::parse(&Parser, &mut parser, ParseRelative::No).map_err(|err| SelectorError {
			selector: input.to_string(),
			reason: scraper::error::SelectorErrorKind::from(err).to_string(),
		})?;
		Ok(Self {
			source: input.to_string(),
			list,
		})
	}

	/// The selector text this was parsed from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub(crate) fn matches(&self, tree: &Tree, id: NodeId) -> bool {
		if !tree.is_element(id) {
			return false;
		}
		let element = ElementView { tree, id };
		let mut caches = matching::SelectorCaches::default();
		let mut context = MatchingContext::new(
			matching::MatchingMode::Normal,
			None,
			&mut caches,
			matching::QuirksMode::NoQuirks,
			matching::NeedsSelectorFlags::No,
			matching::MatchingForInvalidation::No,
		);
		self.list
			.slice()
			.iter()
			.any(|selector| matching::matches_selector(selector, 0, None, &element, &mut context))
	}
}

/// Borrowed element of the arena, as seen by the selector matcher.
#[derive(Clone, Copy)]
struct ElementView<'a> {
	tree: &'a Tree,
	id: NodeId,
}

impl std::fmt::Debug for ElementView<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ElementView")
			.field("id", &self.id)
			.field("tag", &self.tree.tag(self.id))
			.finish()
	}
}

impl<'a> ElementView<'a> {
	fn at(&self, id: NodeId) -> Self {
		Self { tree: self.tree, id }
	}

	fn attr(&self, name: &str) -> Option<&'a str> {
		self.tree.attr(self.id, name)
	}
}

impl Element for ElementView<'_> {
	type Impl = Simple;

	fn opaque(&self) -> OpaqueElement {
		OpaqueElement::new(self.tree.get(self.id))
	}

	fn parent_element(&self) -> Option<Self> {
		self.tree.parent_element(self.id).map(|id| self.at(id))
	}

	fn parent_node_is_shadow_root(&self) -> bool {
		false
	}

	fn containing_shadow_host(&self) -> Option<Self> {
		None
	}

	fn is_pseudo_element(&self) -> bool {
		false
	}

	fn prev_sibling_element(&self) -> Option<Self> {
		self.tree.previous_element_sibling(self.id).map(|id| self.at(id))
	}

	fn next_sibling_element(&self) -> Option<Self> {
		self.tree.next_element_sibling(self.id).map(|id| self.at(id))
	}

	fn first_element_child(&self) -> Option<Self> {
		self.tree
			.children(self.id)
			.iter()
			.copied()
			.find(|child| self.tree.is_element(*child))
			.map(|id| self.at(id))
	}

	fn is_html_element_in_html_document(&self) -> bool {
		true
	}

	fn has_local_name(&self, name: &CssLocalName) -> bool {
		self.tree.tag(self.id) == Some(&*name.0)
	}

	fn has_namespace(&self, namespace: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
		&**namespace == HTML_NAMESPACE
	}

	fn is_same_type(&self, other: &Self) -> bool {
		self.tree.tag(self.id) == other.tree.tag(other.id)
	}

	fn attr_matches(
		&self,
		ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
		local_name: &CssLocalName,
		operation: &AttrSelectorOperation<&CssString>,
	) -> bool {
		// Attributes live in the null namespace.
		if matches!(ns, NamespaceConstraint::Specific(url) if !url.is_empty()) {
			return false;
		}
		self.attr(&local_name.0).is_some_and(|value| operation.eval_str(value))
	}

	fn match_non_ts_pseudo_class(
		&self,
		_pc: &NonTSPseudoClass,
		_context: &mut MatchingContext<'_, Self::Impl>,
	) -> bool {
		false
	}

	fn match_pseudo_element(&self, _pe: &PseudoElement, _context: &mut MatchingContext<'_, Self::Impl>) -> bool {
		false
	}

	fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

	fn is_link(&self) -> bool {
		matches!(self.tree.tag(self.id), Some("a" | "area" | "link")) && self.attr("href").is_some()
	}

	fn is_html_slot_element(&self) -> bool {
		self.tree.tag(self.id) == Some("slot")
	}

	fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
		self.attr("id")
			.is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
	}

	fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
		self.attr("class").is_some_and(|classes| {
			classes
				.split_whitespace()
				.any(|token| case_sensitivity.eq(name.0.as_bytes(), token.as_bytes()))
		})
	}

	fn has_custom_state(&self, _name: &CssLocalName) -> bool {
		false
	}

	fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
		None
	}

	fn is_part(&self, _name: &CssLocalName) -> bool {
		false
	}

	fn is_empty(&self) -> bool {
		!self.tree.children(self.id).iter().any(|child| match &self.tree.get(*child).kind {
			NodeKind::Element(_) => true,
			NodeKind::Text(text) => !text.is_empty(),
			_ => false,
		})
	}

	fn is_root(&self) -> bool {
		self.tree
			.parent(self.id)
			.is_some_and(|parent| matches!(self.tree.get(parent).kind, NodeKind::Document))
	}

	fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
		false
	}
}
