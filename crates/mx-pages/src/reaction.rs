//! Reactions: what happens to the DOM when a proxy property changes.

use std::fmt;
use std::rc::Rc;

use mx_dom::Node;

use crate::class_list::class_tokens;
use crate::value::Value;

/// Maps a property value to the value that is written to the DOM.
pub type Formatter = Rc<dyn Fn(&Value) -> Value>;

/// Which aspect of the element a [`DomReaction`] renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionKind {
	Text,
	Html,
	/// Attribute (or the `value`/`checked` properties) by name.
	Attribute(String),
	Class,
}

impl ReactionKind {
	/// Kind for a bound attribute name (`text`, `html`, `class`, anything else).
	pub fn for_attribute(name: &str) -> Self {
		match name {
			"text" => Self::Text,
			"html" => Self::Html,
			"class" => Self::Class,
			other => Self::Attribute(other.to_string()),
		}
	}
}

/// One element bound to one property.
#[derive(Clone)]
pub struct DomReaction {
	pub element: Node,
	pub kind: ReactionKind,
	pub formatter: Option<Formatter>,
}

impl DomReaction {
	pub fn new(element: Node, kind: ReactionKind) -> Self {
		Self {
			element,
			kind,
			formatter: None,
		}
	}

	pub fn with_formatter(mut self, formatter: Option<Formatter>) -> Self {
		self.formatter = formatter;
		self
	}
}

impl fmt::Debug for DomReaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DomReaction")
			.field("element", &self.element)
			.field("kind", &self.kind)
			.field("formatted", &self.formatter.is_some())
			.finish()
	}
}

/// Callback reaction receiving `(new, old)`.
pub type Effect = Rc<dyn Fn(&Value, &Value)>;

/// A registered reaction.
#[derive(Clone)]
pub enum Reaction {
	Dom(DomReaction),
	Effect(Effect),
}

impl Reaction {
	pub fn effect(callback: impl Fn(&Value, &Value) + 'static) -> Self {
		Self::Effect(Rc::new(callback))
	}

	pub fn is_class(&self) -> bool {
		matches!(self, Self::Dom(reaction) if reaction.kind == ReactionKind::Class)
	}

	pub fn run(&self, new: &Value, old: &Value) {
		match self {
			Self::Dom(reaction) => resolve_reaction(reaction, new, old),
			Self::Effect(callback) => callback(new, old),
		}
	}
}

impl fmt::Debug for Reaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Dom(reaction) => reaction.fmt(f),
			Self::Effect(_) => f.write_str("Effect"),
		}
	}
}

/// `ariaLabel` -> `aria-label`
pub fn camel_to_kebab(name: &str) -> String {
	let mut out = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			out.push('-');
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
	}
	out
}

/// `data-user-id` -> `dataUserId`
pub fn kebab_to_camel(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut upper = false;
	for c in name.chars() {
		if c == '-' {
			upper = true;
		} else if upper {
			out.push(c.to_ascii_uppercase());
			upper = false;
		} else {
			out.push(c);
		}
	}
	out
}

/// Writes `new` onto the element described by `reaction`. Never fails: every
/// value is coerced to something the DOM accepts.
pub fn resolve_reaction(reaction: &DomReaction, new: &Value, _old: &Value) {
	let formatted;
	let value = match &reaction.formatter {
		Some(format) => {
			formatted = format(new);
			&formatted
		}
		None => new,
	};
	let element = &reaction.element;
	match &reaction.kind {
		ReactionKind::Text => element.set_text_content(&value.to_display_string()),
		ReactionKind::Html => element.set_inner_html(&value.to_display_string()),
		ReactionKind::Class => element.set_class_name(&class_tokens(value).join(" ")),
		ReactionKind::Attribute(name) => {
			if name == "value" && element.has_value_property() {
				element.set_value(&value.to_display_string());
			} else if name == "checked" {
				element.set_checked(value.truthy());
			} else {
				element.set_attribute(&camel_to_kebab(name), &value.to_display_string());
			}
		}
	}
}
