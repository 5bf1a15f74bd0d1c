//! Directive attribute grammar.
//!
//! | Attribute | Directive |
//! |-----------|-----------|
//! | `mx-data="name"` / `mx-data="name()"` | [`Directive::Data`] |
//! | `mx-ref="alias"` | [`Directive::Ref`] |
//! | `:attr` / `mx-bind:attr` (`:attr:parser`) | [`Directive::Bind`] |
//! | `mx-attrs` / `mx-attrs:group` | [`Directive::Attrs`] |
//! | `mx-item="path"` | [`Directive::Item`] |
//! | `::attr` / `mx-item:attr` (`.array`, `:parser`) | [`Directive::ItemBind`] |
//! | `@event.mod` / `mx-on:event.mod` | [`Directive::On`] |
//! | `mx-show`, `mx-transition`, `mx-cloak` | visibility |
//! | `mx-load`, `mx-link`, `mx-target`, `mx-select` | navigation |
//! | `mx-swap-template`, `mx-trigger`, `mx-template` | templates |
//!
//! Attribute names arrive lowercased from the HTML parser, so camelCase event
//! modifiers (`@clickPrevent`) are recognised by suffix.

use mx_dom::Node;

use crate::hydration::EventBinding;

pub const DATA_ATTR: &str = "mx-data";
pub const REF_ATTR: &str = "mx-ref";
pub const ITEM_ATTR: &str = "mx-item";
pub const TEMPLATE_ATTR: &str = "mx-template";
pub const CLOAK_ATTR: &str = "mx-cloak";

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
	Data(String),
	Ref(String),
	Bind {
		attr: String,
		parser: Option<String>,
		path: String,
	},
	Attrs {
		group: Option<String>,
		path: String,
	},
	Item(String),
	ItemBind {
		attr: String,
		parser: Option<String>,
		array: bool,
		path: String,
	},
	On {
		binding: EventBinding,
		expr: String,
	},
	Show(String),
	Transition(String),
	Cloak,
	Load(String),
	Link(String),
	Target(String),
	Select(String),
	SwapTemplate(String),
	Trigger(String),
	Template(String),
}

/// Splits `attr:parser` into its parts.
fn split_parser(rest: &str) -> (String, Option<String>) {
	match rest.split_once(':') {
		Some((attr, parser)) if !parser.is_empty() => (attr.to_string(), Some(parser.to_string())),
		Some((attr, _)) => (attr.to_string(), None),
		None => (rest.to_string(), None),
	}
}

/// Parses one attribute. Returns `None` for ordinary attributes.
pub fn parse_directive(name: &str, value: &str) -> Option<Directive> {
	let value_string = value.trim().to_string();
	let directive = match name {
		DATA_ATTR => Directive::Data(value_string),
		REF_ATTR => Directive::Ref(value_string),
		ITEM_ATTR => Directive::Item(value_string),
		"mx-attrs" => Directive::Attrs {
			group: None,
			path: value_string,
		},
		"mx-show" => Directive::Show(value_string),
		"mx-transition" => Directive::Transition(value_string),
		CLOAK_ATTR => Directive::Cloak,
		"mx-load" => Directive::Load(value_string),
		"mx-link" => Directive::Link(value_string),
		"mx-target" => Directive::Target(value_string),
		"mx-select" => Directive::Select(value_string),
		"mx-swap-template" => Directive::SwapTemplate(value_string),
		"mx-trigger" => Directive::Trigger(value_string),
		TEMPLATE_ATTR => Directive::Template(value_string),
		_ => return parse_prefixed(name, value_string),
	};
	Some(directive)
}

fn parse_prefixed(name: &str, value: String) -> Option<Directive> {
	if let Some(rest) = name.strip_prefix("::").or_else(|| name.strip_prefix("mx-item:")) {
		let (rest, array) = match rest.strip_suffix(".array") {
			Some(rest) => (rest, true),
			None => (rest, false),
		};
		let (attr, parser) = split_parser(rest);
		// `::text.array:number` puts the modifier before the parser.
		let (attr, array) = match attr.strip_suffix(".array") {
			Some(attr) => (attr.to_string(), true),
			None => (attr, array),
		};
		if attr.is_empty() {
			return None;
		}
		return Some(Directive::ItemBind {
			attr,
			parser,
			array,
			path: value,
		});
	}
	if let Some(group) = name.strip_prefix("mx-attrs:") {
		return Some(Directive::Attrs {
			group: Some(group.to_string()).filter(|group| !group.is_empty()),
			path: value,
		});
	}
	if let Some(rest) = name.strip_prefix(':').or_else(|| name.strip_prefix("mx-bind:")) {
		let (attr, parser) = split_parser(rest);
		if attr.is_empty() {
			return None;
		}
		return Some(Directive::Bind {
			attr,
			parser,
			path: value,
		});
	}
	if let Some(rest) = name.strip_prefix('@').or_else(|| name.strip_prefix("mx-on:")) {
		let binding = EventBinding::parse(rest)?;
		return Some(Directive::On { binding, expr: value });
	}
	None
}

/// Directives on `element`, in attribute order.
pub fn directives(element: &Node) -> Vec<Directive> {
	element
		.attributes()
		.iter()
		.filter_map(|(name, value)| parse_directive(name, value))
		.collect()
}

/// Whether `name` is a directive attribute (excluded from `mx-attrs` snapshots).
pub fn is_directive_attribute(name: &str) -> bool {
	name.starts_with("mx-") || name.starts_with(':') || name.starts_with('@')
}

/// `"todo()"` names a factory: one instance per element.
pub fn split_factory_call(name: &str) -> (&str, bool) {
	match name.trim().strip_suffix("()") {
		Some(name) => (name.trim(), true),
		None => (name.trim(), false),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(":text", Directive::Bind { attr: "text".into(), parser: None, path: "count".into() })]
	#[case("mx-bind:class", Directive::Bind { attr: "class".into(), parser: None, path: "count".into() })]
	#[case(":text:number", Directive::Bind { attr: "text".into(), parser: Some("number".into()), path: "count".into() })]
	#[case("::text", Directive::ItemBind { attr: "text".into(), parser: None, array: false, path: "count".into() })]
	#[case("mx-item:title", Directive::ItemBind { attr: "title".into(), parser: None, array: false, path: "count".into() })]
	#[case("::text.array", Directive::ItemBind { attr: "text".into(), parser: None, array: true, path: "count".into() })]
	#[case("::text:number.array", Directive::ItemBind { attr: "text".into(), parser: Some("number".into()), array: true, path: "count".into() })]
	#[case("mx-attrs:primary", Directive::Attrs { group: Some("primary".into()), path: "count".into() })]
	#[case("mx-show", Directive::Show("count".into()))]
	fn test_parse_directive(#[case] name: &str, #[case] expected: Directive) {
		assert_eq!(parse_directive(name, " count "), Some(expected));
	}

	#[rstest]
	#[case("class")]
	#[case("href")]
	#[case(":")]
	#[case("data-x")]
	fn test_plain_attributes_are_not_directives(#[case] name: &str) {
		assert_eq!(parse_directive(name, "x"), None);
	}

	#[rstest]
	fn test_event_directive() {
		let Some(Directive::On { binding, expr }) = parse_directive("@click.prevent", "open = true") else {
			panic!("expected event directive");
		};
		assert_eq!(binding.event_type, "click");
		assert!(binding.prevent_default);
		assert_eq!(expr, "open = true");
	}

	#[rstest]
	#[case("todo()", ("todo", true))]
	#[case(" counter ", ("counter", false))]
	fn test_split_factory_call(#[case] raw: &str, #[case] expected: (&str, bool)) {
		assert_eq!(split_factory_call(raw), expected);
	}
}
