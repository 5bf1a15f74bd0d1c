//! Binding directives
//!
//! `:attr="path"` reads the element's current DOM value into the bound
//! property and registers a reaction for later writes. When the DOM has
//! nothing to say (empty text, missing attribute) and the state already holds
//! a value, the state is rendered instead.

use std::rc::Rc;

use mx_dom::{Event, Node};

use crate::class_list::{ClassList, class_tokens};
use crate::parse::{ValueParser, parse_attribute_value, parse_content_value};
use crate::proxy::Proxy;
use crate::reaction::{DomReaction, Formatter, Reaction, ReactionKind, camel_to_kebab, resolve_reaction};
use crate::registry::Mx;
use crate::value::Value;
use crate::warn_log;

use super::scope::resolve_path;

/// A named parser together with its configuration.
#[derive(Clone)]
pub(crate) struct BoundParser {
	parser: Rc<dyn ValueParser>,
	config: serde_json::Value,
}

impl BoundParser {
	pub(crate) fn lookup(mx: &Mx, name: Option<&str>) -> Option<Self> {
		let name = name?;
		let Some(parser) = mx.parser(name) else {
			warn_log!(mx, "unknown value parser '{}'", name);
			return None;
		};
		let config = mx.config().parser_settings(name);
		Some(Self { parser, config })
	}

	fn parse(&self, raw: &str, element: &Node) -> Value {
		self.parser.parse(raw, element, &self.config)
	}

	pub(crate) fn formatter(&self, element: &Node) -> Formatter {
		let parser = self.parser.clone();
		let config = self.config.clone();
		let element = element.clone();
		Rc::new(move |value: &Value| Value::String(parser.format(value, &element, &config)))
	}
}

/// The current DOM value of `attr` and whether the DOM is silent about it.
pub(crate) fn read_dom(element: &Node, kind: &ReactionKind, parser: Option<&BoundParser>) -> (Value, bool) {
	let parse = |raw: &str, fallback: fn(&str) -> Value| match parser {
		Some(parser) => parser.parse(raw, element),
		None => fallback(raw),
	};
	match kind {
		ReactionKind::Text => {
			let raw = element.text_content();
			(parse(&raw, parse_content_value), raw.trim().is_empty())
		}
		ReactionKind::Html => {
			let raw = element.inner_html();
			(parse(&raw, parse_content_value), raw.trim().is_empty())
		}
		ReactionKind::Class => {
			let tokens = element.class_list();
			let silent = tokens.is_empty();
			(Value::array(tokens.into_iter().map(Value::String).collect()), silent)
		}
		ReactionKind::Attribute(name) if name == "checked" => {
			let checked = element.checked();
			(Value::Bool(checked), !checked && !element.has_attribute("checked"))
		}
		ReactionKind::Attribute(name) if name == "value" && element.has_value_property() => {
			let raw = element.value();
			if raw.is_empty() {
				(Value::String(String::new()), true)
			} else {
				(parse(&raw, parse_attribute_value), false)
			}
		}
		ReactionKind::Attribute(name) => match element.get_attribute(&camel_to_kebab(name)) {
			Some(raw) => (parse(&raw, parse_attribute_value), false),
			None => (Value::Undefined, true),
		},
	}
}

/// Hydrates `proxy[key]` from `element` and binds it for future writes.
///
/// With `state_wins` (items created from data) a defined state value is always
/// rendered over the DOM content.
pub(crate) fn bind_property(
	mx: &Mx,
	proxy: &Proxy,
	key: &str,
	element: &Node,
	attr: &str,
	parser: Option<&str>,
	state_wins: bool,
) {
	let parser = BoundParser::lookup(mx, parser);
	let kind = ReactionKind::for_attribute(attr);
	let formatter = parser.as_ref().map(|parser| parser.formatter(element));
	let reaction = DomReaction::new(element.clone(), kind.clone()).with_formatter(formatter);

	let (dom_value, silent) = read_dom(element, &kind, parser.as_ref());
	let state = proxy.get(key);
	if !state.is_undefined() && (silent || state_wins) {
		resolve_reaction(&reaction, &state, &Value::Undefined);
		if kind == ReactionKind::Class && matches!(state, Value::String(_) | Value::Array(_)) {
			let list = ClassList::bound(element, class_tokens(&state));
			proxy.set_silent(key, Value::ClassList(list));
		}
	} else if kind == ReactionKind::Class {
		let list = ClassList::bound(element, class_tokens(&dom_value));
		proxy.set_silent(key, Value::ClassList(list));
	} else if !dom_value.is_undefined() {
		proxy.set_silent(key, dom_value);
	}

	proxy.register_reaction(key, Reaction::Dom(reaction));
	if matches!(&kind, ReactionKind::Attribute(name) if name == "value" || name == "checked") {
		bind_two_way(element, proxy, key, &kind);
	}
}

/// Form controls write user input back into the bound property.
fn bind_two_way(element: &Node, proxy: &Proxy, key: &str, kind: &ReactionKind) {
	let checked = matches!(kind, ReactionKind::Attribute(name) if name == "checked");
	let tag = element.tag_name().unwrap_or_default();
	let input_type = element.get_attribute("type").unwrap_or_default().to_lowercase();
	let event_type = if checked || tag == "select" || matches!(input_type.as_str(), "checkbox" | "radio") {
		"change"
	} else {
		"input"
	};
	let numeric = matches!(input_type.as_str(), "number" | "range");
	let weak = proxy.downgrade();
	let key = key.to_string();
	let source = element.clone();
	element.add_event_listener(event_type, move |_: &Event| {
		let Some(proxy) = weak.upgrade() else {
			return;
		};
		let value = if checked {
			Value::Bool(source.checked())
		} else if numeric {
			Value::Number(source.value().parse::<f64>().unwrap_or(f64::NAN))
		} else {
			Value::String(source.value())
		};
		proxy.set(&key, value);
	});
}

/// Handles one `:attr="path"` directive.
pub(crate) fn bind(mx: &Mx, element: &Node, attr: &str, parser: Option<&str>, path: &str) {
	let Some((proxy, key)) = resolve_path(mx, element, path) else {
		warn_log!(mx, "cannot resolve scope for :{}=\"{}\"", attr, path);
		return;
	};
	bind_property(mx, &proxy, &key, element, attr, parser, false);
}
