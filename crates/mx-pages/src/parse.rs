//! Attribute value parsing and the pluggable parser registry.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use mx_dom::Node;
use regex::Regex;

use crate::value::{Value, format_number};

static NUMERIC_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").expect("numeric pattern is valid"));

/// Converts an attribute string into a typed value.
///
/// | Input | Result |
/// |-------|--------|
/// | numeric (`"42"`, `"-1.5"`) | number |
/// | `"true"` / `"false"` | boolean |
/// | `"null"` / `"none"` | null |
/// | `"undefined"` | undefined |
/// | `""` (attribute present) | `true` |
/// | anything else | the string |
pub fn parse_attribute_value(raw: &str) -> Value {
	let trimmed = raw.trim();
	if raw.is_empty() {
		return Value::Bool(true);
	}
	if NUMERIC_RE.is_match(trimmed) {
		if let Ok(number) = trimmed.parse::<f64>() {
			return Value::Number(number);
		}
	}
	match trimmed {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		"null" | "none" => Value::Null,
		"undefined" => Value::Undefined,
		_ => Value::String(raw.to_string()),
	}
}

/// Parses element content (`text`/`html` bindings). Unlike attributes, empty content stays `""`.
pub fn parse_content_value(raw: &str) -> Value {
	if raw.trim().is_empty() {
		Value::String(String::new())
	} else {
		parse_attribute_value(raw.trim())
	}
}

/// A named parser selected with a directive suffix (`:text:number="price"`).
pub trait ValueParser {
	/// DOM string to state value.
	fn parse(&self, raw: &str, element: &Node, config: &serde_json::Value) -> Value;
	/// State value to the string written into the DOM.
	fn format(&self, value: &Value, element: &Node, config: &serde_json::Value) -> String;
}

/// Parses localized numbers (`"1,234.50"`) and formats with optional fixed decimals.
///
/// Configuration: `{"decimals": 2, "separator": ","}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberParser;

impl ValueParser for NumberParser {
	fn parse(&self, raw: &str, _element: &Node, _config: &serde_json::Value) -> Value {
		let cleaned: String = raw
			.chars()
			.filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
			.collect();
		if cleaned.is_empty() {
			return Value::Null;
		}
		Value::Number(cleaned.parse::<f64>().unwrap_or(f64::NAN))
	}

	fn format(&self, value: &Value, _element: &Node, config: &serde_json::Value) -> String {
		if value.is_nullish() {
			return String::new();
		}
		let number = value.to_number();
		let formatted = match config.get("decimals").and_then(serde_json::Value::as_u64) {
			Some(decimals) => format!("{:.*}", decimals as usize, number),
			None => format_number(number),
		};
		match config.get("separator").and_then(serde_json::Value::as_str) {
			Some(separator) => group_thousands(&formatted, separator),
			None => formatted,
		}
	}
}

fn group_thousands(formatted: &str, separator: &str) -> String {
	let (sign, unsigned) = match formatted.strip_prefix('-') {
		Some(rest) => ("-", rest),
		None => ("", formatted),
	};
	let (integer, fraction) = match unsigned.split_once('.') {
		Some((integer, fraction)) => (integer, Some(fraction)),
		None => (unsigned, None),
	};
	let mut grouped = String::new();
	for (index, digit) in integer.chars().enumerate() {
		if index > 0 && (integer.len() - index) % 3 == 0 {
			grouped.push_str(separator);
		}
		grouped.push(digit);
	}
	match fraction {
		Some(fraction) => format!("{sign}{grouped}.{fraction}"),
		None => format!("{sign}{grouped}"),
	}
}

/// Parsers by suffix name.
#[derive(Clone)]
pub struct ParserRegistry {
	parsers: HashMap<String, Rc<dyn ValueParser>>,
}

impl Default for ParserRegistry {
	fn default() -> Self {
		let mut registry = Self {
			parsers: HashMap::new(),
		};
		registry.register("number", NumberParser);
		registry
	}
}

impl ParserRegistry {
	pub fn register(&mut self, name: &str, parser: impl ValueParser + 'static) {
		self.parsers.insert(name.to_string(), Rc::new(parser));
	}

	pub fn get(&self, name: &str) -> Option<Rc<dyn ValueParser>> {
		self.parsers.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.parsers.contains_key(name)
	}
}

impl fmt::Debug for ParserRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<&String> = self.parsers.keys().collect();
		names.sort();
		f.debug_struct("ParserRegistry").field("parsers", &names).finish()
	}
}
