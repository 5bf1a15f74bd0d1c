//! Runtime values shared by proxies, directives and expressions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use mx_dom::{Event, Node};

use crate::class_list::ClassList;
use crate::error::Result;
use crate::items::{ItemArray, SubArray};
use crate::proxy::Proxy;
use crate::registry::Mx;

/// Shared, mutable plain array.
pub type Array = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable plain object with insertion-ordered keys.
pub type Object = Rc<RefCell<IndexMap<String, Value>>>;

/// Arguments handed to a [`Function`].
pub struct CallContext<'a> {
	pub mx: &'a Mx,
	/// Receiver of the call: the component proxy for methods.
	pub this: &'a Value,
	pub args: &'a [Value],
}

impl CallContext<'_> {
	/// Positional argument, `Undefined` when missing.
	pub fn arg(&self, index: usize) -> Value {
		self.args.get(index).cloned().unwrap_or(Value::Undefined)
	}

	/// The receiver as a proxy, if it is one.
	pub fn this_proxy(&self) -> Option<&Proxy> {
		match self.this {
			Value::Proxy(proxy) => Some(proxy),
			_ => None,
		}
	}
}

type NativeFn = dyn Fn(&CallContext<'_>) -> Result<Value>;

/// A callable value: component methods, watchers and built-ins.
#[derive(Clone)]
pub struct Function {
	name: Rc<str>,
	call: Rc<NativeFn>,
}

impl Function {
	pub fn new(name: &str, call: impl Fn(&CallContext<'_>) -> Result<Value> + 'static) -> Self {
		Self {
			name: Rc::from(name),
			call: Rc::new(call),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self, mx: &Mx, this: &Value, args: &[Value]) -> Result<Value> {
		(self.call)(&CallContext { mx, this, args })
	}

	pub fn ptr_eq(&self, other: &Function) -> bool {
		Rc::ptr_eq(&self.call, &other.call)
	}
}

/// A dynamically typed value with JavaScript-like coercions.
#[derive(Clone, Default)]
pub enum Value {
	#[default]
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Array(Array),
	Object(Object),
	Proxy(Proxy),
	Items(ItemArray),
	SubArray(SubArray),
	ClassList(ClassList),
	Element(Node),
	Event(Event),
	Function(Function),
}

/// Formats a number the way `String(n)` does for the common cases.
pub fn format_number(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_string()
	} else if n.is_infinite() {
		if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
	} else if n == n.trunc() && n.abs() < 1e21 {
		format!("{}", n as i64)
	} else {
		format!("{}", n)
	}
}

impl Value {
	pub fn array(values: Vec<Value>) -> Self {
		Self::Array(Rc::new(RefCell::new(values)))
	}

	pub fn object(entries: IndexMap<String, Value>) -> Self {
		Self::Object(Rc::new(RefCell::new(entries)))
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Self::Undefined)
	}

	/// `null` or `undefined`.
	pub fn is_nullish(&self) -> bool {
		matches!(self, Self::Undefined | Self::Null)
	}

	pub fn truthy(&self) -> bool {
		match self {
			Self::Undefined | Self::Null => false,
			Self::Bool(b) => *b,
			Self::Number(n) => *n != 0.0 && !n.is_nan(),
			Self::String(s) => !s.is_empty(),
			_ => true,
		}
	}

	pub fn type_of(&self) -> &'static str {
		match self {
			Self::Undefined => "undefined",
			Self::Bool(_) => "boolean",
			Self::Number(_) => "number",
			Self::String(_) => "string",
			Self::Function(_) => "function",
			_ => "object",
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_proxy(&self) -> Option<&Proxy> {
		match self {
			Self::Proxy(proxy) => Some(proxy),
			_ => None,
		}
	}

	pub fn as_items(&self) -> Option<&ItemArray> {
		match self {
			Self::Items(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_sub_array(&self) -> Option<&SubArray> {
		match self {
			Self::SubArray(array) => Some(array),
			_ => None,
		}
	}

	pub fn as_class_list(&self) -> Option<&ClassList> {
		match self {
			Self::ClassList(list) => Some(list),
			_ => None,
		}
	}

	pub fn as_element(&self) -> Option<&Node> {
		match self {
			Self::Element(node) => Some(node),
			_ => None,
		}
	}

	/// `String(value)`.
	pub fn to_js_string(&self) -> String {
		match self {
			Self::Undefined => "undefined".to_string(),
			Self::Null => "null".to_string(),
			Self::Bool(b) => b.to_string(),
			Self::Number(n) => format_number(*n),
			Self::String(s) => s.clone(),
			Self::Array(_) | Self::Items(_) | Self::SubArray(_) => self
				.list_values()
				.unwrap_or_default()
				.iter()
				.map(|value| if value.is_nullish() { String::new() } else { value.to_js_string() })
				.collect::<Vec<_>>()
				.join(","),
			Self::ClassList(list) => list.value(),
			Self::Object(_) | Self::Proxy(_) => "[object Object]".to_string(),
			Self::Element(_) => "[object HTMLElement]".to_string(),
			Self::Event(_) => "[object Event]".to_string(),
			Self::Function(function) => format!("function {}() {{ [native code] }}", function.name()),
		}
	}

	/// Like [`Value::to_js_string`] but `null`/`undefined` become `""`.
	pub fn to_display_string(&self) -> String {
		if self.is_nullish() {
			String::new()
		} else {
			self.to_js_string()
		}
	}

	/// `Number(value)`.
	pub fn to_number(&self) -> f64 {
		match self {
			Self::Undefined => f64::NAN,
			Self::Null => 0.0,
			Self::Bool(b) => f64::from(u8::from(*b)),
			Self::Number(n) => *n,
			Self::String(s) => {
				let trimmed = s.trim();
				if trimmed.is_empty() {
					0.0
				} else {
					trimmed.parse::<f64>().unwrap_or(f64::NAN)
				}
			}
			_ => f64::NAN,
		}
	}

	/// Elements of any array-like value.
	pub fn list_values(&self) -> Option<Vec<Value>> {
		match self {
			Self::Array(array) => Some(array.borrow().clone()),
			Self::Items(items) => Some(items.to_vec().into_iter().map(Value::Proxy).collect()),
			Self::SubArray(array) => Some(array.values()),
			Self::ClassList(list) => Some(list.tokens().into_iter().map(Value::String).collect()),
			_ => None,
		}
	}

	/// `===`
	pub fn strict_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::String(a), Self::String(b)) => a == b,
			(Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
			(Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
			(Self::Proxy(a), Self::Proxy(b)) => a.ptr_eq(b),
			(Self::Items(a), Self::Items(b)) => a.ptr_eq(b),
			(Self::SubArray(a), Self::SubArray(b)) => a.ptr_eq(b),
			(Self::ClassList(a), Self::ClassList(b)) => a.ptr_eq(b),
			(Self::Element(a), Self::Element(b)) => a == b,
			(Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// `==`
	pub fn loose_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(a, b) if a.is_nullish() && b.is_nullish() => true,
			(a, b) if a.is_nullish() || b.is_nullish() => false,
			(Self::Number(_), Self::String(_))
			| (Self::String(_), Self::Number(_))
			| (Self::Bool(_), _)
			| (_, Self::Bool(_)) => {
				let (a, b) = (self.to_number(), other.to_number());
				a == b
			}
			(Self::ClassList(list), Self::String(s)) | (Self::String(s), Self::ClassList(list)) => list.value() == *s,
			_ => self.strict_eq(other),
		}
	}

	/// Converts JSON into plain values.
	pub fn from_json(json: &serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Self::Null,
			serde_json::Value::Bool(b) => Self::Bool(*b),
			serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Self::String(s.clone()),
			serde_json::Value::Array(values) => Self::array(values.iter().map(Self::from_json).collect()),
			serde_json::Value::Object(map) => Self::object(
				map.iter()
					.map(|(key, value)| (key.clone(), Self::from_json(value)))
					.collect(),
			),
		}
	}

	/// Converts to JSON. Functions, elements and events have no JSON form and become `null`.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Self::Undefined | Self::Null => serde_json::Value::Null,
			Self::Bool(b) => serde_json::Value::Bool(*b),
			Self::Number(n) => {
				if n.is_finite() && *n == n.trunc() && n.abs() < 9e15 {
					serde_json::Value::from(*n as i64)
				} else {
					serde_json::Number::from_f64(*n)
						.map(serde_json::Value::Number)
						.unwrap_or(serde_json::Value::Null)
				}
			}
			Self::String(s) => serde_json::Value::String(s.clone()),
			Self::Array(_) | Self::Items(_) | Self::SubArray(_) | Self::ClassList(_) => serde_json::Value::Array(
				self.list_values()
					.unwrap_or_default()
					.iter()
					.map(Value::to_json)
					.collect(),
			),
			Self::Object(object) => serde_json::Value::Object(
				object
					.borrow()
					.iter()
					.filter(|(_, value)| !matches!(value, Value::Function(_)))
					.map(|(key, value)| (key.clone(), value.to_json()))
					.collect(),
			),
			Self::Proxy(proxy) => proxy.to_json(),
			Self::Element(_) | Self::Event(_) | Self::Function(_) => serde_json::Value::Null,
		}
	}

	/// Recursively copies plain arrays and objects; everything else is shared.
	pub fn deep_copy(&self) -> Self {
		match self {
			Self::Array(array) => Self::array(array.borrow().iter().map(Value::deep_copy).collect()),
			Self::Object(object) => Self::object(
				object
					.borrow()
					.iter()
					.map(|(key, value)| (key.clone(), value.deep_copy()))
					.collect(),
			),
			other => other.clone(),
		}
	}

	/// Reads one property without evaluating getters.
	pub fn get_property(&self, key: &str) -> Value {
		match self {
			Self::Proxy(proxy) => proxy.get(key),
			Self::Object(object) => object.borrow().get(key).cloned().unwrap_or_default(),
			Self::String(s) if key == "length" => Self::Number(s.chars().count() as f64),
			_ => {
				let Some(values) = self.list_values() else {
					return Self::Undefined;
				};
				if key == "length" {
					return Self::Number(values.len() as f64);
				}
				key.parse::<usize>()
					.ok()
					.and_then(|index| values.get(index).cloned())
					.unwrap_or_default()
			}
		}
	}

	/// Follows a dotted path (`user.name`, `items.0.title`).
	pub fn lookup_path(&self, path: &str) -> Value {
		path.split('.')
			.filter(|segment| !segment.is_empty())
			.fold(self.clone(), |value, segment| value.get_property(segment))
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.strict_eq(other)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Undefined => write!(f, "undefined"),
			Self::Null => write!(f, "null"),
			Self::Bool(b) => write!(f, "{}", b),
			Self::Number(n) => write!(f, "{}", format_number(*n)),
			Self::String(s) => write!(f, "{:?}", s),
			Self::Array(array) => f.debug_list().entries(array.borrow().iter()).finish(),
			Self::Object(object) => f.debug_map().entries(object.borrow().iter()).finish(),
			Self::Proxy(proxy) => write!(f, "Proxy({})", proxy.to_json()),
			Self::Items(items) => write!(f, "Items(len={})", items.len()),
			Self::SubArray(array) => f.debug_tuple("SubArray").field(&array.values()).finish(),
			Self::ClassList(list) => f.debug_tuple("ClassList").field(&list.tokens()).finish(),
			Self::Element(node) => write!(f, "Element({:?})", node),
			Self::Event(event) => write!(f, "Event({})", event.event_type()),
			Self::Function(function) => write!(f, "Function({})", function.name()),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_js_string())
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Number(f64::from(value))
	}
}

impl From<usize> for Value {
	fn from(value: usize) -> Self {
		Self::Number(value as f64)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(values: Vec<Value>) -> Self {
		Self::array(values)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		Self::from_json(&json)
	}
}

impl From<Proxy> for Value {
	fn from(proxy: Proxy) -> Self {
		Self::Proxy(proxy)
	}
}

impl From<Node> for Value {
	fn from(node: Node) -> Self {
		Self::Element(node)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Value::Number(3.0), "3")]
	#[case(Value::Number(-0.0), "0")]
	#[case(Value::Number(2.5), "2.5")]
	#[case(Value::Number(f64::NAN), "NaN")]
	#[case(Value::Null, "null")]
	#[case(Value::from(json!([1, null, "a"])), "1,,a")]
	fn test_to_js_string(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.to_js_string(), expected);
	}

	#[rstest]
	#[case(Value::from(""), false)]
	#[case(Value::from("0"), true)]
	#[case(Value::Number(0.0), false)]
	#[case(Value::Number(f64::NAN), false)]
	#[case(Value::array(Vec::new()), true)]
	#[case(Value::Undefined, false)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.truthy(), expected);
	}

	#[rstest]
	fn test_loose_and_strict_equality() {
		assert!(Value::from("1").loose_eq(&Value::Number(1.0)));
		assert!(!Value::from("1").strict_eq(&Value::Number(1.0)));
		assert!(Value::Null.loose_eq(&Value::Undefined));
		assert!(!Value::Null.loose_eq(&Value::Number(0.0)));
		assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));
	}

	#[rstest]
	fn test_json_conversion_keeps_integers() {
		let json = json!({"name": "Ada", "age": 36, "tags": ["x"], "ratio": 0.5});
		assert_eq!(Value::from_json(&json).to_json(), json);
	}

	#[rstest]
	fn test_deep_copy_detaches_nested_arrays() {
		let original = Value::from(json!({"items": [1, 2]}));
		let copy = original.deep_copy();
		if let Value::Array(items) = copy.get_property("items") {
			items.borrow_mut().push(Value::Number(3.0));
		}
		assert_eq!(original.lookup_path("items.length"), Value::Number(2.0));
		assert_eq!(copy.lookup_path("items.length"), Value::Number(3.0));
	}
}
