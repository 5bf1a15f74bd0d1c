//! Tree-walking evaluator.

use std::collections::HashMap;

use indexmap::IndexMap;
use mx_dom::{Event, Node};

use super::ExprError;
use super::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
use super::parser::parse_expression;
use crate::class_list::ClassList;
use crate::error::Result;
use crate::items::{ItemArray, SubArray};
use crate::proxy::Proxy;
use crate::registry::Mx;
use crate::value::{Function, Value, format_number};

/// Names visible to an expression.
///
/// Identifiers resolve against `locals` (`$event`, `$el`, `$item`, `$args`),
/// then the properties of `this`, then the registry (`$name` or `name`), then
/// the built-ins (`Math`, `JSON`, `console`, ...).
#[derive(Clone, Default)]
pub struct Scope {
	pub this: Value,
	locals: HashMap<String, Value>,
}

impl Scope {
	pub fn new(this: Value) -> Self {
		Self {
			this,
			locals: HashMap::new(),
		}
	}

	pub fn for_proxy(proxy: &Proxy) -> Self {
		Self::new(Value::Proxy(proxy.clone()))
	}

	pub fn with_local(mut self, name: &str, value: Value) -> Self {
		self.locals.insert(name.to_string(), value);
		self
	}

	pub fn local(&self, name: &str) -> Option<&Value> {
		self.locals.get(name)
	}

	pub fn has_local(&self, name: &str) -> bool {
		self.locals.contains_key(name)
	}
}

/// Parses and evaluates `source` in one step.
pub fn evaluate_str(mx: &Mx, source: &str, scope: &Scope) -> Result<Value> {
	let expr = parse_expression(source)?;
	evaluate(mx, &expr, scope)
}

pub fn evaluate(mx: &Mx, expr: &Expr, scope: &Scope) -> Result<Value> {
	match expr {
		Expr::Literal(literal) => Ok(match literal {
			Literal::Number(n) => Value::Number(*n),
			Literal::String(s) => Value::String(s.clone()),
			Literal::Bool(b) => Value::Bool(*b),
			Literal::Null => Value::Null,
			Literal::Undefined => Value::Undefined,
		}),
		Expr::Ident(name) => Ok(lookup(mx, name, scope)),
		Expr::This => Ok(scope.this.clone()),
		Expr::Array(items) => {
			let values = items
				.iter()
				.map(|item| evaluate(mx, item, scope))
				.collect::<Result<Vec<_>>>()?;
			Ok(Value::array(values))
		}
		Expr::Object(entries) => {
			let mut map = IndexMap::new();
			for (key, value) in entries {
				map.insert(key.clone(), evaluate(mx, value, scope)?);
			}
			Ok(Value::object(map))
		}
		Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => Ok(chain(mx, expr, scope)?.unwrap_or_default()),
		Expr::Unary { op, operand } => {
			let value = evaluate(mx, operand, scope)?;
			Ok(match op {
				UnaryOp::Not => Value::Bool(!value.truthy()),
				UnaryOp::Neg => Value::Number(-value.to_number()),
				UnaryOp::Plus => Value::Number(value.to_number()),
				UnaryOp::TypeOf => Value::from(value.type_of()),
			})
		}
		Expr::Update {
			increment,
			prefix,
			target,
		} => {
			let place = resolve_place(mx, target, scope)?;
			let old = read_place(mx, &place, scope).to_number();
			let new = if *increment { old + 1.0 } else { old - 1.0 };
			write_place(&place, Value::Number(new), scope)?;
			Ok(Value::Number(if *prefix { new } else { old }))
		}
		Expr::Binary { op, left, right } => {
			let left = evaluate(mx, left, scope)?;
			let right = evaluate(mx, right, scope)?;
			Ok(binary(*op, &left, &right))
		}
		Expr::Logical { op, left, right } => {
			let left = evaluate(mx, left, scope)?;
			let short_circuit = match op {
				LogicalOp::And => !left.truthy(),
				LogicalOp::Or => left.truthy(),
				LogicalOp::Nullish => !left.is_nullish(),
			};
			if short_circuit {
				Ok(left)
			} else {
				evaluate(mx, right, scope)
			}
		}
		Expr::Conditional {
			test,
			consequent,
			alternate,
		} => {
			if evaluate(mx, test, scope)?.truthy() {
				evaluate(mx, consequent, scope)
			} else {
				evaluate(mx, alternate, scope)
			}
		}
		Expr::Assign { op, target, value } => {
			let place = resolve_place(mx, target, scope)?;
			let rhs = evaluate(mx, value, scope)?;
			let value = match op {
				AssignOp::Assign => rhs,
				AssignOp::Add => binary(BinaryOp::Add, &read_place(mx, &place, scope), &rhs),
				AssignOp::Sub => binary(BinaryOp::Sub, &read_place(mx, &place, scope), &rhs),
				AssignOp::Mul => binary(BinaryOp::Mul, &read_place(mx, &place, scope), &rhs),
				AssignOp::Div => binary(BinaryOp::Div, &read_place(mx, &place, scope), &rhs),
			};
			write_place(&place, value.clone(), scope)?;
			Ok(value)
		}
		Expr::Sequence(statements) => {
			let mut last = Value::Undefined;
			for statement in statements {
				last = evaluate(mx, statement, scope)?;
			}
			Ok(last)
		}
	}
}

/// Evaluates a member/call chain. `None` means an optional link short-circuited
/// the rest of the chain.
fn chain(mx: &Mx, expr: &Expr, scope: &Scope) -> Result<Option<Value>> {
	match expr {
		Expr::Member {
			object,
			property,
			optional,
		} => {
			let Some(receiver) = chain_receiver(mx, object, property, *optional, scope)? else {
				return Ok(None);
			};
			Ok(Some(get_member(&receiver, property)))
		}
		Expr::Index {
			object,
			index,
			optional,
		} => {
			let key = evaluate(mx, index, scope)?.to_js_string();
			let Some(receiver) = chain_receiver(mx, object, &key, *optional, scope)? else {
				return Ok(None);
			};
			Ok(Some(get_member(&receiver, &key)))
		}
		Expr::Call { callee, args } => call(mx, callee, args, scope),
		other => evaluate(mx, other, scope).map(Some),
	}
}

fn chain_receiver(mx: &Mx, object: &Expr, property: &str, optional: bool, scope: &Scope) -> Result<Option<Value>> {
	let Some(receiver) = chain(mx, object, scope)? else {
		return Ok(None);
	};
	if !receiver.is_nullish() {
		return Ok(Some(receiver));
	}
	if optional {
		return Ok(None);
	}
	Err(ExprError::NullReceiver {
		receiver: receiver.to_js_string(),
		property: property.to_string(),
	}
	.into())
}

fn lookup(mx: &Mx, name: &str, scope: &Scope) -> Value {
	if let Some(value) = scope.local(name) {
		return value.clone();
	}
	if let Value::Proxy(proxy) = &scope.this {
		if proxy.has(name) {
			return proxy.get(name);
		}
	}
	let global = name.strip_prefix('$').unwrap_or(name);
	if let Some(proxy) = mx.get(global) {
		return Value::Proxy(proxy);
	}
	builtin(name).unwrap_or_default()
}

enum Place {
	Ident(String),
	Member(Value, String),
}

fn resolve_place(mx: &Mx, target: &Expr, scope: &Scope) -> Result<Place> {
	match target {
		Expr::Ident(name) => Ok(Place::Ident(name.clone())),
		Expr::Member { object, property, .. } => Ok(Place::Member(evaluate(mx, object, scope)?, property.clone())),
		Expr::Index { object, index, .. } => {
			let receiver = evaluate(mx, object, scope)?;
			let key = evaluate(mx, index, scope)?.to_js_string();
			Ok(Place::Member(receiver, key))
		}
		other => Err(ExprError::InvalidAssignment(format!("{:?}", other)).into()),
	}
}

fn read_place(mx: &Mx, place: &Place, scope: &Scope) -> Value {
	match place {
		Place::Ident(name) => lookup(mx, name, scope),
		Place::Member(receiver, key) => get_member(receiver, key),
	}
}

fn write_place(place: &Place, value: Value, scope: &Scope) -> Result<()> {
	match place {
		Place::Ident(name) => {
			if scope.has_local(name) {
				return Err(ExprError::InvalidAssignment(name.clone()).into());
			}
			match &scope.this {
				Value::Proxy(proxy) => {
					proxy.set(name, value);
					Ok(())
				}
				_ => Err(ExprError::InvalidAssignment(name.clone()).into()),
			}
		}
		Place::Member(receiver, key) => set_member(receiver, key, value),
	}
}

/// Writes `receiver[key] = value`.
pub(crate) fn set_member(receiver: &Value, key: &str, value: Value) -> Result<()> {
	match receiver {
		Value::Proxy(proxy) => proxy.set(key, value),
		Value::Object(object) => {
			object.borrow_mut().insert(key.to_string(), value);
		}
		Value::Array(array) => {
			let Ok(index) = key.parse::<usize>() else {
				return Err(ExprError::InvalidAssignment(format!("array.{}", key)).into());
			};
			let mut array = array.borrow_mut();
			if index >= array.len() {
				array.resize(index + 1, Value::Undefined);
			}
			array[index] = value;
		}
		Value::SubArray(sub_array) => match key.parse::<usize>() {
			Ok(index) => sub_array.set(index, value),
			Err(_) => return Err(ExprError::InvalidAssignment(format!("sub-array.{}", key)).into()),
		},
		Value::ClassList(list) if key == "value" => list.assign(&value),
		Value::Element(element) => set_element_property(element, key, &value),
		other => {
			return Err(ExprError::NullReceiver {
				receiver: other.to_js_string(),
				property: key.to_string(),
			}
			.into());
		}
	}
	Ok(())
}

/// Reads `receiver.key`, including the synthetic members of host values.
pub fn get_member(receiver: &Value, key: &str) -> Value {
	match receiver {
		Value::Element(element) => element_property(element, key),
		Value::Event(event) => event_property(event, key),
		Value::ClassList(list) if key == "value" => Value::String(list.value()),
		_ => receiver.get_property(key),
	}
}

fn element_property(element: &Node, key: &str) -> Value {
	match key {
		"textContent" | "innerText" => Value::String(element.text_content()),
		"innerHTML" => Value::String(element.inner_html()),
		"outerHTML" => Value::String(element.outer_html()),
		"value" => Value::String(element.value()),
		"checked" => Value::Bool(element.checked()),
		"id" => Value::String(element.id()),
		"className" => Value::String(element.class_name()),
		"classList" => Value::ClassList(ClassList::from_element(element)),
		"tagName" => Value::String(element.tag_name().unwrap_or_default().to_uppercase()),
		"parentElement" => element.parent_element().map(Value::Element).unwrap_or(Value::Null),
		"children" => Value::array(element.children().into_iter().map(Value::Element).collect()),
		"isConnected" => Value::Bool(element.is_connected()),
		_ => Value::Undefined,
	}
}

pub(crate) fn set_element_property(element: &Node, key: &str, value: &Value) {
	match key {
		"textContent" | "innerText" => element.set_text_content(&value.to_display_string()),
		"innerHTML" => element.set_inner_html(&value.to_display_string()),
		"value" => element.set_value(&value.to_display_string()),
		"checked" => element.set_checked(value.truthy()),
		"className" => element.set_class_name(&value.to_display_string()),
		"id" => element.set_attribute("id", &value.to_display_string()),
		other => element.set_attribute(&crate::reaction::camel_to_kebab(other), &value.to_display_string()),
	}
}

fn event_property(event: &Event, key: &str) -> Value {
	match key {
		"type" => Value::from(event.event_type()),
		"key" => event.key().map(Value::from).unwrap_or_default(),
		"detail" => Value::from_json(event.detail()),
		"state" => event.state().map(Value::from_json).unwrap_or(Value::Null),
		"target" => event.target().map(Value::Element).unwrap_or(Value::Null),
		"currentTarget" => event.current_target().map(Value::Element).unwrap_or(Value::Null),
		"defaultPrevented" => Value::Bool(event.default_prevented()),
		_ => Value::Undefined,
	}
}

fn call(mx: &Mx, callee: &Expr, args: &[Expr], scope: &Scope) -> Result<Option<Value>> {
	let arguments = |scope: &Scope| -> Result<Vec<Value>> { args.iter().map(|arg| evaluate(mx, arg, scope)).collect() };
	let (receiver, method) = match callee {
		Expr::Member {
			object,
			property,
			optional,
		} => (chain_receiver(mx, object, property, *optional, scope)?, property.clone()),
		Expr::Index {
			object,
			index,
			optional,
		} => {
			let key = evaluate(mx, index, scope)?.to_js_string();
			(chain_receiver(mx, object, &key, *optional, scope)?, key)
		}
		other => {
			return match evaluate(mx, other, scope)? {
				Value::Function(function) => function.call(mx, &scope.this, &arguments(scope)?).map(Some),
				_ => Err(ExprError::NotCallable(callee_name(other)).into()),
			};
		}
	};
	match receiver {
		Some(receiver) => call_method(mx, &receiver, &method, &arguments(scope)?).map(Some),
		None => Ok(None),
	}
}

fn callee_name(expr: &Expr) -> String {
	match expr {
		Expr::Ident(name) => name.clone(),
		other => format!("{:?}", other),
	}
}

fn unknown_method(receiver: &str, method: &str) -> crate::error::MxError {
	ExprError::UnknownMethod {
		receiver: receiver.to_string(),
		method: method.to_string(),
	}
	.into()
}

/// Index argument; negative, fractional or non-numeric values are out of range.
fn index_arg(value: &Value) -> Option<usize> {
	let n = value.to_number();
	(n.is_finite() && n >= 0.0 && n == n.trunc()).then_some(n as usize)
}

fn optional_proxy(proxy: Option<Proxy>) -> Value {
	proxy.map(Value::Proxy).unwrap_or_default()
}

/// Calls `receiver.method(args)`.
pub fn call_method(mx: &Mx, receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
	let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
	match receiver {
		Value::Items(items) => items_method(items, method, args),
		Value::SubArray(sub_array) => sub_array_method(sub_array, method, args),
		Value::ClassList(list) => class_list_method(list, method, args),
		Value::Array(_) => array_method(receiver, method, args),
		Value::String(s) => string_method(s, method, args),
		Value::Element(element) => element_method(element, method, args),
		Value::Event(event) => match method {
			"preventDefault" => {
				event.prevent_default();
				Ok(Value::Undefined)
			}
			"stopPropagation" => {
				event.stop_propagation();
				Ok(Value::Undefined)
			}
			_ => Err(unknown_method("Event", method)),
		},
		Value::Number(n) => match method {
			"toFixed" => {
				let digits = index_arg(&arg(0)).unwrap_or(0);
				Ok(Value::String(format!("{:.*}", digits, n)))
			}
			"toString" => Ok(Value::String(format_number(*n))),
			_ => Err(unknown_method("Number", method)),
		},
		Value::Function(function) if method == "call" => {
			let this = arg(0);
			function.call(mx, &this, args.get(1..).unwrap_or_default())
		}
		_ => match get_member(receiver, method) {
			Value::Function(function) => function.call(mx, receiver, args),
			_ => Err(ExprError::NotCallable(method.to_string()).into()),
		},
	}
}

fn items_method(items: &ItemArray, method: &str, args: &[Value]) -> Result<Value> {
	let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
	let value = match method {
		"add" | "push" => {
			items.add(arg(0))?;
			Value::Undefined
		}
		"prepend" | "unshift" => {
			items.prepend(arg(0))?;
			Value::Undefined
		}
		"insert" => {
			items.insert(arg(0), index_arg(&arg(1)).unwrap_or(usize::MAX))?;
			Value::Undefined
		}
		"delete" => match index_arg(&arg(0)) {
			Some(index) => optional_proxy(items.delete(index)),
			None => Value::Undefined,
		},
		"remove" => match arg(0) {
			Value::Proxy(item) => optional_proxy(items.remove(&item)),
			_ => Value::Undefined,
		},
		"pop" => optional_proxy(items.pop()),
		"shift" => optional_proxy(items.shift()),
		"clear" => {
			items.clear();
			Value::Undefined
		}
		"replace" => match index_arg(&arg(0)) {
			Some(index) => optional_proxy(items.replace(index, arg(1))?),
			None => Value::Undefined,
		},
		// An expression cannot await, so the async variants run to completion here.
		"asyncAdd" | "asyncPush" => Value::Proxy(items.add_now(arg(0))?),
		"asyncPrepend" | "asyncUnshift" => Value::Proxy(items.prepend_now(arg(0))?),
		"asyncInsert" => Value::Proxy(items.insert_now(arg(0), index_arg(&arg(1)).unwrap_or(usize::MAX))?),
		"asyncDelete" => match index_arg(&arg(0)) {
			Some(index) => optional_proxy(items.delete_now(index)),
			None => Value::Undefined,
		},
		"asyncRemove" => match arg(0) {
			Value::Proxy(item) => optional_proxy(items.remove_now(&item)),
			_ => Value::Undefined,
		},
		"asyncPop" => optional_proxy(items.len().checked_sub(1).and_then(|last| items.delete_now(last))),
		"asyncShift" => optional_proxy(items.delete_now(0)),
		"asyncClear" => {
			items.clear_now();
			Value::Undefined
		}
		"asyncReplace" => match index_arg(&arg(0)) {
			Some(index) => optional_proxy(items.replace_now(index, arg(1))?),
			None => Value::Undefined,
		},
		"get" | "at" => optional_proxy(index_arg(&arg(0)).and_then(|index| items.get(index))),
		"indexOf" => match arg(0) {
			Value::Proxy(item) => Value::Number(items.index_of(&item).map_or(-1.0, |index| index as f64)),
			_ => Value::Number(-1.0),
		},
		"toJSON" => Value::from_json(&Value::Items(items.clone()).to_json()),
		_ => return Err(unknown_method("ItemArray", method)),
	};
	Ok(value)
}

fn sub_array_method(sub_array: &SubArray, method: &str, args: &[Value]) -> Result<Value> {
	let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
	match method {
		"push" | "add" => {
			sub_array.push(arg(0));
			Ok(Value::Number(sub_array.len() as f64))
		}
		"pop" => Ok(sub_array.pop().unwrap_or_default()),
		"get" | "at" => Ok(index_arg(&arg(0))
			.and_then(|index| sub_array.get(index))
			.unwrap_or_default()),
		"set" => {
			if let Some(index) = index_arg(&arg(0)) {
				sub_array.set(index, arg(1));
			}
			Ok(Value::Undefined)
		}
		"includes" => Ok(Value::Bool(sub_array.values().iter().any(|value| value.strict_eq(&arg(0))))),
		"join" => Ok(Value::String(join(&sub_array.values(), &arg(0)))),
		_ => Err(unknown_method("SubArray", method)),
	}
}

fn class_list_method(list: &ClassList, method: &str, args: &[Value]) -> Result<Value> {
	let tokens: Vec<String> = args.iter().map(Value::to_js_string).collect();
	let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
	let first = token_refs.first().copied().unwrap_or_default();
	match method {
		"add" | "push" => {
			list.add(&token_refs);
			Ok(Value::Undefined)
		}
		"remove" => {
			list.remove(&token_refs);
			Ok(Value::Undefined)
		}
		"toggle" => {
			let force = args.get(1).filter(|force| !force.is_undefined()).map(Value::truthy);
			Ok(Value::Bool(list.toggle(first, force)))
		}
		"contains" | "includes" => Ok(Value::Bool(list.contains(first))),
		"replace" => Ok(Value::Bool(
			list.replace(first, token_refs.get(1).copied().unwrap_or_default()),
		)),
		"item" => Ok(index_arg(args.first().unwrap_or(&Value::Undefined))
			.and_then(|index| list.get(index))
			.map(Value::String)
			.unwrap_or(Value::Null)),
		"clear" => {
			list.clear();
			Ok(Value::Undefined)
		}
		"toString" => Ok(Value::String(list.value())),
		_ => Err(unknown_method("ClassList", method)),
	}
}

fn join(values: &[Value], separator: &Value) -> String {
	let separator = if separator.is_undefined() {
		",".to_string()
	} else {
		separator.to_js_string()
	};
	values
		.iter()
		.map(Value::to_display_string)
		.collect::<Vec<_>>()
		.join(&separator)
}

fn array_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
	let Value::Array(array) = receiver else {
		return Err(unknown_method("Array", method));
	};
	let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
	let value = match method {
		"push" => {
			let mut array = array.borrow_mut();
			array.extend(args.iter().cloned());
			Value::Number(array.len() as f64)
		}
		"pop" => array.borrow_mut().pop().unwrap_or_default(),
		"shift" => {
			let mut array = array.borrow_mut();
			if array.is_empty() {
				Value::Undefined
			} else {
				array.remove(0)
			}
		}
		"unshift" => {
			let mut array = array.borrow_mut();
			for (offset, value) in args.iter().enumerate() {
				array.insert(offset, value.clone());
			}
			Value::Number(array.len() as f64)
		}
		"includes" => Value::Bool(array.borrow().iter().any(|value| value.strict_eq(&arg(0)))),
		"indexOf" => Value::Number(
			array
				.borrow()
				.iter()
				.position(|value| value.strict_eq(&arg(0)))
				.map_or(-1.0, |index| index as f64),
		),
		"join" => Value::String(join(&array.borrow(), &arg(0))),
		"slice" => {
			let values = array.borrow();
			let (start, end) = slice_bounds(values.len(), &arg(0), &arg(1));
			Value::array(values[start..end].to_vec())
		}
		"splice" => {
			let mut values = array.borrow_mut();
			let (start, _) = slice_bounds(values.len(), &arg(0), &Value::Undefined);
			let count = if args.len() > 1 {
				index_arg(&arg(1)).unwrap_or(0)
			} else {
				values.len() - start
			};
			let end = (start + count).min(values.len());
			let removed: Vec<Value> = values
				.splice(start..end, args.iter().skip(2).cloned())
				.collect();
			Value::array(removed)
		}
		"concat" => {
			let mut values = array.borrow().clone();
			for value in args {
				match value.list_values() {
					Some(items) => values.extend(items),
					None => values.push(value.clone()),
				}
			}
			Value::array(values)
		}
		"reverse" => {
			array.borrow_mut().reverse();
			receiver.clone()
		}
		_ => return Err(unknown_method("Array", method)),
	};
	Ok(value)
}

/// Resolves JavaScript `slice(start, end)` arguments, negative offsets count from the end.
fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
	let resolve = |value: &Value, default: usize| -> usize {
		if value.is_undefined() {
			return default;
		}
		let n = value.to_number();
		if n.is_nan() {
			0
		} else if n < 0.0 {
			len.saturating_sub((-n) as usize)
		} else {
			(n as usize).min(len)
		}
	};
	let start = resolve(start, 0);
	let end = resolve(end, len).max(start);
	(start, end)
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value> {
	let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
	let text = |index: usize| arg(index).to_js_string();
	let value = match method {
		"toUpperCase" => Value::String(s.to_uppercase()),
		"toLowerCase" => Value::String(s.to_lowercase()),
		"trim" => Value::String(s.trim().to_string()),
		"includes" => Value::Bool(s.contains(&text(0))),
		"startsWith" => Value::Bool(s.starts_with(&text(0))),
		"endsWith" => Value::Bool(s.ends_with(&text(0))),
		"indexOf" => Value::Number(
			s.find(&text(0))
				.map_or(-1.0, |byte| s[..byte].chars().count() as f64),
		),
		"split" => {
			let separator = text(0);
			let parts: Vec<Value> = if separator.is_empty() {
				s.chars().map(|c| Value::String(c.to_string())).collect()
			} else {
				s.split(separator.as_str()).map(Value::from).collect()
			};
			Value::array(parts)
		}
		"slice" | "substring" => {
			let chars: Vec<char> = s.chars().collect();
			let (start, end) = slice_bounds(chars.len(), &arg(0), &arg(1));
			Value::String(chars[start..end].iter().collect())
		}
		"replace" => Value::String(s.replacen(&text(0), &text(1), 1)),
		"replaceAll" => Value::String(s.replace(&text(0), &text(1))),
		"charAt" => Value::String(
			index_arg(&arg(0))
				.and_then(|index| s.chars().nth(index))
				.map(String::from)
				.unwrap_or_default(),
		),
		"toString" => Value::String(s.to_string()),
		_ => return Err(unknown_method("String", method)),
	};
	Ok(value)
}

fn element_method(element: &Node, method: &str, args: &[Value]) -> Result<Value> {
	let text = |index: usize| args.get(index).map(Value::to_js_string).unwrap_or_default();
	let value = match method {
		"getAttribute" => element.get_attribute(&text(0)).map(Value::String).unwrap_or(Value::Null),
		"hasAttribute" => Value::Bool(element.has_attribute(&text(0))),
		"setAttribute" => {
			element.set_attribute(&text(0), &text(1));
			Value::Undefined
		}
		"removeAttribute" => {
			element.remove_attribute(&text(0));
			Value::Undefined
		}
		"querySelector" => element
			.query_selector(&text(0))?
			.map(Value::Element)
			.unwrap_or(Value::Null),
		"querySelectorAll" => Value::array(
			element
				.query_selector_all(&text(0))?
				.into_iter()
				.map(Value::Element)
				.collect(),
		),
		"closest" => element.closest(&text(0))?.map(Value::Element).unwrap_or(Value::Null),
		"matches" => Value::Bool(element.matches(&text(0))?),
		"remove" => {
			element.remove();
			Value::Undefined
		}
		"click" => Value::Bool(element.click()),
		"dispatchEvent" => match args.first() {
			Some(Value::Event(event)) => Value::Bool(element.dispatch_event(event)),
			_ => Value::Bool(element.dispatch_event(&Event::new(text(0)))),
		},
		// No focus model in the host document.
		"focus" | "blur" => Value::Undefined,
		_ => return Err(unknown_method("Element", method)),
	};
	Ok(value)
}

/// Host objects reachable by name: `Math`, `JSON`, `console`, `String`, `Number`, ...
fn builtin(name: &str) -> Option<Value> {
	let function = |name: &str, f: fn(&crate::value::CallContext<'_>) -> Result<Value>| {
		(name.to_string(), Value::Function(Function::new(name, f)))
	};
	let value = match name {
		"Math" => Value::object(IndexMap::from([
			function("max", |ctx| {
				Ok(Value::Number(
					ctx.args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, f64::max),
				))
			}),
			function("min", |ctx| {
				Ok(Value::Number(
					ctx.args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min),
				))
			}),
			function("abs", |ctx| Ok(Value::Number(ctx.arg(0).to_number().abs()))),
			function("floor", |ctx| Ok(Value::Number(ctx.arg(0).to_number().floor()))),
			function("ceil", |ctx| Ok(Value::Number(ctx.arg(0).to_number().ceil()))),
			function("round", |ctx| Ok(Value::Number((ctx.arg(0).to_number() + 0.5).floor()))),
			function("sqrt", |ctx| Ok(Value::Number(ctx.arg(0).to_number().sqrt()))),
			("PI".to_string(), Value::Number(std::f64::consts::PI)),
		])),
		"JSON" => Value::object(IndexMap::from([
			function("stringify", |ctx| Ok(Value::String(serde_json::to_string(&ctx.arg(0).to_json())?))),
			function("parse", |ctx| {
				let json: serde_json::Value = serde_json::from_str(&ctx.arg(0).to_js_string())?;
				Ok(Value::from_json(&json))
			}),
		])),
		"console" => Value::object(IndexMap::from([
			function("log", |ctx| {
				ctx.mx.console().log(console_line(ctx.args));
				Ok(Value::Undefined)
			}),
			function("info", |ctx| {
				ctx.mx.console().info(console_line(ctx.args));
				Ok(Value::Undefined)
			}),
			function("warn", |ctx| {
				ctx.mx.console().warn(console_line(ctx.args));
				Ok(Value::Undefined)
			}),
			function("error", |ctx| {
				ctx.mx.console().error(console_line(ctx.args));
				Ok(Value::Undefined)
			}),
		])),
		"String" => function("String", |ctx| Ok(Value::String(ctx.arg(0).to_js_string()))).1,
		"Number" => function("Number", |ctx| Ok(Value::Number(ctx.arg(0).to_number()))).1,
		"Boolean" => function("Boolean", |ctx| Ok(Value::Bool(ctx.arg(0).truthy()))).1,
		"parseInt" => function("parseInt", |ctx| {
			let text = ctx.arg(0).to_js_string();
			let digits: String = text
				.trim()
				.chars()
				.enumerate()
				.take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
				.map(|(_, c)| c)
				.collect();
			Ok(Value::Number(digits.parse::<f64>().unwrap_or(f64::NAN)))
		})
		.1,
		"parseFloat" => function("parseFloat", |ctx| Ok(Value::Number(ctx.arg(0).to_number()))).1,
		"NaN" => Value::Number(f64::NAN),
		"Infinity" => Value::Number(f64::INFINITY),
		_ => return None,
	};
	Some(value)
}

fn console_line(args: &[Value]) -> String {
	args.iter().map(Value::to_js_string).collect::<Vec<_>>().join(" ")
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
	let numeric = |value: &Value| matches!(value, Value::Number(_) | Value::Bool(_) | Value::Null | Value::Undefined);
	match op {
		BinaryOp::Add => {
			if numeric(left) && numeric(right) {
				Value::Number(left.to_number() + right.to_number())
			} else {
				Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
			}
		}
		BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
		BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
		BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
		BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
		BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
		BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
		BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
		BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
		BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
			let ordering = match (left, right) {
				(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
				_ => left.to_number().partial_cmp(&right.to_number()),
			};
			let Some(ordering) = ordering else {
				return Value::Bool(false);
			};
			Value::Bool(match op {
				BinaryOp::Lt => ordering.is_lt(),
				BinaryOp::Le => ordering.is_le(),
				BinaryOp::Gt => ordering.is_gt(),
				_ => ordering.is_ge(),
			})
		}
	}
}
