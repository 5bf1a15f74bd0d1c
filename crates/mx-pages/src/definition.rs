//! Component and store definitions.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::expr::{Expr, Scope, evaluate, parse_expression};
use crate::value::{CallContext, Function, Value};

/// Properties and methods of a component or store.
///
/// ```ignore
/// let counter = ObjectDef::from_json(json!({"count": 0}))
/// 	.expr_method("increment", "count++")?;
/// mx.component("counter", counter);
/// ```
#[derive(Clone, Default)]
pub struct ObjectDef {
	props: IndexMap<String, Value>,
}

impl ObjectDef {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the entries of a JSON object; anything else yields an empty definition.
	pub fn from_json(json: serde_json::Value) -> Self {
		let props = match json {
			serde_json::Value::Object(map) => map
				.iter()
				.map(|(key, value)| (key.clone(), Value::from_json(value)))
				.collect(),
			_ => IndexMap::new(),
		};
		Self { props }
	}

	pub fn prop(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.props.insert(key.to_string(), value.into());
		self
	}

	/// Adds a native method. `ctx.this` is the component proxy.
	pub fn method(mut self, name: &str, call: impl Fn(&CallContext<'_>) -> Result<Value> + 'static) -> Self {
		self.props
			.insert(name.to_string(), Value::Function(Function::new(name, call)));
		self
	}

	/// Adds a method whose body is an expression evaluated with `this` bound
	/// to the component and the call arguments in `$args`.
	pub fn expr_method(self, name: &str, body: &str) -> Result<Self> {
		let expr: Rc<Expr> = Rc::new(parse_expression(body)?);
		Ok(self.method(name, move |ctx| {
			let scope = Scope::new(ctx.this.clone()).with_local("$args", Value::array(ctx.args.to_vec()));
			evaluate(ctx.mx, &expr, &scope)
		}))
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.props.get(key)
	}

	/// Fresh property map; plain arrays and objects are copied so instances never share state.
	pub fn instantiate(&self) -> IndexMap<String, Value> {
		self.props
			.iter()
			.map(|(key, value)| (key.clone(), value.deep_copy()))
			.collect()
	}
}

impl fmt::Debug for ObjectDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObjectDef")
			.field("props", &self.props.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// A registered component or store.
#[derive(Clone)]
pub enum Definition {
	/// Singleton: one proxy shared by every `mx-data="name"` element.
	Object(ObjectDef),
	/// Called once per element (`mx-data="name()"`).
	Factory(Rc<dyn Fn() -> ObjectDef>),
}

impl Definition {
	pub fn factory(build: impl Fn() -> ObjectDef + 'static) -> Self {
		Self::Factory(Rc::new(build))
	}

	pub fn is_factory(&self) -> bool {
		matches!(self, Self::Factory(_))
	}

	pub fn instantiate(&self) -> IndexMap<String, Value> {
		match self {
			Self::Object(def) => def.instantiate(),
			Self::Factory(build) => build().instantiate(),
		}
	}
}

impl From<ObjectDef> for Definition {
	fn from(def: ObjectDef) -> Self {
		Self::Object(def)
	}
}

impl From<serde_json::Value> for Definition {
	fn from(json: serde_json::Value) -> Self {
		Self::Object(ObjectDef::from_json(json))
	}
}

impl fmt::Debug for Definition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Object(def) => f.debug_tuple("Object").field(def).finish(),
			Self::Factory(_) => f.write_str("Factory"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::proxy::Proxy;
	use crate::registry::Mx;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_instances_do_not_share_arrays() {
		let def = Definition::from(json!({"items": [1, 2]}));
		let first = def.instantiate();
		let second = def.instantiate();
		if let Some(Value::Array(array)) = first.get("items") {
			array.borrow_mut().push(Value::Number(3.0));
		}
		assert_eq!(second["items"].to_json(), json!([1, 2]));
	}

	#[rstest]
	fn test_expr_method_binds_this_and_args() {
		let mx = Mx::new();
		let def = ObjectDef::from_json(json!({"count": 1}))
			.expr_method("add", "count += $args[0]")
			.unwrap();
		let proxy = Proxy::new("counter", def.instantiate(), None);
		proxy.call(&mx, "add", &[Value::Number(4.0)]).unwrap().unwrap();
		assert_eq!(proxy.get("count"), Value::Number(5.0));
	}

	#[rstest]
	fn test_factory_builds_fresh_definitions() {
		let def = Definition::factory(|| ObjectDef::new().prop("open", false));
		assert!(def.is_factory());
		assert_eq!(def.instantiate()["open"], Value::Bool(false));
	}
}
