//! Static dependency extraction.
//!
//! `mx-show="open && $cart.items.length > 0"` depends on `open` of the local
//! component and on `items` of the `cart` store. The hydration engine
//! subscribes to each of those properties so the expression is re-evaluated
//! whenever one of them is written.

use super::ast::Expr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyRoot {
	/// A property of `this` (bare identifier or `this.x`).
	This,
	/// A registry entry (`$name` / a registered bare name).
	Global(String),
	/// An injected local such as `$item`.
	Local(String),
}

/// A property path read by an expression, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
	pub root: DependencyRoot,
	pub path: Vec<String>,
}

/// Collects the property paths `expr` reads. `locals` names the injected
/// variables, which are not looked up on `this`.
pub fn dependencies(expr: &Expr, locals: &[&str]) -> Vec<Dependency> {
	let mut out = Vec::new();
	collect(expr, locals, &mut out);
	let mut seen = std::collections::HashSet::new();
	out.retain(|dep| seen.insert(dep.clone()));
	out
}

fn collect(expr: &Expr, locals: &[&str], out: &mut Vec<Dependency>) {
	if let Some(dep) = path_of(expr, locals) {
		out.push(dep);
		// Computed indexes inside the path still read their own dependencies.
		collect_index_operands(expr, locals, out);
		return;
	}
	match expr {
		Expr::Literal(_) | Expr::Ident(_) | Expr::This => {}
		Expr::Array(items) | Expr::Sequence(items) => {
			for item in items {
				collect(item, locals, out);
			}
		}
		Expr::Object(entries) => {
			for (_, value) in entries {
				collect(value, locals, out);
			}
		}
		Expr::Member { object, .. } => collect(object, locals, out),
		Expr::Index { object, index, .. } => {
			collect(object, locals, out);
			collect(index, locals, out);
		}
		Expr::Call { callee, args } => {
			match callee.as_ref() {
				// `items.includes(x)` reads `items`.
				Expr::Member { object, .. } => collect(object, locals, out),
				other => collect(other, locals, out),
			}
			for arg in args {
				collect(arg, locals, out);
			}
		}
		Expr::Unary { operand, .. } => collect(operand, locals, out),
		Expr::Update { target, .. } => collect(target, locals, out),
		Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
			collect(left, locals, out);
			collect(right, locals, out);
		}
		Expr::Conditional {
			test,
			consequent,
			alternate,
		} => {
			collect(test, locals, out);
			collect(consequent, locals, out);
			collect(alternate, locals, out);
		}
		Expr::Assign { target, value, .. } => {
			collect(target, locals, out);
			collect(value, locals, out);
		}
	}
}

fn collect_index_operands(expr: &Expr, locals: &[&str], out: &mut Vec<Dependency>) {
	match expr {
		Expr::Member { object, .. } => collect_index_operands(object, locals, out),
		Expr::Index { object, index, .. } => {
			collect(index, locals, out);
			collect_index_operands(object, locals, out);
		}
		_ => {}
	}
}

/// Resolves `a.b.c`, `this.a`, `$store.a[0]` into a static path.
fn path_of(expr: &Expr, locals: &[&str]) -> Option<Dependency> {
	match expr {
		Expr::Ident(name) => {
			if locals.contains(&name.as_str()) {
				return None;
			}
			match name.strip_prefix('$') {
				Some(global) => Some(Dependency {
					root: DependencyRoot::Global(global.to_string()),
					path: Vec::new(),
				}),
				None => Some(Dependency {
					root: DependencyRoot::This,
					path: vec![name.clone()],
				}),
			}
		}
		Expr::This => Some(Dependency {
			root: DependencyRoot::This,
			path: Vec::new(),
		}),
		Expr::Member { object, property, .. } => {
			let mut dep = match object.as_ref() {
				Expr::Ident(name) if locals.contains(&name.as_str()) => Dependency {
					root: DependencyRoot::Local(name.clone()),
					path: Vec::new(),
				},
				other => path_of(other, locals)?,
			};
			dep.path.push(property.clone());
			Some(dep)
		}
		Expr::Index { object, index, .. } => {
			let mut dep = path_of(object, locals)?;
			if let Expr::Literal(super::ast::Literal::Number(n)) = index.as_ref() {
				dep.path.push(crate::value::format_number(*n));
			}
			Some(dep)
		}
		_ => None,
	}
}
