//! Scope resolution
//!
//! A directive path names a property either on a registry entry
//! (`$cart.total`, `$alias.open`) or on the nearest `mx-data` ancestor
//! (`count`, `user.name`). Intermediate objects are promoted to nested proxies
//! so the final property can carry reactions.

use indexmap::IndexMap;
use mx_dom::Node;

use crate::proxy::Proxy;
use crate::registry::Mx;
use crate::value::Value;

/// Walks `path` (`a.b.c`) from `root` and returns the proxy owning the last
/// segment together with that segment.
///
/// Missing intermediate objects are created empty.
pub fn walk_path(root: &Proxy, path: &str) -> Option<(Proxy, String)> {
	let segments: Vec<&str> = path.split('.').map(str::trim).collect();
	let (last, parents) = segments.split_last()?;
	if last.is_empty() {
		return None;
	}
	let mut current = root.clone();
	for segment in parents {
		if segment.is_empty() {
			return None;
		}
		current = match current.child(segment) {
			Some(child) => child,
			None if current.get(segment).is_undefined() => {
				let child = Proxy::new(segment, IndexMap::new(), current.element());
				current.set_silent(segment, Value::Proxy(child.clone()));
				child
			}
			None => return None,
		};
	}
	Some((current, (*last).to_string()))
}

/// Resolves a directive path relative to `element`.
pub fn resolve_path(mx: &Mx, element: &Node, path: &str) -> Option<(Proxy, String)> {
	let path = path.trim();
	if let Some(global) = path.strip_prefix('$') {
		let (name, rest) = global.split_once('.')?;
		let root = mx.get(name)?;
		return walk_path(&root, rest);
	}
	let root = mx.closest_proxy(element)?;
	walk_path(&root, path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_walk_creates_missing_parents() {
		let root = Proxy::new("app", IndexMap::new(), None);
		let (owner, key) = walk_path(&root, "user.profile.name").unwrap();
		owner.set(&key, Value::from("Ada"));
		assert_eq!(root.to_json(), json!({"user": {"profile": {"name": "Ada"}}}));
	}

	#[rstest]
	fn test_walk_refuses_scalars() {
		let root = Proxy::new("app", IndexMap::from([("count".to_string(), Value::Number(1.0))]), None);
		assert!(walk_path(&root, "count.value").is_none());
		assert!(walk_path(&root, "").is_none());
	}

	#[rstest]
	fn test_resolve_global_and_local() {
		let mx = Mx::new();
		mx.store("cart", json!({"total": 1}));
		mx.document().body().set_inner_html("<p></p>");
		let p = mx.document().body().first_child().unwrap();
		let (owner, key) = resolve_path(&mx, &p, "$cart.total").unwrap();
		assert_eq!(owner.get(&key), Value::Number(1.0));
		assert!(resolve_path(&mx, &p, "total").is_none());
		assert!(resolve_path(&mx, &p, "$missing.total").is_none());
	}
}
