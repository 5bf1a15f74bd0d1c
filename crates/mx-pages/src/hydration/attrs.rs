//! Composite attribute binding.
//!
//! `<a mx-attrs="link" href="/docs" title="Docs" data-id="7">` binds every
//! ordinary attribute of the element to a nested object, keyed in camelCase:
//! `link.href`, `link.title`, `link.dataId`. `mx-attrs:primary="buttons"`
//! nests the object one level deeper, under `buttons.primary`.

use indexmap::IndexMap;
use mx_dom::Node;

use crate::directive::is_directive_attribute;
use crate::proxy::Proxy;
use crate::reaction::kebab_to_camel;
use crate::registry::Mx;
use crate::value::Value;
use crate::warn_log;

use super::bindings::bind_property;
use super::scope::resolve_path;

/// The nested proxy at `key`, created empty when missing.
fn nested(owner: &Proxy, key: &str) -> Option<Proxy> {
	if let Some(child) = owner.child(key) {
		return Some(child);
	}
	if !owner.get(key).is_nullish() {
		return None;
	}
	let child = Proxy::new(key, IndexMap::new(), owner.element());
	owner.set_silent(key, Value::Proxy(child.clone()));
	Some(child)
}

pub(crate) fn bind_attrs(mx: &Mx, element: &Node, group: Option<&str>, path: &str) {
	let target = resolve_path(mx, element, path)
		.and_then(|(owner, key)| nested(&owner, &key))
		.and_then(|attrs| match group {
			Some(group) => nested(&attrs, group),
			None => Some(attrs),
		});
	let Some(attrs) = target else {
		warn_log!(mx, "cannot resolve scope for mx-attrs=\"{}\"", path);
		return;
	};
	for (name, _) in element.attributes() {
		if is_directive_attribute(&name) {
			continue;
		}
		bind_property(mx, &attrs, &kebab_to_camel(&name), element, &name, None, false);
	}
}
