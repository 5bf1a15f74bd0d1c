//! `mx-show` and `mx-transition`.
//!
//! The expression is re-evaluated whenever one of the properties it reads is
//! written. A flip toggles `style.display`, optionally through a class-based
//! transition:
//!
//! 1. `<name>-enter-start` (or `-leave-start`) is applied immediately;
//! 2. two animation frames later it is swapped for `<name>-enter-end`;
//! 3. on `transitionend` all transition classes are removed and, for a leave,
//!    `display: none` is set.
//!
//! Every toggle bumps a per-element generation; callbacks of a superseded
//! transition do nothing.

use std::cell::Cell;
use std::rc::Rc;

use mx_dom::{Event, Node};

use crate::expr::{Dependency, DependencyRoot, Expr, Scope, dependencies, evaluate, parse_expression};
use crate::proxy::{Proxy, WeakProxy};
use crate::reaction::Reaction;
use crate::registry::{Mx, WeakMx};
use crate::value::Value;
use crate::{debug_log, error_log};

const LOCALS: &[&str] = &["$el", "$item"];
const PHASES: &[&str] = &["enter-start", "enter-end", "leave-start", "leave-end"];

fn strip_transition_classes(element: &Node, name: &str) {
	for phase in PHASES {
		element.remove_class(&format!("{}-{}", name, phase));
	}
}

fn set_visible(element: &Node, visible: bool) {
	if visible {
		element.remove_style_property("display");
	} else {
		element.set_style_property("display", "none");
	}
}

/// Runs the enter or leave transition `name` on `element`.
fn run_transition(mx: &Mx, element: &Node, name: &str, entering: bool) {
	let generation = mx.next_transition(element);
	strip_transition_classes(element, name);
	let phase = if entering { "enter" } else { "leave" };
	if entering {
		set_visible(element, true);
	}
	element.add_class(&format!("{}-{}-start", name, phase));

	let weak_mx = mx.downgrade();
	let target = element.clone();
	let start = format!("{}-{}-start", name, phase);
	let end = format!("{}-{}-end", name, phase);
	mx.event_loop().request_animation_frame(move |_| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		let weak_mx = mx.downgrade();
		mx.event_loop().request_animation_frame(move |_| {
			let Some(mx) = weak_mx.upgrade() else {
				return;
			};
			if !mx.transition_is_current(&target, generation) {
				return;
			}
			target.remove_class(&start);
			target.add_class(&end);
		});
	});

	let weak_mx = mx.downgrade();
	let target = element.clone();
	let name = name.to_string();
	element.add_event_listener_once("transitionend", move |_: &Event| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		if !mx.transition_is_current(&target, generation) {
			return;
		}
		strip_transition_classes(&target, &name);
		if !entering {
			set_visible(&target, false);
		}
		debug_log!("transition '{}' finished", name);
	});
}

struct ShowBinding {
	mx: WeakMx,
	element: Node,
	expr: Expr,
	this: Option<WeakProxy>,
	item: Option<WeakProxy>,
	transition: Option<String>,
	visible: Cell<bool>,
}

impl ShowBinding {
	fn evaluate(&self, mx: &Mx) -> bool {
		let this = self
			.this
			.as_ref()
			.and_then(|weak| weak.upgrade())
			.map(Value::Proxy)
			.unwrap_or_default();
		let mut scope = Scope::new(this).with_local("$el", Value::Element(self.element.clone()));
		if let Some(item) = self.item.as_ref().and_then(|weak| weak.upgrade()) {
			scope = scope.with_local("$item", Value::Proxy(item));
		}
		match evaluate(mx, &self.expr, &scope) {
			Ok(value) => value.truthy(),
			Err(err) => {
				error_log!(mx, "error in mx-show: {}", err);
				self.visible.get()
			}
		}
	}

	fn update(&self) {
		let Some(mx) = self.mx.upgrade() else {
			return;
		};
		let visible = self.evaluate(&mx);
		if visible == self.visible.get() {
			return;
		}
		self.visible.set(visible);
		match &self.transition {
			Some(name) => run_transition(&mx, &self.element, name, visible),
			None => set_visible(&self.element, visible),
		}
	}
}

/// The proxy and key a dependency path ends on, creating nothing but nested
/// proxies for plain objects along the way.
fn subscription_targets(root: &Proxy, path: &[String]) -> Vec<(Proxy, String)> {
	let mut targets = Vec::new();
	let mut current = root.clone();
	for (index, segment) in path.iter().enumerate() {
		targets.push((current.clone(), segment.clone()));
		if index + 1 == path.len() {
			break;
		}
		match current.child(segment) {
			Some(child) => current = child,
			None => break,
		}
	}
	targets
}

/// The proxy a dependency starts from and the path below it. A bare name that
/// is not a property of `this` falls back to the registry, as lookup does.
fn dependency_root<'a>(
	mx: &Mx,
	dependency: &'a Dependency,
	this: Option<&Proxy>,
	item: Option<&Proxy>,
) -> Option<(Proxy, &'a [String])> {
	let path = dependency.path.as_slice();
	match &dependency.root {
		DependencyRoot::This => match (this, path.split_first()) {
			(Some(this), Some((first, _))) if this.has(first) => Some((this.clone(), path)),
			(_, Some((first, rest))) if mx.get(first).is_some() => mx.get(first).map(|global| (global, rest)),
			(Some(this), _) => Some((this.clone(), path)),
			(None, _) => None,
		},
		DependencyRoot::Global(name) => mx.get(name).map(|global| (global, path)),
		DependencyRoot::Local(name) if name == "$item" => item.cloned().map(|item| (item, path)),
		DependencyRoot::Local(_) => None,
	}
}

/// Wires `mx-show="source"` on `element`.
pub(crate) fn bind_show(mx: &Mx, element: &Node, source: &str, item: Option<&Proxy>) {
	let expr = match parse_expression(source) {
		Ok(expr) => expr,
		Err(err) => {
			error_log!(mx, "invalid expression in mx-show=\"{}\": {}", source, err);
			return;
		}
	};
	let this = mx.closest_proxy(element);
	let deps = dependencies(&expr, LOCALS);
	let transition = element
		.get_attribute("mx-transition")
		.map(|name| name.trim().to_string())
		.filter(|name| !name.is_empty());
	let binding = Rc::new(ShowBinding {
		mx: mx.downgrade(),
		element: element.clone(),
		expr,
		this: this.as_ref().map(Proxy::downgrade),
		item: item.map(Proxy::downgrade),
		transition,
		visible: Cell::new(true),
	});

	let visible = binding.evaluate(mx);
	binding.visible.set(visible);
	set_visible(element, visible);

	for dependency in &deps {
		let Some((root, path)) = dependency_root(mx, dependency, this.as_ref(), item) else {
			continue;
		};
		for (proxy, key) in subscription_targets(&root, path) {
			let binding = binding.clone();
			proxy.register_reaction(&key, Reaction::effect(move |_, _| binding.update()));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use indexmap::IndexMap;
	use rstest::rstest;

	fn setup(body: &str, open: bool) -> (Mx, Proxy, Node) {
		let mx = Mx::new();
		mx.document().body().set_inner_html(body);
		let root = mx.document().body().first_child().unwrap();
		let proxy = Proxy::new("menu", IndexMap::from([("open".to_string(), Value::Bool(open))]), Some(root.clone()));
		mx.bind_element(&root, &proxy);
		let panel = root.first_child().unwrap();
		let source = panel.get_attribute("mx-show").unwrap();
		bind_show(&mx, &panel, &source, None);
		(mx, proxy, panel)
	}

	#[rstest]
	fn test_show_toggles_display() {
		let (_mx, proxy, panel) = setup(r#"<div><p mx-show="open"></p></div>"#, false);
		assert_eq!(panel.style_property("display"), "none");
		proxy.set("open", Value::Bool(true));
		assert_eq!(panel.style_property("display"), "");
	}

	#[rstest]
	fn test_show_follows_nested_and_negated_paths() {
		let mx = Mx::new();
		mx.store("ui", serde_json::json!({"modal": {"visible": false}}));
		mx.document().body().set_inner_html(r#"<p mx-show="!$ui.modal.visible"></p>"#);
		let p = mx.document().body().first_child().unwrap();
		bind_show(&mx, &p, "!$ui.modal.visible", None);
		assert_eq!(p.style_property("display"), "");
		mx.get("ui").unwrap().child("modal").unwrap().set("visible", Value::Bool(true));
		assert_eq!(p.style_property("display"), "none");
	}

	#[rstest]
	fn test_transition_phases() {
		let (mx, proxy, panel) = setup(r#"<div><p mx-show="open" mx-transition="fade"></p></div>"#, false);
		proxy.set("open", Value::Bool(true));
		assert!(panel.has_class("fade-enter-start"));
		assert_eq!(panel.style_property("display"), "");

		mx.event_loop().run_animation_frames(2);
		assert!(panel.has_class("fade-enter-end"));
		assert!(!panel.has_class("fade-enter-start"));

		panel.dispatch_event(&Event::new("transitionend"));
		assert_eq!(panel.class_name(), "");
	}

	#[rstest]
	fn test_leave_sets_display_none_after_transition_end() {
		let (mx, proxy, panel) = setup(r#"<div><p mx-show="open" mx-transition="fade"></p></div>"#, true);
		proxy.set("open", Value::Bool(false));
		assert!(panel.has_class("fade-leave-start"));
		assert_eq!(panel.style_property("display"), "");
		mx.event_loop().run_animation_frames(2);
		panel.dispatch_event(&Event::new("transitionend"));
		assert_eq!(panel.style_property("display"), "none");
		assert_eq!(panel.class_name(), "");
	}

	#[rstest]
	fn test_new_toggle_cancels_running_leave() {
		let (mx, proxy, panel) = setup(r#"<div><p mx-show="open" mx-transition="fade"></p></div>"#, true);
		proxy.set("open", Value::Bool(false));
		mx.event_loop().run_animation_frames(2);
		assert!(panel.has_class("fade-leave-end"));

		proxy.set("open", Value::Bool(true));
		assert!(!panel.has_class("fade-leave-end"));
		assert!(panel.has_class("fade-enter-start"));
		panel.dispatch_event(&Event::new("transitionend"));
		assert_eq!(panel.style_property("display"), "");
	}
}
