//! Hydration Runtime
//!
//! Entry point of the directive scan. [`hydrate`] walks a subtree in five
//! passes:
//!
//! 1. every `mx-data` element gets its proxy (and `mx-ref` alias);
//! 2. `mx-item` collections are grouped and turned into item arrays;
//! 3. the remaining directives of every element are processed in document
//!    order;
//! 4. `<template mx-template>` elements are collected;
//! 5. `init()` runs once for every component that has not been initialized.
//!
//! Processed elements are remembered, so running the scan again (for example
//! on nodes reported by the mutation observer) never binds anything twice.

use mx_dom::{Node, Selector};

use crate::directive::{CLOAK_ATTR, DATA_ATTR, Directive, REF_ATTR, TEMPLATE_ATTR, directives, split_factory_call};
use crate::items::{hydrate_items, item_scope};
use crate::proxy::Proxy;
use crate::registry::Mx;
use crate::swap::Template;
use crate::{debug_log, error_log, warn_log};

use super::attrs::bind_attrs;
use super::bindings::bind;
use super::events::bind_event;
use super::navigation::{bind_link, bind_load, bind_swap_template};
use super::show::bind_show;

/// Errors that can occur during hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationError {
	/// The hydration root element was not found.
	RootNotFound(String),
	/// `mx-data` names a component that was never registered.
	UnregisteredComponent(String),
	/// Event attachment failed.
	EventAttachmentFailed(String),
}

impl std::fmt::Display for HydrationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::RootNotFound(selector) => write!(f, "Hydration root element not found: {}", selector),
			Self::UnregisteredComponent(name) => write!(f, "Component '{}' is not registered", name),
			Self::EventAttachmentFailed(msg) => write!(f, "Event attachment failed: {}", msg),
		}
	}
}

impl std::error::Error for HydrationError {}

/// `root` and its descendant elements, in document order.
fn inclusive_elements(root: &Node) -> Vec<Node> {
	let mut elements = Vec::new();
	if root.is_element() {
		elements.push(root.clone());
	}
	elements.extend(root.descendant_elements());
	elements
}

/// Pass 1: proxies for every `mx-data` element not bound yet.
fn instantiate_components(mx: &Mx, root: &Node) {
	for element in inclusive_elements(root) {
		let Some(raw) = element.get_attribute(DATA_ATTR) else {
			continue;
		};
		if mx.proxy_for(&element).is_some() {
			continue;
		}
		if let Err(err) = instantiate(mx, &element, &raw) {
			warn_log!(mx, "{}", err);
		}
	}
}

fn instantiate(mx: &Mx, element: &Node, raw: &str) -> Result<Proxy, HydrationError> {
	let (name, factory_call) = split_factory_call(raw);
	let definition = mx
		.definition(name)
		.ok_or_else(|| HydrationError::UnregisteredComponent(name.to_string()))?;
	let proxy = if factory_call || definition.is_factory() {
		Proxy::new(name, definition.instantiate(), Some(element.clone()))
	} else if let Some(shared) = mx.singleton(name) {
		shared
	} else {
		let proxy = Proxy::new(name, definition.instantiate(), Some(element.clone()));
		mx.set_singleton(name, &proxy);
		proxy
	};
	mx.bind_element(element, &proxy);
	if let Some(alias) = element.get_attribute(REF_ATTR) {
		let alias = alias.trim();
		if !alias.is_empty() {
			mx.set_ref(alias, &proxy);
		}
	}
	debug_log!("bound component '{}'", name);
	Ok(proxy)
}

/// Processes the directives of one element. `item` is the enclosing item proxy.
pub(crate) fn process_element(mx: &Mx, element: &Node, item: Option<&Proxy>) {
	if mx.is_processed(element) {
		return;
	}
	mx.mark_processed(element);
	let mut cloak = false;
	for directive in directives(element) {
		match directive {
			Directive::Bind { attr, parser, path } => bind(mx, element, &attr, parser.as_deref(), &path),
			Directive::Attrs { group, path } => bind_attrs(mx, element, group.as_deref(), &path),
			Directive::On { binding, expr } => bind_event(mx, element, &binding, &expr, item),
			Directive::Show(source) => bind_show(mx, element, &source, item),
			Directive::Load(url) => bind_load(mx, element, &url),
			Directive::Link(url) => bind_link(mx, element, &url),
			Directive::SwapTemplate(name) => bind_swap_template(mx, element, &name),
			Directive::Cloak => cloak = true,
			// Handled by other passes, or read by the directives above.
			Directive::Data(_)
			| Directive::Ref(_)
			| Directive::Item(_)
			| Directive::ItemBind { .. }
			| Directive::Transition(_)
			| Directive::Target(_)
			| Directive::Select(_)
			| Directive::Trigger(_)
			| Directive::Template(_) => {}
		}
	}
	if cloak {
		element.remove_attribute(CLOAK_ATTR);
	}
}

/// Hydrates the directives of one item node with `$item` in scope.
///
/// Created items (`created`) also get their nested components and collections
/// hydrated.
pub(crate) fn hydrate_item_node(mx: &Mx, node: &Node, item: &Proxy, created: bool) {
	if created {
		instantiate_components(mx, node);
	}
	for element in item_scope(node) {
		// The item element itself carries `mx-item` and is already marked by
		// its collection; its other directives still need processing.
		if element == *node {
			process_item_root(mx, node, item);
			continue;
		}
		process_element(mx, &element, Some(item));
	}
	if created {
		hydrate(mx, node);
	}
}

fn process_item_root(mx: &Mx, node: &Node, item: &Proxy) {
	mx.forget_processed(std::slice::from_ref(node));
	process_element(mx, node, Some(item));
}

/// Pass 4: named templates.
fn collect_templates(mx: &Mx, root: &Node) {
	let Ok(selector) = Selector::parse(&format!("template[{}]", TEMPLATE_ATTR)) else {
		return;
	};
	let mut templates = root.select(&selector);
	if root.matches_selector(&selector) {
		templates.insert(0, root.clone());
	}
	for element in templates {
		match Template::from_element(&element) {
			Some(template) => {
				debug_log!("collected template '{}'", template.name);
				mx.register_template(template);
			}
			None => warn_log!(mx, "mx-template without a name"),
		}
		mx.mark_processed(&element);
	}
}

/// Pass 5: `init()` once per component.
fn initialize_components(mx: &Mx, root: &Node) {
	for element in inclusive_elements(root) {
		let Some(proxy) = mx.proxy_for(&element) else {
			continue;
		};
		if proxy.is_initialized() {
			continue;
		}
		proxy.mark_initialized();
		if let Some(Err(err)) = proxy.call(mx, "init", &[]) {
			error_log!(mx, "init() of '{}' failed: {}", proxy.name(), err);
		}
	}
}

/// Hydrates `root` and everything below it.
pub fn hydrate(mx: &Mx, root: &Node) {
	instantiate_components(mx, root);
	hydrate_items(mx, root);
	for element in inclusive_elements(root) {
		process_element(mx, &element, None);
	}
	collect_templates(mx, root);
	initialize_components(mx, root);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StartConfig;
	use crate::definition::{Definition, ObjectDef};
	use crate::value::Value;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::Cell;
	use std::rc::Rc;

	fn start(mx: &Mx, body: &str) {
		mx.document().body().set_inner_html(body);
		mx.start(StartConfig::new().observe(false).history(false)).unwrap();
	}

	#[rstest]
	fn test_display() {
		assert_eq!(
			HydrationError::RootNotFound("#app".to_string()).to_string(),
			"Hydration root element not found: #app"
		);
		assert_eq!(
			HydrationError::EventAttachmentFailed("bad".to_string()).to_string(),
			"Event attachment failed: bad"
		);
	}

	#[rstest]
	fn test_counter_round_trip() {
		let mx = Mx::new();
		mx.component("counter", json!({"count": 0}));
		start(
			&mx,
			r#"<div mx-data="counter"><span :text="count">5</span><button @click="count++"></button></div>"#,
		);
		let counter = mx.get("counter").unwrap();
		assert_eq!(counter.get("count"), Value::Number(5.0));
		mx.document().query_selector("button").unwrap().unwrap().click();
		assert_eq!(mx.document().query_selector("span").unwrap().unwrap().text_content(), "6");
	}

	#[rstest]
	fn test_unregistered_component_is_skipped_with_warning() {
		let mx = Mx::new();
		start(&mx, r#"<div mx-data="ghost"><span :text="x">1</span></div>"#);
		assert_eq!(
			mx.console().warnings(),
			vec!["Component 'ghost' is not registered", r#"cannot resolve scope for :text="x""#]
		);
	}

	#[rstest]
	fn test_factories_create_one_instance_per_element() {
		let mx = Mx::new();
		mx.component(
			"toggle",
			Definition::factory(|| ObjectDef::from_json(json!({"on": false}))),
		);
		start(
			&mx,
			r#"<div mx-data="toggle()" mx-ref="first"><i @click="on = true"></i></div><div mx-data="toggle()" mx-ref="second"></div>"#,
		);
		mx.document().query_selector("i").unwrap().unwrap().click();
		assert_eq!(mx.get("first").unwrap().get("on"), Value::Bool(true));
		assert_eq!(mx.get("second").unwrap().get("on"), Value::Bool(false));
	}

	#[rstest]
	fn test_init_runs_once_and_rehydration_is_idempotent() {
		let mx = Mx::new();
		let calls = Rc::new(Cell::new(0));
		let counter = calls.clone();
		mx.component(
			"widget",
			ObjectDef::from_json(json!({"n": 0})).method("init", move |_| {
				counter.set(counter.get() + 1);
				Ok(Value::Undefined)
			}),
		);
		start(&mx, r#"<div mx-data="widget"><button @click="n++"></button></div>"#);
		let body = mx.document().body();
		mx.hydrate(&body);
		assert_eq!(calls.get(), 1);

		mx.document().query_selector("button").unwrap().unwrap().click();
		assert_eq!(mx.get("widget").unwrap().get("n"), Value::Number(1.0));
	}

	#[rstest]
	fn test_cloak_is_removed_and_templates_collected() {
		let mx = Mx::new();
		mx.component("page", json!({}));
		start(
			&mx,
			r##"<div mx-data="page" mx-cloak></div><template mx-template="row" mx-target="#rows:beforeend"><li>{{ name }}</li></template>"##,
		);
		assert!(!mx.document().query_selector("[mx-cloak]").unwrap().is_some());
		let template = mx.get_template("row").unwrap();
		assert_eq!(template.target.as_deref(), Some("#rows:beforeend"));
		assert_eq!(mx.render_template("row", &json!({"name": "Ada"})), "<li>Ada</li>");
	}
}
