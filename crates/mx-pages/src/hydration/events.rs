//! Event directives
//!
//! `@click.prevent="open = !open"`, `mx-on:keydown.enter="submit()"` and
//! `@clickOutside="open = false"` attach native listeners whose callback is an
//! expression evaluated with `this` bound to the component and `$event`, `$el`
//! and `$item` in scope.

use std::collections::HashMap;
use std::rc::Rc;

use mx_dom::{Event, EventHandle, Node};

use crate::expr::{Scope, evaluate, parse_expression};
use crate::proxy::Proxy;
use crate::registry::Mx;
use crate::value::Value;
use crate::{error_log, warn_log};

/// Modifiers recognised as camelCase suffixes (`clickPrevent`, lowercased by the parser).
const SUFFIX_MODIFIERS: &[&str] = &["prevent", "stop", "outside", "once"];

/// A parsed event specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
	/// The event type.
	pub event_type: String,
	/// Whether the event should only fire once.
	pub once: bool,
	/// Whether to prevent default behavior.
	pub prevent_default: bool,
	/// Whether to stop propagation.
	pub stop_propagation: bool,
	/// Listen on the document and fire only for targets outside the element.
	pub outside: bool,
	/// Key filters for keyboard events (`enter`, `escape`, ...).
	pub keys: Vec<String>,
}

impl EventBinding {
	/// Creates a new event binding.
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			once: false,
			prevent_default: false,
			stop_propagation: false,
			outside: false,
			keys: Vec::new(),
		}
	}

	/// Sets the once option.
	pub fn once(mut self, once: bool) -> Self {
		self.once = once;
		self
	}

	/// Sets the prevent_default option.
	pub fn prevent_default(mut self, prevent: bool) -> Self {
		self.prevent_default = prevent;
		self
	}

	/// Sets the stop_propagation option.
	pub fn stop_propagation(mut self, stop: bool) -> Self {
		self.stop_propagation = stop;
		self
	}

	/// Sets the outside option.
	pub fn outside(mut self, outside: bool) -> Self {
		self.outside = outside;
		self
	}

	/// Adds a key filter.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.keys.push(key.into());
		self
	}

	fn apply_modifier(self, modifier: &str) -> Self {
		match modifier {
			"prevent" => self.prevent_default(true),
			"stop" => self.stop_propagation(true),
			"outside" => self.outside(true),
			"once" => self.once(true),
			key => self.key(key),
		}
	}

	/// Parses `click.prevent.stop`, `clickPrevent` or `keydown.enter`.
	pub fn parse(spec: &str) -> Option<Self> {
		let lowered = spec.trim().to_lowercase();
		let mut parts = lowered.split('.');
		let mut event_type = parts.next().filter(|event| !event.is_empty())?.to_string();
		let mut suffixes = Vec::new();
		loop {
			let found = SUFFIX_MODIFIERS
				.iter()
				.find(|modifier| event_type.len() > modifier.len() && event_type.ends_with(*modifier));
			let Some(modifier) = found else {
				break;
			};
			event_type.truncate(event_type.len() - modifier.len());
			suffixes.push(*modifier);
		}
		let mut binding = Self::new(event_type);
		for modifier in suffixes.into_iter().rev().chain(parts.filter(|part| !part.is_empty())) {
			binding = binding.apply_modifier(modifier);
		}
		Some(binding)
	}

	/// Whether a keyboard event passes the key filters.
	fn accepts(&self, event: &Event) -> bool {
		if self.keys.is_empty() {
			return true;
		}
		let Some(key) = event.key() else {
			return false;
		};
		let key = key.to_lowercase();
		self.keys.iter().any(|filter| normalize_key(filter) == key)
	}
}

fn normalize_key(filter: &str) -> String {
	match filter {
		"esc" => "escape".to_string(),
		"space" => " ".to_string(),
		"up" | "down" | "left" | "right" => format!("arrow{}", filter),
		other => other.to_string(),
	}
}

/// Listener handles attached by directives, keyed by the element that
/// declared them. `.outside` listeners live on the document, so they have to
/// be detached explicitly when their element leaves the DOM.
#[derive(Debug, Default)]
pub struct EventRegistry {
	handles: HashMap<Node, Vec<EventHandle>>,
}

impl EventRegistry {
	/// Creates a new event registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an event handle for an element.
	pub fn register(&mut self, element: &Node, handle: EventHandle) {
		self.handles.entry(element.clone()).or_default().push(handle);
	}

	/// Detaches and forgets every handle of `element`.
	pub fn unregister(&mut self, element: &Node) {
		for handle in self.handles.remove(element).unwrap_or_default() {
			handle.remove();
		}
	}

	/// Number of handles registered for `element`.
	pub fn count(&self, element: &Node) -> usize {
		self.handles.get(element).map_or(0, Vec::len)
	}

	/// Forgets all handles without detaching them.
	pub fn clear(&mut self) {
		self.handles.clear();
	}
}

/// Attaches `handler` to `element` honouring the binding's modifiers.
pub fn attach_event(element: &Node, binding: &EventBinding, handler: Rc<dyn Fn(&Event)>) -> EventHandle {
	let filter = binding.clone();
	let scope_element = element.clone();
	let listener = move |event: &Event| {
		if !filter.accepts(event) {
			return;
		}
		if filter.outside {
			let inside = event
				.target()
				.is_some_and(|target| scope_element.contains(&target));
			if inside {
				return;
			}
		}
		if filter.prevent_default {
			event.prevent_default();
		}
		if filter.stop_propagation {
			event.stop_propagation();
		}
		handler(event);
	};
	let target = if binding.outside {
		element.document().as_node()
	} else {
		element.clone()
	};
	if binding.once {
		target.add_event_listener_once(&binding.event_type, listener)
	} else {
		target.add_event_listener(&binding.event_type, listener)
	}
}

/// Wires an `@event` directive. The expression is parsed once; a parse error
/// skips the directive.
pub(crate) fn bind_event(mx: &Mx, element: &Node, binding: &EventBinding, source: &str, item: Option<&Proxy>) {
	let expr = match parse_expression(source) {
		Ok(expr) => Rc::new(expr),
		Err(err) => {
			error_log!(mx, "invalid expression in @{}=\"{}\": {}", binding.event_type, source, err);
			return;
		}
	};
	let this = mx.closest_proxy(element);
	if this.is_none() && !source.contains('$') {
		warn_log!(mx, "cannot resolve scope for @{}=\"{}\"", binding.event_type, source);
		return;
	}
	let weak_mx = mx.downgrade();
	let weak_this = this.as_ref().map(Proxy::downgrade);
	let weak_item = item.map(Proxy::downgrade);
	let owner = element.clone();
	let handler = move |event: &Event| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		let this = weak_this
			.as_ref()
			.and_then(|weak| weak.upgrade())
			.map(Value::Proxy)
			.unwrap_or_default();
		let mut scope = Scope::new(this)
			.with_local("$event", Value::Event(event.clone()))
			.with_local("$el", Value::Element(owner.clone()));
		if let Some(item) = weak_item.as_ref().and_then(|weak| weak.upgrade()) {
			scope = scope.with_local("$item", Value::Proxy(item));
		}
		if let Err(err) = evaluate(&mx, &expr, &scope) {
			error_log!(mx, "error in @{} handler: {}", event.event_type(), err);
		}
	};
	let handle = attach_event(element, binding, Rc::new(handler));
	mx.register_listener(element, handle);
}
