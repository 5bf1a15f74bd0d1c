//! Server-driven DOM side effects.
//!
//! A response can carry a list of instructions (`X-Cubo-Actions`) that run
//! after its swap:
//!
//! ```json
//! [
//!   {"action": "addClass", "selector": "#cart", "class": "bump"},
//!   {"action": "setProperty", "selector": "#qty", "property": "value", "value": 3},
//!   {"action": "pushUrl", "url": "/cart", "title": "Cart"}
//! ]
//! ```

use mx_dom::{Event, Node};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::Mx;
use crate::value::Value;
use crate::{debug_log, warn_log};

/// One DOM instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
	AddClass {
		selector: String,
		class: String,
	},
	RemoveClass {
		selector: String,
		class: String,
	},
	SetAttribute {
		selector: String,
		name: String,
		value: String,
	},
	/// DOM property first (`value`, `checked`, `textContent`, `innerHTML`,
	/// `className`), then a property of the component bound to the element,
	/// then an attribute.
	SetProperty {
		selector: String,
		property: String,
		value: serde_json::Value,
	},
	DispatchEvent {
		selector: String,
		event: String,
		#[serde(default)]
		detail: serde_json::Value,
	},
	PushUrl {
		url: String,
		#[serde(default)]
		title: Option<String>,
	},
}

impl Action {
	pub fn name(&self) -> &'static str {
		match self {
			Self::AddClass { .. } => "addClass",
			Self::RemoveClass { .. } => "removeClass",
			Self::SetAttribute { .. } => "setAttribute",
			Self::SetProperty { .. } => "setProperty",
			Self::DispatchEvent { .. } => "dispatchEvent",
			Self::PushUrl { .. } => "pushUrl",
		}
	}

	fn selector(&self) -> Option<&str> {
		match self {
			Self::AddClass { selector, .. }
			| Self::RemoveClass { selector, .. }
			| Self::SetAttribute { selector, .. }
			| Self::SetProperty { selector, .. }
			| Self::DispatchEvent { selector, .. } => Some(selector),
			Self::PushUrl { .. } => None,
		}
	}
}

/// Parses a JSON action list. Entries that are not valid actions are logged
/// and skipped; input that is not a JSON array is an error.
pub fn parse_actions(mx: &Mx, json: &str) -> Result<Vec<Action>> {
	let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
	let mut actions = Vec::with_capacity(entries.len());
	for entry in entries {
		match serde_json::from_value::<Action>(entry.clone()) {
			Ok(action) => actions.push(action),
			Err(err) => warn_log!(mx, "skipping action {}: {}", entry, err),
		}
	}
	Ok(actions)
}

fn set_property(mx: &Mx, element: &Node, property: &str, value: &serde_json::Value) {
	let value = Value::from_json(value);
	match property {
		"value" => element.set_value(&value.to_display_string()),
		"checked" => element.set_checked(value.truthy()),
		"textContent" | "innerText" => element.set_text_content(&value.to_display_string()),
		"innerHTML" => element.set_inner_html(&value.to_display_string()),
		"className" => element.set_class_name(&value.to_display_string()),
		_ => match mx.proxy_for(element) {
			Some(proxy) => proxy.set(property, value),
			None => element.set_attribute(property, &value.to_display_string()),
		},
	}
}

fn run_on(mx: &Mx, action: &Action, element: &Node) {
	match action {
		Action::AddClass { class, .. } => class.split_whitespace().for_each(|token| element.add_class(token)),
		Action::RemoveClass { class, .. } => class.split_whitespace().for_each(|token| element.remove_class(token)),
		Action::SetAttribute { name, value, .. } => element.set_attribute(name, value),
		Action::SetProperty { property, value, .. } => set_property(mx, element, property, value),
		Action::DispatchEvent { event, detail, .. } => {
			let event = Event::builder(event.as_str()).bubbles(true).detail(detail.clone()).build();
			element.dispatch_event(&event);
		}
		Action::PushUrl { .. } => {}
	}
}

/// Runs `actions` in order. An action whose selector matches nothing is
/// logged and skipped.
pub fn run_actions(mx: &Mx, actions: &[Action]) {
	for action in actions {
		if let Action::PushUrl { url, title } = action {
			let title = title.clone().unwrap_or_else(|| mx.document().title());
			if let Err(err) = mx.history().push_state(None, &title, Some(url)) {
				warn_log!(mx, "pushUrl '{}' failed: {}", url, err);
				continue;
			}
			mx.document().set_title(&title);
			continue;
		}
		let Some(selector) = action.selector() else {
			continue;
		};
		let elements = match mx.document().query_selector_all(selector) {
			Ok(elements) if !elements.is_empty() => elements,
			_ => {
				warn_log!(mx, "{} target '{}' not found", action.name(), selector);
				continue;
			}
		};
		for element in &elements {
			run_on(mx, action, element);
		}
		debug_log!("{} applied to {} element(s)", action.name(), elements.len());
	}
}
