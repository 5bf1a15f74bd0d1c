//! DOM events and listener bookkeeping.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::node::Node;
use crate::tree::NodeId;

/// A dispatched event. Cloning shares the underlying event, so flags set by one
/// listener (`prevent_default`, `stop_propagation`) are visible to the dispatcher.
#[derive(Clone)]
pub struct Event {
	inner: Rc<EventInner>,
}

struct EventInner {
	event_type: String,
	bubbles: bool,
	detail: serde_json::Value,
	state: Option<serde_json::Value>,
	key: Option<String>,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl Event {
	/// Creates a bubbling event without payload.
	pub fn new(event_type: impl Into<String>) -> Self {
		Self::builder(event_type).build()
	}

	/// Starts building an event.
	pub fn builder(event_type: impl Into<String>) -> EventBuilder {
		EventBuilder {
			event_type: event_type.into(),
			bubbles: true,
			detail: serde_json::Value::Null,
			state: None,
			key: None,
		}
	}

	/// The event type, e.g. `click`.
	pub fn event_type(&self) -> &str {
		&self.inner.event_type
	}

	/// Whether the event walks up the ancestor chain.
	pub fn bubbles(&self) -> bool {
		self.inner.bubbles
	}

	/// `CustomEvent.detail` payload.
	pub fn detail(&self) -> &serde_json::Value {
		&self.inner.detail
	}

	/// `PopStateEvent.state` payload.
	pub fn state(&self) -> Option<&serde_json::Value> {
		self.inner.state.as_ref()
	}

	/// `KeyboardEvent.key`.
	pub fn key(&self) -> Option<&str> {
		self.inner.key.as_deref()
	}

	/// The node the event was dispatched on.
	pub fn target(&self) -> Option<Node> {
		self.inner.target.borrow().clone()
	}

	/// The node whose listener is currently running.
	pub fn current_target(&self) -> Option<Node> {
		self.inner.current_target.borrow().clone()
	}

	pub fn prevent_default(&self) {
		self.inner.default_prevented.set(true);
	}

	pub fn default_prevented(&self) -> bool {
		self.inner.default_prevented.get()
	}

	pub fn stop_propagation(&self) {
		self.inner.propagation_stopped.set(true);
	}

	pub fn propagation_stopped(&self) -> bool {
		self.inner.propagation_stopped.get()
	}

	pub(crate) fn set_target(&self, target: Option<Node>) {
		*self.inner.target.borrow_mut() = target;
	}

	pub(crate) fn set_current_target(&self, target: Option<Node>) {
		*self.inner.current_target.borrow_mut() = target;
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("type", &self.inner.event_type)
			.field("bubbles", &self.inner.bubbles)
			.field("default_prevented", &self.default_prevented())
			.finish()
	}
}

/// Builder for [`Event`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
	event_type: String,
	bubbles: bool,
	detail: serde_json::Value,
	state: Option<serde_json::Value>,
	key: Option<String>,
}

impl EventBuilder {
	pub fn bubbles(mut self, bubbles: bool) -> Self {
		self.bubbles = bubbles;
		self
	}

	pub fn detail(mut self, detail: serde_json::Value) -> Self {
		self.detail = detail;
		self
	}

	pub fn state(mut self, state: Option<serde_json::Value>) -> Self {
		self.state = state;
		self
	}

	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub fn build(self) -> Event {
		Event {
			inner: Rc::new(EventInner {
				event_type: self.event_type,
				bubbles: self.bubbles,
				detail: self.detail,
				state: self.state,
				key: self.key,
				target: RefCell::new(None),
				current_target: RefCell::new(None),
				default_prevented: Cell::new(false),
				propagation_stopped: Cell::new(false),
			}),
		}
	}
}

pub(crate) type Callback = Rc<dyn Fn(&Event)>;

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Target {
	Window,
	Node(NodeId),
}

#[derive(Clone)]
struct ListenerEntry {
	id: u64,
	event_type: String,
	callback: Callback,
	once: bool,
}

#[derive(Default)]
pub(crate) struct ListenerMap {
	next_id: u64,
	entries: HashMap<Target, Vec<ListenerEntry>>,
}

impl ListenerMap {
	pub(crate) fn add(&mut self, target: Target, event_type: &str, callback: Callback, once: bool) -> u64 {
		self.next_id += 1;
		let id = self.next_id;
		self.entries.entry(target).or_default().push(ListenerEntry {
			id,
			event_type: event_type.to_string(),
			callback,
			once,
		});
		id
	}

	pub(crate) fn remove(&mut self, target: Target, id: u64) {
		if let Some(list) = self.entries.get_mut(&target) {
			list.retain(|entry| entry.id != id);
		}
	}

	/// Returns the callbacks to run for `event_type`, unregistering `once` listeners.
	pub(crate) fn take_matching(&mut self, target: Target, event_type: &str) -> Vec<Callback> {
		let Some(list) = self.entries.get_mut(&target) else {
			return Vec::new();
		};
		let callbacks = list
			.iter()
			.filter(|entry| entry.event_type == event_type)
			.map(|entry| entry.callback.clone())
			.collect();
		list.retain(|entry| !(entry.once && entry.event_type == event_type));
		callbacks
	}

	pub(crate) fn count(&self, target: Target, event_type: &str) -> usize {
		self.entries.get(&target).map_or(0, |list| {
			list.iter()
				.filter(|entry| entry.event_type == event_type)
				.count()
		})
	}

	pub(crate) fn clear(&mut self) {
		self.entries.clear();
	}
}

/// Handle returned when registering a listener; call [`EventHandle::remove`] to detach it.
#[derive(Clone)]
pub struct EventHandle {
	pub(crate) document: Document,
	pub(crate) target: Target,
	pub(crate) id: u64,
}

impl EventHandle {
	/// Detaches the listener. Removing twice is a no-op.
	pub fn remove(&self) {
		self.document
			.inner
			.listeners
			.borrow_mut()
			.remove(self.target, self.id);
	}
}

impl fmt::Debug for EventHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHandle")
			.field("target", &self.target)
			.field("id", &self.id)
			.finish()
	}
}
