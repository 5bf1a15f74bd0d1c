//! Documents own the node arena, listeners and observers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::console::Console;
use crate::event::{Event, EventHandle, ListenerMap, Target};
use crate::event_loop::EventLoop;
use crate::html;
use crate::node::Node;
use crate::observer::{MutationObserver, MutationRecord, ObserverInit, ObserverRegistry, RawRecord};
use crate::selector::{Selector, SelectorError};
use crate::tree::{ElementData, NodeId, NodeKind, Tree};

/// A document: an arena of nodes rooted at a document node with
/// `<html><head></head><body></body></html>`.
#[derive(Clone)]
pub struct Document {
	pub(crate) inner: Rc<DocumentInner>,
}

pub(crate) struct DocumentInner {
	pub(crate) tree: RefCell<Tree>,
	pub(crate) listeners: RefCell<ListenerMap>,
	pub(crate) observers: RefCell<ObserverRegistry>,
	pub(crate) event_loop: EventLoop,
	pub(crate) console: Console,
	root: NodeId,
	html: NodeId,
	head: NodeId,
	body: NodeId,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Creates an empty document with its own event loop and console.
	pub fn new() -> Self {
		Self::with_env(EventLoop::new(), Console::new())
	}

	pub(crate) fn with_env(event_loop: EventLoop, console: Console) -> Self {
		let mut tree = Tree::default();
		let root = tree.alloc(NodeKind::Document);
		let html = tree.alloc(NodeKind::Element(ElementData::new("html", Vec::new())));
		let head = tree.alloc(NodeKind::Element(ElementData::new("head", Vec::new())));
		let body = tree.alloc(NodeKind::Element(ElementData::new("body", Vec::new())));
		tree.append_child(root, html);
		tree.append_child(html, head);
		tree.append_child(html, body);
		Self {
			inner: Rc::new(DocumentInner {
				tree: RefCell::new(tree),
				listeners: RefCell::new(ListenerMap::default()),
				observers: RefCell::new(ObserverRegistry::default()),
				event_loop,
				console,
				root,
				html,
				head,
				body,
			}),
		}
	}

	/// Creates a document whose body holds the parsed `body_html`.
	pub fn from_body(body_html: &str) -> Self {
		let document = Self::new();
		document.body().set_inner_html(body_html);
		document
	}

	pub(crate) fn node(&self, id: NodeId) -> Node {
		Node {
			document: self.clone(),
			id,
		}
	}

	pub(crate) fn downgrade(&self) -> Weak<DocumentInner> {
		Rc::downgrade(&self.inner)
	}

	pub(crate) fn upgrade(weak: &Weak<DocumentInner>) -> Option<Self> {
		weak.upgrade().map(|inner| Self { inner })
	}

	pub fn ptr_eq(&self, other: &Document) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// The document node itself (target of document-level listeners).
	pub fn as_node(&self) -> Node {
		self.node(self.inner.root)
	}

	pub fn document_element(&self) -> Node {
		self.node(self.inner.html)
	}

	pub fn head(&self) -> Node {
		self.node(self.inner.head)
	}

	pub fn body(&self) -> Node {
		self.node(self.inner.body)
	}

	pub fn event_loop(&self) -> &EventLoop {
		&self.inner.event_loop
	}

	pub fn console(&self) -> &Console {
		&self.inner.console
	}

	/// Text of the first `<title>` in `<head>`.
	pub fn title(&self) -> String {
		self.title_element()
			.map(|title| title.text_content().trim().to_string())
			.unwrap_or_default()
	}

	pub fn set_title(&self, title: &str) {
		let element = match self.title_element() {
			Some(element) => element,
			None => {
				let element = self.create_element("title");
				// head always accepts children
				let _ = self.head().append_child(&element);
				element
			}
		};
		element.set_text_content(title);
	}

	fn title_element(&self) -> Option<Node> {
		self.head()
			.children()
			.into_iter()
			.find(|child| child.tag_name().as_deref() == Some("title"))
	}

	pub fn create_element(&self, tag: &str) -> Node {
		let id = self
			.inner
			.tree
			.borrow_mut()
			.alloc(NodeKind::Element(ElementData::new(tag, Vec::new())));
		self.node(id)
	}

	pub fn create_text_node(&self, text: &str) -> Node {
		let id = self.inner.tree.borrow_mut().alloc(NodeKind::Text(text.to_string()));
		self.node(id)
	}

	pub fn create_comment(&self, text: &str) -> Node {
		let id = self.inner.tree.borrow_mut().alloc(NodeKind::Comment(text.to_string()));
		self.node(id)
	}

	pub fn create_document_fragment(&self) -> Node {
		let id = self.inner.tree.borrow_mut().alloc(NodeKind::Fragment);
		self.node(id)
	}

	/// Parses `markup` as body content into a detached fragment.
	pub fn parse_fragment(&self, markup: &str) -> Node {
		let id = html::parse_fragment(&mut self.inner.tree.borrow_mut(), markup);
		self.node(id)
	}

	/// Parses a complete HTML document into a detached `<html>` element.
	pub fn parse_html(&self, markup: &str) -> Node {
		let id = html::parse_document(&mut self.inner.tree.borrow_mut(), markup);
		self.node(id)
	}

	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		self.as_node().query_selector(selector)
	}

	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, SelectorError> {
		self.as_node().query_selector_all(selector)
	}

	/// Every connected element matching an already parsed selector.
	pub fn select(&self, selector: &Selector) -> Vec<Node> {
		self.as_node().select(selector)
	}

	pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
		let tree = self.inner.tree.borrow();
		let found = tree
			.descendants(self.inner.root, false)
			.into_iter()
			.find(|node| tree.attr(*node, "id") == Some(id));
		drop(tree);
		found.map(|node| self.node(node))
	}

	/// Starts observing `target`. Records are delivered on a microtask.
	pub fn observe(
		&self,
		target: &Node,
		init: ObserverInit,
		callback: impl Fn(Vec<MutationRecord>) + 'static,
	) -> MutationObserver {
		let id = self
			.inner
			.observers
			.borrow_mut()
			.register(target.id, init, Rc::new(callback));
		MutationObserver {
			document: self.clone(),
			id,
		}
	}

	/// Queues a `childList` record for observers of `target`.
	pub(crate) fn record_child_list(&self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
		if added.is_empty() && removed.is_empty() {
			return;
		}
		if self.inner.observers.borrow().is_empty() {
			return;
		}
		let record = RawRecord {
			target,
			added,
			removed,
		};
		let queued = {
			let tree = self.inner.tree.borrow();
			self.inner.observers.borrow_mut().enqueue(&tree, &record)
		};
		if !queued {
			return;
		}
		let schedule = {
			let mut observers = self.inner.observers.borrow_mut();
			let schedule = !observers.delivery_scheduled;
			observers.delivery_scheduled = true;
			schedule
		};
		if schedule {
			let weak = self.downgrade();
			self.inner.event_loop.queue_microtask(move || {
				if let Some(document) = Document::upgrade(&weak) {
					document.deliver_mutations();
				}
			});
		}
	}

	/// Hands every pending batch to its observer callback.
	pub fn deliver_mutations(&self) {
		let batches = self.inner.observers.borrow_mut().drain();
		for (callback, raw) in batches {
			let records = self.materialize_records(raw);
			if !records.is_empty() {
				callback(records);
			}
		}
	}

	pub(crate) fn materialize_records(&self, raw: Vec<RawRecord>) -> Vec<MutationRecord> {
		raw.into_iter()
			.map(|record| MutationRecord {
				target: self.node(record.target),
				added_nodes: record.added.into_iter().map(|id| self.node(id)).collect(),
				removed_nodes: record.removed.into_iter().map(|id| self.node(id)).collect(),
			})
			.collect()
	}

	pub(crate) fn add_listener(
		&self,
		target: Target,
		event_type: &str,
		callback: Rc<dyn Fn(&Event)>,
		once: bool,
	) -> EventHandle {
		let id = self
			.inner
			.listeners
			.borrow_mut()
			.add(target, event_type, callback, once);
		EventHandle {
			document: self.clone(),
			target,
			id,
		}
	}

	pub(crate) fn add_window_listener(&self, event_type: &str, callback: impl Fn(&Event) + 'static) -> EventHandle {
		self.add_listener(Target::Window, event_type, Rc::new(callback), false)
	}

	/// Runs window-level listeners for `event`.
	pub(crate) fn dispatch_window_event(&self, event: &Event) -> bool {
		event.set_target(None);
		event.set_current_target(None);
		let callbacks = self
			.inner
			.listeners
			.borrow_mut()
			.take_matching(Target::Window, event.event_type());
		for callback in callbacks {
			callback(event);
			if event.propagation_stopped() {
				break;
			}
		}
		!event.default_prevented()
	}

	/// Number of listeners for `event_type` registered on the window.
	pub fn window_listener_count(&self, event_type: &str) -> usize {
		self.inner
			.listeners
			.borrow()
			.count(Target::Window, event_type)
	}

	/// Drops every listener and observer registration.
	pub fn clear_listeners(&self) {
		self.inner.listeners.borrow_mut().clear();
		self.inner.observers.borrow_mut().clear();
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("title", &self.title())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use rstest::{fixture, rstest};

	#[fixture]
	fn document() -> Document {
		Document::from_body(r#"<main id="app"><p class="lead">Hi</p></main>"#)
	}

	#[rstest]
	fn test_title_round_trip(document: Document) {
		assert_eq!(document.title(), "");
		document.set_title("Inbox");
		document.set_title("Inbox (2)");
		assert_eq!(document.title(), "Inbox (2)");
		assert_eq!(document.head().children().len(), 1);
	}

	#[rstest]
	fn test_get_element_by_id(document: Document) {
		let app = document.get_element_by_id("app").unwrap();
		assert_eq!(app.tag_name().as_deref(), Some("main"));
		assert!(document.get_element_by_id("missing").is_none());
	}

	#[rstest]
	fn test_observer_batches_records_on_microtask(document: Document) {
		let batches = Rc::new(RefCell::new(Vec::new()));
		let sink = batches.clone();
		let observer = document.observe(&document.body(), ObserverInit::subtree(), move |records| {
			sink.borrow_mut().push(records.len());
		});

		let app = document.get_element_by_id("app").unwrap();
		app.append_child(&document.create_element("section")).unwrap();
		app.first_child().unwrap().remove();
		assert!(batches.borrow().is_empty());

		document.event_loop().flush();
		assert_eq!(*batches.borrow(), vec![2]);

		observer.disconnect();
		app.append_child(&document.create_element("aside")).unwrap();
		document.event_loop().flush();
		assert_eq!(*batches.borrow(), vec![2]);
	}

	#[rstest]
	fn test_take_records_drains_without_callback(document: Document) {
		let calls = Rc::new(RefCell::new(0));
		let sink = calls.clone();
		let observer = document.observe(&document.body(), ObserverInit::subtree(), move |_| {
			*sink.borrow_mut() += 1;
		});
		document.body().append_child(&document.create_element("div")).unwrap();

		let records = observer.take_records();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].added_nodes.len(), 1);
		document.event_loop().flush();
		assert_eq!(*calls.borrow(), 0);
	}
}
