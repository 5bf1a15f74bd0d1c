//! The runtime context.
//!
//! [`Mx`] is the single process-scoped object that owns every registry the
//! runtime needs: component definitions, stores, live component proxies and
//! `mx-ref` aliases, the hydration bookkeeping, named templates and the mutation
//! observer. It is passed explicitly to every hydration and directive routine;
//! [`Mx::reset`] clears it for test isolation.

use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use mx_dom::{Console, Document, Event, EventHandle, EventLoop, History, MutationObserver, Node, Window};

use crate::actions::{Action, parse_actions, run_actions};
use crate::config::StartConfig;
use crate::definition::Definition;
use crate::error::{MxError, Result};
use crate::hydration::{self, EventBinding, EventRegistry, HydrationError};
use crate::parse::{ParserRegistry, ValueParser};
use crate::proxy::Proxy;
use crate::reaction::Reaction;
use crate::request::{RequestOptions, Transport};
use crate::swap::{self, SwapOptions, SwapStrategy, Template, TemplateSwapOptions};
use crate::value::Value;
use crate::{debug_log, history, observer};

/// Runtime context. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Mx {
	inner: Rc<MxInner>,
}

/// Non-owning handle held by listeners and deferred tasks.
#[derive(Clone)]
pub struct WeakMx(Weak<MxInner>);

impl WeakMx {
	pub fn upgrade(&self) -> Option<Mx> {
		self.0.upgrade().map(|inner| Mx { inner })
	}
}

struct MxInner {
	window: Window,
	definitions: RefCell<HashMap<String, Definition>>,
	stores: RefCell<IndexMap<String, Proxy>>,
	/// Live singleton components by name.
	components: RefCell<HashMap<String, Proxy>>,
	/// `mx-ref` aliases.
	refs: RefCell<HashMap<String, Proxy>>,
	/// `mx-data` root element to its proxy.
	bound: RefCell<HashMap<Node, Proxy>>,
	processed: RefCell<HashSet<Node>>,
	parsers: RefCell<ParserRegistry>,
	templates: RefCell<IndexMap<String, Template>>,
	observer: RefCell<Option<MutationObserver>>,
	popstate: RefCell<Option<EventHandle>>,
	config: RefCell<StartConfig>,
	transport: RefCell<Option<Rc<dyn Transport>>>,
	/// Listeners attached by event directives.
	events: RefCell<EventRegistry>,
	/// Transition generation per element; a newer toggle supersedes older callbacks.
	transitions: RefCell<HashMap<Node, u64>>,
	started: Cell<bool>,
}

impl Default for Mx {
	fn default() -> Self {
		Self::new()
	}
}

impl Mx {
	/// A runtime over a fresh, empty window.
	pub fn new() -> Self {
		Self::with_window(Window::new())
	}

	pub fn with_window(window: Window) -> Self {
		Self {
			inner: Rc::new(MxInner {
				window,
				definitions: RefCell::new(HashMap::new()),
				stores: RefCell::new(IndexMap::new()),
				components: RefCell::new(HashMap::new()),
				refs: RefCell::new(HashMap::new()),
				bound: RefCell::new(HashMap::new()),
				processed: RefCell::new(HashSet::new()),
				parsers: RefCell::new(ParserRegistry::default()),
				templates: RefCell::new(IndexMap::new()),
				observer: RefCell::new(None),
				popstate: RefCell::new(None),
				config: RefCell::new(StartConfig::default()),
				transport: RefCell::new(None),
				events: RefCell::new(EventRegistry::new()),
				transitions: RefCell::new(HashMap::new()),
				started: Cell::new(false),
			}),
		}
	}

	pub fn downgrade(&self) -> WeakMx {
		WeakMx(Rc::downgrade(&self.inner))
	}

	pub fn ptr_eq(&self, other: &Mx) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	// Environment

	pub fn window(&self) -> &Window {
		&self.inner.window
	}

	pub fn document(&self) -> &Document {
		self.inner.window.document()
	}

	pub fn history(&self) -> &History {
		self.inner.window.history()
	}

	pub fn console(&self) -> &Console {
		self.inner.window.console()
	}

	pub fn event_loop(&self) -> &EventLoop {
		self.inner.window.event_loop()
	}

	/// Runs pending microtasks and ready futures until quiescent.
	pub fn flush(&self) {
		self.event_loop().flush();
	}

	pub fn is_started(&self) -> bool {
		self.inner.started.get()
	}

	pub fn config(&self) -> Ref<'_, StartConfig> {
		self.inner.config.borrow()
	}

	// Registration

	/// Registers a component. Takes effect for elements hydrated afterwards.
	pub fn component(&self, name: &str, definition: impl Into<Definition>) {
		self.inner
			.definitions
			.borrow_mut()
			.insert(name.to_string(), definition.into());
	}

	/// Registers a store. Stores are created immediately, live for the whole
	/// session, have no element and are never destroyed.
	pub fn store(&self, name: &str, definition: impl Into<Definition>) -> Proxy {
		let definition = definition.into();
		let proxy = Proxy::new(name, definition.instantiate(), None);
		self.inner
			.stores
			.borrow_mut()
			.insert(name.to_string(), proxy.clone());
		if let Some(Err(err)) = proxy.call(self, "init", &[]) {
			crate::error_log!(self, "init() of store '{}' failed: {}", name, err);
		}
		proxy.mark_initialized();
		proxy
	}

	pub fn register_parser(&self, name: &str, parser: impl ValueParser + 'static) {
		self.inner.parsers.borrow_mut().register(name, parser);
	}

	pub(crate) fn parser(&self, name: &str) -> Option<Rc<dyn ValueParser>> {
		self.inner.parsers.borrow().get(name)
	}

	pub fn set_transport(&self, transport: impl Transport + 'static) {
		*self.inner.transport.borrow_mut() = Some(Rc::new(transport));
	}

	pub(crate) fn transport(&self) -> Option<Rc<dyn Transport>> {
		self.inner.transport.borrow().clone()
	}

	/// Looks up a store, a live singleton component or an `mx-ref` alias.
	pub fn get(&self, name: &str) -> Option<Proxy> {
		if let Some(store) = self.inner.stores.borrow().get(name) {
			return Some(store.clone());
		}
		if let Some(component) = self.inner.components.borrow().get(name) {
			return Some(component.clone());
		}
		self.inner.refs.borrow().get(name).cloned()
	}

	pub(crate) fn definition(&self, name: &str) -> Option<Definition> {
		self.inner.definitions.borrow().get(name).cloned()
	}

	pub(crate) fn singleton(&self, name: &str) -> Option<Proxy> {
		self.inner.components.borrow().get(name).cloned()
	}

	pub(crate) fn set_singleton(&self, name: &str, proxy: &Proxy) {
		self.inner
			.components
			.borrow_mut()
			.insert(name.to_string(), proxy.clone());
	}

	pub(crate) fn set_ref(&self, alias: &str, proxy: &Proxy) {
		self.inner
			.refs
			.borrow_mut()
			.insert(alias.to_string(), proxy.clone());
	}

	// Hydration bookkeeping

	pub(crate) fn bind_element(&self, element: &Node, proxy: &Proxy) {
		self.inner
			.bound
			.borrow_mut()
			.insert(element.clone(), proxy.clone());
	}

	/// The proxy created for an `mx-data` element.
	pub fn proxy_for(&self, element: &Node) -> Option<Proxy> {
		self.inner.bound.borrow().get(element).cloned()
	}

	/// Proxy of the nearest `mx-data` ancestor (inclusive).
	pub fn closest_proxy(&self, element: &Node) -> Option<Proxy> {
		let bound = self.inner.bound.borrow();
		let mut current = Some(element.clone());
		while let Some(node) = current {
			if let Some(proxy) = bound.get(&node) {
				return Some(proxy.clone());
			}
			current = node.parent_element();
		}
		None
	}

	pub(crate) fn is_processed(&self, element: &Node) -> bool {
		self.inner.processed.borrow().contains(element)
	}

	pub(crate) fn mark_processed(&self, element: &Node) {
		self.inner.processed.borrow_mut().insert(element.clone());
	}

	/// Forgets a removed component root: runs `destroy()`, drops its registry
	/// entries and the hydration marks of its subtree.
	pub(crate) fn register_listener(&self, element: &Node, handle: EventHandle) {
		self.inner.events.borrow_mut().register(element, handle);
	}

	/// Tears down what hydration attached to a removed element: its listeners,
	/// its transition state and, for a component root, the component itself.
	pub(crate) fn destroy_element(&self, element: &Node) {
		self.inner.events.borrow_mut().unregister(element);
		self.inner.transitions.borrow_mut().remove(element);
		let Some(proxy) = self.inner.bound.borrow_mut().remove(element) else {
			return;
		};
		if let Some(Err(err)) = proxy.call(self, "destroy", &[]) {
			crate::error_log!(self, "destroy() of '{}' failed: {}", proxy.name(), err);
		}
		self.inner
			.components
			.borrow_mut()
			.retain(|_, component| !component.ptr_eq(&proxy));
		self.inner
			.refs
			.borrow_mut()
			.retain(|_, aliased| !aliased.ptr_eq(&proxy));
		debug_log!("destroyed component '{}'", proxy.name());
	}

	pub(crate) fn forget_processed(&self, elements: &[Node]) {
		let mut processed = self.inner.processed.borrow_mut();
		for element in elements {
			processed.remove(element);
		}
	}

	pub(crate) fn next_transition(&self, element: &Node) -> u64 {
		let mut transitions = self.inner.transitions.borrow_mut();
		let generation = transitions.entry(element.clone()).or_insert(0);
		*generation += 1;
		*generation
	}

	pub(crate) fn transition_is_current(&self, element: &Node, generation: u64) -> bool {
		self.inner.transitions.borrow().get(element) == Some(&generation)
	}

	// Templates

	pub(crate) fn register_template(&self, template: Template) {
		self.inner
			.templates
			.borrow_mut()
			.insert(template.name.clone(), template);
	}

	/// A `<template mx-template="name">` collected during hydration.
	pub fn get_template(&self, name: &str) -> Option<Template> {
		self.inner.templates.borrow().get(name).cloned()
	}

	/// Renders a named template, or `source` itself when no template has that
	/// name, substituting `{{ path }}` placeholders from `data`.
	pub fn render_template(&self, name_or_source: &str, data: &serde_json::Value) -> String {
		match self.get_template(name_or_source) {
			Some(template) => swap::render(&template.html, data),
			None => swap::render(name_or_source, data),
		}
	}

	pub fn swap_template(&self, name: &str, options: &TemplateSwapOptions) -> Result<()> {
		swap::swap_template(self, name, options)
	}

	// Lifecycle

	/// Hydrates the configured root, then (optionally) observes it and
	/// installs the `popstate` handler.
	pub fn start(&self, config: StartConfig) -> Result<()> {
		let root = self
			.document()
			.query_selector(&config.root)?
			.ok_or_else(|| HydrationError::RootNotFound(config.root.clone()))?;
		let observe = config.observe;
		let install_history = config.history;
		*self.inner.config.borrow_mut() = config;

		self.hydrate(&root);
		if observe && self.inner.observer.borrow().is_none() {
			let handle = observer::observe(self, &root);
			*self.inner.observer.borrow_mut() = Some(handle);
		}
		if install_history && self.inner.popstate.borrow().is_none() {
			let handle = history::install(self);
			*self.inner.popstate.borrow_mut() = Some(handle);
		}
		self.inner.started.set(true);
		debug_log!("mx started on {:?}", root);
		Ok(())
	}

	/// Hydrates `root` and its subtree. Already processed elements are skipped.
	pub fn hydrate(&self, root: &Node) {
		hydration::hydrate(self, root);
	}

	/// Tears down the observer and every listener, and clears all registries.
	pub fn reset(&self) {
		if let Some(observer) = self.inner.observer.borrow_mut().take() {
			observer.disconnect();
		}
		if let Some(handle) = self.inner.popstate.borrow_mut().take() {
			handle.remove();
		}
		self.document().clear_listeners();
		let bound: Vec<Proxy> = self.inner.bound.borrow_mut().drain().map(|(_, proxy)| proxy).collect();
		for proxy in bound {
			proxy.clear_reactions();
		}
		self.inner.definitions.borrow_mut().clear();
		self.inner.stores.borrow_mut().clear();
		self.inner.components.borrow_mut().clear();
		self.inner.refs.borrow_mut().clear();
		self.inner.processed.borrow_mut().clear();
		self.inner.templates.borrow_mut().clear();
		self.inner.events.borrow_mut().clear();
		self.inner.transitions.borrow_mut().clear();
		*self.inner.parsers.borrow_mut() = ParserRegistry::default();
		*self.inner.config.borrow_mut() = StartConfig::default();
		self.inner.started.set(false);
	}

	// Reactivity

	/// Calls `callback(new, old)` whenever the property at `path` is written
	/// (`"$cart.total"`, `"counter.count"`), and after each settled item-array
	/// mutation of it.
	pub fn watch(&self, path: &str, callback: impl Fn(&Value, &Value) + 'static) -> Result<()> {
		let trimmed = path.trim();
		let (name, rest) = trimmed.split_once('.').ok_or_else(|| MxError::UnresolvedScope(path.to_string()))?;
		let root = self
			.get(name.strip_prefix('$').unwrap_or(name))
			.ok_or_else(|| MxError::UnresolvedScope(path.to_string()))?;
		let (proxy, key) =
			hydration::walk_path(&root, rest).ok_or_else(|| MxError::UnresolvedScope(path.to_string()))?;
		proxy.register_reaction(&key, Reaction::effect(callback));
		Ok(())
	}

	/// Adds a listener with directive modifier semantics: `"click.prevent"`,
	/// `"keydown.enter"`, `"click.outside"`.
	pub fn on(&self, element: &Node, spec: &str, callback: impl Fn(&Event) + 'static) -> Result<EventHandle> {
		let binding = EventBinding::parse(spec)
			.ok_or_else(|| HydrationError::EventAttachmentFailed(format!("invalid event '{}'", spec)))?;
		Ok(hydration::attach_event(element, &binding, Rc::new(callback)))
	}

	// Swaps and requests

	/// Applies `html` to the document. `None` strategies use smart swap.
	pub fn swap(&self, html: &str, strategies: Option<&[SwapStrategy]>, options: &SwapOptions) -> Result<()> {
		swap::swap(self, html, strategies, options)
	}

	/// Runs `X-Cubo-Actions`-style instructions.
	pub fn actions(&self, actions: &[Action]) {
		run_actions(self, actions);
	}

	/// Parses a JSON action list and runs it. Invalid entries are skipped.
	pub fn actions_json(&self, json: &str) -> Result<()> {
		let actions = parse_actions(self, json)?;
		self.actions(&actions);
		Ok(())
	}

	/// Sends a request through the configured [`Transport`] and applies the
	/// response.
	pub async fn request(&self, options: RequestOptions) -> Result<()> {
		crate::request::request(self, options).await
	}
}

impl std::fmt::Debug for Mx {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mx")
			.field("stores", &self.inner.stores.borrow().keys().collect::<Vec<_>>())
			.field("components", &self.inner.components.borrow().keys().collect::<Vec<_>>())
			.field("started", &self.inner.started.get())
			.finish()
	}
}
