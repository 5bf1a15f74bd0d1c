//! `MutationObserver` for `childList` changes.
//!
//! Records are queued per registration while the DOM is mutated and handed to
//! the callbacks in a single batch on the next microtask.

use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::node::Node;
use crate::tree::{NodeId, Tree};

/// One `childList` change.
#[derive(Debug, Clone)]
pub struct MutationRecord {
	/// The parent whose children changed.
	pub target: Node,
	pub added_nodes: Vec<Node>,
	pub removed_nodes: Vec<Node>,
}

/// Options accepted by [`Document::observe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverInit {
	pub child_list: bool,
	pub subtree: bool,
}

impl ObserverInit {
	/// `{ childList: true, subtree: true }`
	pub fn subtree() -> Self {
		Self {
			child_list: true,
			subtree: true,
		}
	}
}

pub(crate) type ObserverCallback = Rc<dyn Fn(Vec<MutationRecord>)>;

#[derive(Debug, Clone)]
pub(crate) struct RawRecord {
	pub(crate) target: NodeId,
	pub(crate) added: Vec<NodeId>,
	pub(crate) removed: Vec<NodeId>,
}

struct Registration {
	id: u64,
	target: NodeId,
	init: ObserverInit,
	callback: ObserverCallback,
	pending: Vec<RawRecord>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
	next_id: u64,
	registrations: Vec<Registration>,
	pub(crate) delivery_scheduled: bool,
}

impl ObserverRegistry {
	pub(crate) fn register(&mut self, target: NodeId, init: ObserverInit, callback: ObserverCallback) -> u64 {
		self.next_id += 1;
		self.registrations.push(Registration {
			id: self.next_id,
			target,
			init,
			callback,
			pending: Vec::new(),
		});
		self.next_id
	}

	pub(crate) fn unregister(&mut self, id: u64) {
		self.registrations.retain(|registration| registration.id != id);
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.registrations.is_empty()
	}

	/// Queues `record` on every interested registration. Returns whether any took it.
	pub(crate) fn enqueue(&mut self, tree: &Tree, record: &RawRecord) -> bool {
		let mut queued = false;
		for registration in &mut self.registrations {
			if !registration.init.child_list {
				continue;
			}
			let interested = registration.target == record.target
				|| (registration.init.subtree && tree.is_inclusive_ancestor(registration.target, record.target));
			if interested {
				registration.pending.push(record.clone());
				queued = true;
			}
		}
		queued
	}

	pub(crate) fn take_pending(&mut self, id: u64) -> Vec<RawRecord> {
		self.registrations
			.iter_mut()
			.find(|registration| registration.id == id)
			.map(|registration| std::mem::take(&mut registration.pending))
			.unwrap_or_default()
	}

	/// Drains every registration that has pending records.
	pub(crate) fn drain(&mut self) -> Vec<(ObserverCallback, Vec<RawRecord>)> {
		self.delivery_scheduled = false;
		self.registrations
			.iter_mut()
			.filter(|registration| !registration.pending.is_empty())
			.map(|registration| {
				(
					registration.callback.clone(),
					std::mem::take(&mut registration.pending),
				)
			})
			.collect()
	}

	pub(crate) fn clear(&mut self) {
		self.registrations.clear();
		self.delivery_scheduled = false;
	}
}

/// Handle to an active observation.
#[derive(Clone)]
pub struct MutationObserver {
	pub(crate) document: Document,
	pub(crate) id: u64,
}

impl MutationObserver {
	/// Stops observing and drops any undelivered records.
	pub fn disconnect(&self) {
		self.document.inner.observers.borrow_mut().unregister(self.id);
	}

	/// Returns undelivered records without invoking the callback.
	pub fn take_records(&self) -> Vec<MutationRecord> {
		let raw = self.document.inner.observers.borrow_mut().take_pending(self.id);
		self.document.materialize_records(raw)
	}
}

impl fmt::Debug for MutationObserver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MutationObserver").field("id", &self.id).finish()
	}
}
