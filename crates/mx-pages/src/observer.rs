//! Mutation observer controller.
//!
//! After the first pass, the hydration root is observed for `childList`
//! changes. Added elements are hydrated (so new components run `init()` once),
//! and removed component roots are destroyed. A node that was only moved is
//! still connected when the batch arrives and is left alone.

use mx_dom::{MutationObserver, MutationRecord, Node, ObserverInit};

use crate::debug_log;
use crate::registry::Mx;

fn subtree(node: &Node) -> Vec<Node> {
	let mut nodes = vec![node.clone()];
	nodes.extend(node.descendant_elements());
	nodes
}

fn handle_removed(mx: &Mx, node: &Node) {
	if !node.is_element() || node.is_connected() {
		return;
	}
	let nodes = subtree(node);
	for element in &nodes {
		mx.destroy_element(element);
	}
	mx.forget_processed(&nodes);
}

fn handle_added(mx: &Mx, node: &Node) {
	if !node.is_element() || !node.is_connected() {
		return;
	}
	mx.hydrate(node);
}

/// Handles one delivered batch: removals first, then additions.
pub(crate) fn handle_records(mx: &Mx, records: &[MutationRecord]) {
	for record in records {
		for node in &record.removed_nodes {
			handle_removed(mx, node);
		}
	}
	for record in records {
		for node in &record.added_nodes {
			handle_added(mx, node);
		}
	}
	debug_log!("handled {} mutation record(s)", records.len());
}

/// Starts observing `root`.
pub(crate) fn observe(mx: &Mx, root: &Node) -> MutationObserver {
	let weak_mx = mx.downgrade();
	mx.document()
		.observe(root, ObserverInit::subtree(), move |records: Vec<MutationRecord>| {
			if let Some(mx) = weak_mx.upgrade() {
				handle_records(&mx, &records);
			}
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StartConfig;
	use crate::definition::ObjectDef;
	use crate::value::Value;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn lifecycle(log: &Rc<RefCell<Vec<String>>>) -> ObjectDef {
		let on_init = log.clone();
		let on_destroy = log.clone();
		ObjectDef::from_json(json!({"n": 0}))
			.method("init", move |_| {
				on_init.borrow_mut().push("init".to_string());
				Ok(Value::Undefined)
			})
			.method("destroy", move |_| {
				on_destroy.borrow_mut().push("destroy".to_string());
				Ok(Value::Undefined)
			})
	}

	#[rstest]
	fn test_added_components_are_hydrated_and_removed_destroyed() {
		let mx = Mx::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		mx.component("widget", lifecycle(&log));
		mx.start(StartConfig::new().history(false)).unwrap();

		let body = mx.document().body();
		body.set_inner_html(r#"<section><div mx-data="widget"><b :text="n">4</b></div></section>"#);
		mx.flush();
		assert_eq!(*log.borrow(), vec!["init"]);
		assert_eq!(mx.get("widget").unwrap().get("n"), Value::Number(4.0));

		body.first_child().unwrap().remove();
		mx.flush();
		assert_eq!(*log.borrow(), vec!["init", "destroy"]);
		assert!(mx.get("widget").is_none());
	}

	#[rstest]
	fn test_moved_component_is_kept() {
		let mx = Mx::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		mx.component("widget", lifecycle(&log));
		mx.document()
			.body()
			.set_inner_html(r#"<div id="a"><div mx-data="widget"></div></div><div id="b"></div>"#);
		mx.start(StartConfig::new().history(false)).unwrap();

		let widget = mx.document().query_selector("[mx-data]").unwrap().unwrap();
		mx.document().get_element_by_id("b").unwrap().append_child(&widget).unwrap();
		mx.flush();
		assert_eq!(*log.borrow(), vec!["init"]);
		assert!(mx.get("widget").is_some());
	}

	#[rstest]
	fn test_stores_survive_removal() {
		let mx = Mx::new();
		mx.store("cart", json!({"total": 1}));
		mx.document().body().set_inner_html(r#"<span :text="$cart.total"></span>"#);
		mx.start(StartConfig::new().history(false)).unwrap();
		mx.document().body().set_inner_html("");
		mx.flush();
		assert!(mx.get("cart").is_some());
	}
}
