//! Item collection hydration.
//!
//! Every `mx-item="path"` element found under a root is grouped by the
//! property it resolves to. Existing elements become item proxies bound in
//! place; a `<template mx-item>` only supplies the prototype for items created
//! later.

use indexmap::IndexMap;
use mx_dom::Node;

use crate::directive::{Directive, ITEM_ATTR, directives};
use crate::hydration::{self, BoundParser, bind_property, read_dom, resolve_path, walk_path};
use crate::proxy::{ItemMeta, Proxy};
use crate::reaction::ReactionKind;
use crate::registry::Mx;
use crate::value::Value;
use crate::warn_log;

use super::array::ItemArray;
use super::sub_array::SubArray;

/// `node` and its descendants, minus the subtrees of nested `mx-item` elements.
pub(crate) fn item_scope(node: &Node) -> Vec<Node> {
	let mut scope = vec![node.clone()];
	let mut nested: Vec<Node> = Vec::new();
	for element in node.descendant_elements() {
		if nested.iter().any(|outer| outer.contains(&element)) {
			continue;
		}
		if element.has_attribute(ITEM_ATTR) {
			nested.push(element);
			continue;
		}
		scope.push(element);
	}
	scope
}

/// Builds the item proxy for `node` from its `::attr` directives.
///
/// With `data` (items created at runtime) defined values are rendered over the
/// template content; without it the DOM is read into the proxy.
pub(crate) fn build_item(mx: &Mx, meta: &ItemMeta, node: &Node, data: Option<IndexMap<String, Value>>) -> Proxy {
	let state_wins = data.is_some();
	let item = Proxy::new(&meta.variable, data.unwrap_or_default(), Some(node.clone()));
	item.set_item_meta(meta.clone());

	let mut arrays: IndexMap<String, (String, Option<String>, Vec<Node>)> = IndexMap::new();
	for element in item_scope(node) {
		for directive in directives(&element) {
			let Directive::ItemBind {
				attr,
				parser,
				array,
				path,
			} = directive
			else {
				continue;
			};
			if array {
				arrays
					.entry(path)
					.or_insert_with(|| (attr, parser, Vec::new()))
					.2
					.push(element.clone());
				continue;
			}
			match walk_path(&item, &path) {
				Some((owner, key)) => bind_property(mx, &owner, &key, &element, &attr, parser.as_deref(), state_wins),
				None => warn_log!(mx, "cannot resolve item property '{}'", path),
			}
		}
	}
	for (path, (attr, parser, nodes)) in arrays {
		match walk_path(&item, &path) {
			Some((owner, key)) => bind_sub_array(mx, &owner, &key, nodes, &attr, parser.as_deref(), state_wins),
			None => warn_log!(mx, "cannot resolve item property '{}'", path),
		}
	}
	item
}

fn bind_sub_array(
	mx: &Mx,
	owner: &Proxy,
	key: &str,
	nodes: Vec<Node>,
	attr: &str,
	parser: Option<&str>,
	state_wins: bool,
) {
	let parser = BoundParser::lookup(mx, parser);
	let kind = ReactionKind::for_attribute(attr);
	let values: Vec<Value> = nodes
		.iter()
		.map(|node| read_dom(node, &kind, parser.as_ref()).0)
		.collect();
	let formatter = match (&parser, nodes.first()) {
		(Some(parser), Some(first)) => Some(parser.formatter(first)),
		_ => None,
	};
	let Some(sub_array) = SubArray::new(mx, nodes, values, kind, formatter) else {
		return;
	};
	let state = owner.get(key);
	if state_wins {
		if let Some(values) = state.list_values() {
			sub_array.assign(values);
		} else if state.is_nullish() && !state.is_undefined() {
			sub_array.assign(Vec::new());
		}
	}
	owner.bind_sub_array(key, sub_array.clone());
	let value = if sub_array.is_empty() {
		Value::Null
	} else {
		Value::SubArray(sub_array)
	};
	owner.set_silent(key, value);
}

struct Group {
	owner: Proxy,
	key: String,
	elements: Vec<Node>,
}

/// Hydrates every unprocessed `mx-item` collection under `root`.
pub(crate) fn hydrate_items(mx: &Mx, root: &Node) {
	let mut candidates = vec![root.clone()];
	candidates.extend(root.descendant_elements());

	let mut groups: Vec<Group> = Vec::new();
	for element in candidates {
		let Some(path) = element.get_attribute(ITEM_ATTR) else {
			continue;
		};
		if mx.is_processed(&element) {
			continue;
		}
		let Some((owner, key)) = resolve_path(mx, &element, &path) else {
			warn_log!(mx, "cannot resolve scope for mx-item=\"{}\"", path.trim());
			mx.mark_processed(&element);
			continue;
		};
		match groups
			.iter_mut()
			.find(|group| group.owner.ptr_eq(&owner) && group.key == key)
		{
			Some(group) => group.elements.push(element),
			None => groups.push(Group {
				owner,
				key,
				elements: vec![element],
			}),
		}
	}

	for group in groups {
		hydrate_group(mx, group);
	}
}

fn hydrate_group(mx: &Mx, group: Group) {
	let Group { owner, key, elements } = group;
	let initial = owner.get(&key);
	let existing = initial.as_items().cloned();
	let items = existing.clone().unwrap_or_else(|| {
		ItemArray::new(
			mx,
			ItemMeta {
				component: owner.downgrade(),
				variable: key.clone(),
				component_name: owner.name().to_string(),
			},
		)
	});

	let mut adopted = false;
	for element in &elements {
		mx.mark_processed(element);
		if element.tag_name().as_deref() == Some("template") {
			items.set_anchor(element);
			if let Some(prototype) = element.children().first() {
				items.set_template(prototype.clone_node(true));
			}
			continue;
		}
		if !items.has_template() {
			items.set_template(element.clone_node(true));
		}
		let item = build_item(mx, items.meta(), element, None);
		items.adopt(item.clone());
		hydration::hydrate_item_node(mx, element, &item, false);
		adopted = true;
	}
	if adopted {
		items.remember_last_position();
	}

	if existing.is_some() {
		return;
	}
	owner.set_silent(&key, Value::Items(items.clone()));

	// A template-only collection renders the initial state data.
	if !adopted {
		for data in initial.list_values().unwrap_or_default() {
			if let Err(err) = items.insert_item(&data, usize::MAX, false) {
				warn_log!(mx, "cannot render initial item of '{}': {}", key, err);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StartConfig;
	use rstest::rstest;
	use serde_json::json;

	fn start(mx: &Mx, body: &str) {
		mx.document().body().set_inner_html(body);
		mx.start(StartConfig::new().observe(false).history(false)).unwrap();
	}

	#[rstest]
	fn test_item_scope_skips_nested_collections() {
		let mx = Mx::new();
		mx.document()
			.body()
			.set_inner_html(r#"<li mx-item="a"><b></b><ul><li mx-item="b"><i></i></li></ul></li>"#);
		let outer = mx.document().body().first_child().unwrap();
		let tags: Vec<String> = item_scope(&outer)
			.iter()
			.filter_map(Node::tag_name)
			.collect();
		assert_eq!(tags, vec!["li", "b", "ul"]);
	}

	#[rstest]
	fn test_existing_elements_become_items() {
		let mx = Mx::new();
		mx.component("list", json!({"items": []}));
		start(
			&mx,
			r#"<ul mx-data="list"><li mx-item="items" ::text="name">one</li><li mx-item="items" ::text="name">two</li></ul>"#,
		);
		let items = mx.get("list").unwrap().get("items");
		let items = items.as_items().unwrap();
		assert_eq!(items.len(), 2);
		assert_eq!(items.get(1).unwrap().get("name"), Value::from("two"));
		let meta = items.get(0).unwrap().item_meta().unwrap();
		assert_eq!(meta.variable, "items");
		assert_eq!(meta.component_name, "list");
	}

	#[rstest]
	fn test_array_modifier_collects_siblings() {
		let mx = Mx::new();
		mx.component("posts", json!({"posts": []}));
		start(
			&mx,
			r#"<div mx-data="posts"><article mx-item="posts"><h2 ::text="title">Hello</h2><span ::text.array="tags">a</span><span ::text.array="tags">b</span></article></div>"#,
		);
		let post = mx.get("posts").unwrap().get("posts").as_items().unwrap().get(0).unwrap();
		assert_eq!(post.to_json(), json!({"title": "Hello", "tags": ["a", "b"]}));
	}

	#[rstest]
	fn test_template_only_collection_renders_initial_state() {
		let mx = Mx::new();
		mx.component("todos", json!({"todos": [{"title": "write"}, {"title": "ship"}]}));
		start(
			&mx,
			r#"<ul mx-data="todos"><template mx-item="todos"><li ::text="title"></li></template></ul>"#,
		);
		let texts: Vec<String> = mx
			.document()
			.query_selector_all("li")
			.unwrap()
			.iter()
			.map(Node::text_content)
			.collect();
		assert_eq!(texts, vec!["write", "ship"]);
		assert_eq!(mx.get("todos").unwrap().get("todos").as_items().unwrap().len(), 2);
	}

	#[rstest]
	fn test_hydrating_existing_items_is_silent() {
		let mx = Mx::new();
		mx.store("board", json!({"cards": []}));
		let calls = std::rc::Rc::new(std::cell::Cell::new(0));
		let counter = calls.clone();
		mx.watch("$board.cards", move |_, _| counter.set(counter.get() + 1)).unwrap();
		start(
			&mx,
			r#"<ul><li mx-item="$board.cards" ::text="title">a</li><li mx-item="$board.cards" ::text="title">b</li></ul>"#,
		);
		let cards = mx.get("board").unwrap().get("cards");
		assert_eq!(cards.as_items().unwrap().len(), 2);
		assert_eq!(calls.get(), 0);

		cards.as_items().unwrap().add_now(Value::from_json(&json!({"title": "c"}))).unwrap();
		assert_eq!(calls.get(), 1);
	}

	#[rstest]
	#[case("ul:afterbegin", vec!["new", "a", "b"])]
	#[case("#b:beforebegin", vec!["a", "new", "b"])]
	#[case("ul:beforeend", vec!["a", "b", "new"])]
	fn test_swapped_in_items_follow_document_order(#[case] target: &str, #[case] expected: Vec<&str>) {
		let mx = Mx::new();
		mx.component("todos", json!({"todos": []}));
		mx.document().body().set_inner_html(
			r#"<div mx-data="todos"><ul><li mx-item="todos" ::text="title">a</li><li id="b" mx-item="todos" ::text="title">b</li></ul></div>"#,
		);
		mx.start(StartConfig::new().history(false)).unwrap();

		mx.swap(
			r#"<li mx-item="todos" ::text="title">new</li>"#,
			Some(&[crate::swap::SwapStrategy::new(target)]),
			&crate::swap::SwapOptions::new(),
		)
		.unwrap();
		mx.flush();

		let todos = mx.get("todos").unwrap().get("todos");
		let todos = todos.as_items().unwrap();
		let titles: Vec<Value> = todos.to_vec().iter().map(|item| item.get("title")).collect();
		let expected_titles: Vec<Value> = expected.iter().map(|title| Value::from(*title)).collect();
		assert_eq!(titles, expected_titles);
		let texts: Vec<String> = mx
			.document()
			.query_selector_all("li")
			.unwrap()
			.iter()
			.map(Node::text_content)
			.collect();
		assert_eq!(texts, expected);

		todos.add_now(Value::from_json(&json!({"title": "last"}))).unwrap();
		let last = mx.document().query_selector("li:last-child").unwrap().unwrap();
		assert_eq!(last.text_content(), "last");
		assert_eq!(todos.get(expected.len()).unwrap().get("title"), Value::from("last"));
	}

	#[rstest]
	fn test_unresolved_collection_warns_once() {
		let mx = Mx::new();
		start(&mx, r#"<li mx-item="items"></li>"#);
		assert_eq!(mx.console().warnings(), vec![r#"cannot resolve scope for mx-item="items""#]);
	}
}
