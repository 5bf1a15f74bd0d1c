//! Integration tests for the directive runtime
//!
//! These tests drive the public API end to end over a headless window:
//! 1. Hydration reads state out of the DOM without running watchers
//! 2. Directives re-render when state changes
//! 3. Item arrays and sub-arrays keep the DOM in step with their data

use mx_dom::Node;
use mx_pages::{Mx, ObjectDef, StartConfig, Value};
use rstest::{fixture, rstest};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[fixture]
fn mx() -> Mx {
	Mx::new()
}

fn start(mx: &Mx, body: &str) {
	mx.document().body().set_inner_html(body);
	mx.start(StartConfig::new().history(false)).unwrap();
}

fn texts(mx: &Mx, selector: &str) -> Vec<String> {
	mx.document()
		.query_selector_all(selector)
		.unwrap()
		.iter()
		.map(Node::text_content)
		.collect()
}

#[rstest]
fn test_hydration_runs_no_watchers(mx: Mx) {
	mx.store("cart", json!({"total": 0}));
	let calls = Rc::new(Cell::new(0));
	let counter = calls.clone();
	mx.watch("$cart.total", move |_, _| counter.set(counter.get() + 1)).unwrap();

	start(&mx, r#"<span id="total" :text="$cart.total">12</span>"#);
	assert_eq!(mx.get("cart").unwrap().get("total"), Value::Number(12.0));
	assert_eq!(calls.get(), 0);

	mx.get("cart").unwrap().set("total", Value::Number(13.0));
	assert_eq!(calls.get(), 1);
	assert_eq!(texts(&mx, "#total"), vec!["13"]);
}

#[rstest]
fn test_item_added_from_event_handler(mx: Mx) {
	mx.component("todos", json!({"todos": []}));
	start(
		&mx,
		r#"<div mx-data="todos"><ul><li mx-item="todos" ::text="title">write</li></ul><button @click="todos.add({title: 'ship'})">add</button></div>"#,
	);
	let todos = mx.get("todos").unwrap();
	assert_eq!(todos.get("todos").as_items().unwrap().len(), 1);

	mx.document().query_selector("button").unwrap().unwrap().click();
	mx.flush();

	assert_eq!(todos.get("todos").as_items().unwrap().len(), 2);
	assert_eq!(texts(&mx, "li"), vec!["write", "ship"]);
}

#[rstest]
fn test_show_follows_toggled_state(mx: Mx) {
	mx.component("menu", json!({"open": false}));
	start(
		&mx,
		r#"<div mx-data="menu"><button @click="open = !open">menu</button><nav mx-show="open">links</nav></div>"#,
	);
	let nav = mx.document().query_selector("nav").unwrap().unwrap();
	assert_eq!(nav.style_property("display"), "none");

	let button = mx.document().query_selector("button").unwrap().unwrap();
	button.click();
	assert_eq!(nav.style_property("display"), "");
	button.click();
	assert_eq!(nav.style_property("display"), "none");
}

#[rstest]
fn test_sub_array_grows_to_assigned_length(mx: Mx) {
	mx.component("posts", json!({"posts": []}));
	start(
		&mx,
		r#"<div mx-data="posts"><article mx-item="posts"><span ::text.array="tags">a</span><span ::text.array="tags">b</span><span ::text.array="tags">c</span></article></div>"#,
	);
	let post = mx.get("posts").unwrap().get("posts").as_items().unwrap().get(0).unwrap();
	assert_eq!(post.get("tags").as_sub_array().unwrap().len(), 3);

	let tags: Vec<Value> = ["v", "w", "x", "y", "z"].into_iter().map(Value::from).collect();
	post.set("tags", Value::array(tags));
	assert_eq!(texts(&mx, "span"), vec!["v", "w", "x", "y", "z"]);

	post.set("tags", Value::array(vec![Value::from("only")]));
	assert_eq!(texts(&mx, "span"), vec!["only"]);
}

#[rstest]
fn test_class_binding_keeps_identity(mx: Mx) {
	mx.component("card", json!({}));
	start(&mx, r#"<div mx-data="card"><p :class="classes" class="a b">x</p></div>"#);
	let card = mx.get("card").unwrap();
	let before = card.get("classes").as_class_list().unwrap().clone();
	assert_eq!(before.tokens(), vec!["a", "b"]);

	card.set("classes", Value::from("c"));
	let after = card.get("classes").as_class_list().unwrap().clone();
	assert!(before.ptr_eq(&after));
	assert_eq!(mx.document().query_selector("p").unwrap().unwrap().class_name(), "c");
}

#[rstest]
fn test_inserted_component_is_initialized_once(mx: Mx) {
	let log = Rc::new(RefCell::new(Vec::new()));
	let sink = log.clone();
	mx.component(
		"late",
		ObjectDef::from_json(json!({"label": ""})).method("init", move |_| {
			sink.borrow_mut().push("init");
			Ok(Value::Undefined)
		}),
	);
	start(&mx, "<main></main>");

	mx.document()
		.query_selector("main")
		.unwrap()
		.unwrap()
		.set_inner_html(r#"<div mx-data="late"><i :text="label">hello</i></div>"#);
	mx.flush();
	mx.flush();

	assert_eq!(*log.borrow(), vec!["init"]);
	assert_eq!(mx.get("late").unwrap().get("label"), Value::from("hello"));
}
