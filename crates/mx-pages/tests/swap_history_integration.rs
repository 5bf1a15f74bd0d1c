//! Integration tests for HTML-over-the-wire swaps
//!
//! These tests verify that:
//! 1. Server responses are swapped through a pluggable transport
//! 2. Swapped-in components are hydrated
//! 3. Going back in history restores the replaced markup

use async_trait::async_trait;
use futures::executor::block_on;
use mx_pages::{
	HttpRequest, HttpResponse, Mx, RequestOptions, StartConfig, SwapOptions, SwapStrategy,
	TemplateSwapOptions, Transport, TransportError, Value,
};
use rstest::rstest;
use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Replies with queued responses and records every request.
#[derive(Clone, Default)]
struct Scripted {
	responses: Rc<RefCell<VecDeque<HttpResponse>>>,
	seen: Rc<RefCell<Vec<HttpRequest>>>,
}

impl Scripted {
	fn reply(&self, response: HttpResponse) {
		self.responses.borrow_mut().push_back(response);
	}
}

#[async_trait(?Send)]
impl Transport for Scripted {
	async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		self.seen.borrow_mut().push(request);
		self.responses
			.borrow_mut()
			.pop_front()
			.ok_or_else(|| TransportError::Network("no scripted response".to_string()))
	}
}

fn started(body: &str) -> (Mx, Scripted) {
	let mx = Mx::new();
	let transport = Scripted::default();
	mx.set_transport(transport.clone());
	mx.document().body().set_inner_html(body);
	mx.start(StartConfig::default()).unwrap();
	(mx, transport)
}

#[rstest]
fn test_link_click_smart_swaps_and_back_restores() {
	let (mx, transport) = started(
		r#"<nav><a id="next" href="/page/2" mx-link>next</a></nav><main id="content"><p>page 1</p></main>"#,
	);
	transport.reply(HttpResponse::ok(
		r#"<!DOCTYPE html><html><head><title>Page 2</title></head><body><nav>x</nav><main id="content"><p>page 2</p></main></body></html>"#,
	));
	let original = mx.document().body().inner_html();

	mx.document().get_element_by_id("next").unwrap().click();
	mx.flush();

	assert_eq!(transport.seen.borrow()[0].url, "http://localhost/page/2");
	assert_eq!(mx.document().get_element_by_id("content").unwrap().text_content(), "page 2");
	assert_eq!(mx.history().location().path(), "/page/2");

	mx.history().back();
	assert_eq!(mx.document().body().inner_html(), original);
	assert_eq!(mx.history().location().path(), "/");
}

#[rstest]
fn test_swapped_in_components_are_hydrated() {
	let (mx, transport) = started(r#"<section id="panel"><p>old</p></section>"#);
	mx.component("fresh", json!({"count": 0}));
	transport.reply(HttpResponse::ok(
		r#"<section id="panel"><div mx-data="fresh"><b :text="count">9</b></div></section>"#,
	));

	block_on(mx.request(RequestOptions::get("/panel").strategies(vec![SwapStrategy::new("#panel")]))).unwrap();
	mx.flush();

	let fresh = mx.get("fresh").unwrap();
	assert_eq!(fresh.get("count"), Value::Number(9.0));
	fresh.set("count", Value::Number(10.0));
	assert_eq!(mx.document().query_selector("b").unwrap().unwrap().text_content(), "10");
}

#[rstest]
fn test_server_strategies_and_actions_are_applied() {
	let (mx, transport) = started(r#"<ul id="list"><li>a</li></ul><span id="count">1</span>"#);
	transport.reply(
		HttpResponse::ok(r#"<li>b</li>"#)
			.with_header("X-Swap-Strategies", r##"[{"target": "#list:beforeend"}]"##)
			.with_header(
				"X-Cubo-Actions",
				r##"[{"action": "setProperty", "selector": "#count", "property": "textContent", "value": 2}]"##,
			),
	);

	block_on(mx.request(RequestOptions::post("/items", "name=b"))).unwrap();

	let items: Vec<String> = mx
		.document()
		.query_selector_all("#list li")
		.unwrap()
		.iter()
		.map(|li| li.text_content())
		.collect();
	assert_eq!(items, vec!["a", "b"]);
	assert_eq!(mx.document().get_element_by_id("count").unwrap().text_content(), "2");
	assert_eq!(transport.seen.borrow()[0].method, "POST");
}

#[rstest]
fn test_failed_status_leaves_document_untouched() {
	let (mx, transport) = started(r#"<main id="content">stay</main>"#);
	transport.reply(HttpResponse::ok("<main id=\"content\">gone</main>").with_status(500));

	let err = block_on(mx.request(RequestOptions::get("/broken"))).unwrap_err();
	assert!(err.to_string().contains("500"));
	assert_eq!(mx.document().get_element_by_id("content").unwrap().text_content(), "stay");
	assert_eq!(mx.history().length(), 1);
}

#[rstest]
fn test_template_swap_with_history() {
	let (mx, _) = started(
		r##"<template mx-template="greeting" mx-target="#out:innerHTML"><p>Hello {{ user.name }}</p></template><div id="out"></div>"##,
	);
	mx.swap_template(
		"greeting",
		&TemplateSwapOptions::new().data(json!({"user": {"name": "Ada"}})),
	)
	.unwrap();
	assert_eq!(mx.document().get_element_by_id("out").unwrap().inner_html(), "<p>Hello Ada</p>");

	mx.swap(
		"<p>later</p>",
		Some(&[SwapStrategy::new("#out:innerHTML")]),
		&SwapOptions::new().push_url("/later"),
	)
	.unwrap();
	mx.history().back();
	assert_eq!(mx.document().get_element_by_id("out").unwrap().inner_html(), "<p>Hello Ada</p>");
}
