//! Navigation and template directives.
//!
//! - `mx-load="/fragment"` fetches once on hydration and swaps the response
//!   into `mx-target` (default: the element's own content), optionally picking
//!   `mx-select` out of it.
//! - `mx-link` turns a click on an element with `href` (or `mx-link="/url"`)
//!   into a request whose response is swapped into `mx-target` (smart swap
//!   without one) and whose URL is pushed into history.
//! - `mx-swap-template="name"` swaps a named template on `mx-trigger`
//!   (default `click`).

use mx_dom::{Event, Node};

use crate::error::Result;
use crate::registry::Mx;
use crate::request::{self, RequestOptions};
use crate::swap::{SwapOptions, SwapStrategy, TemplateSwapOptions};
use crate::{debug_log, error_log};

fn non_empty(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn strategy_for(element: &Node) -> Option<SwapStrategy> {
	let target = non_empty(element.get_attribute("mx-target"))?;
	let mut strategy = SwapStrategy::new(target);
	strategy.select = non_empty(element.get_attribute("mx-select"));
	Some(strategy)
}

/// `mx-load`: fetched once, on the event loop.
pub(crate) fn bind_load(mx: &Mx, element: &Node, url: &str) {
	let url = url.trim().to_string();
	if url.is_empty() {
		error_log!(mx, "mx-load without a url");
		return;
	}
	let weak_mx = mx.downgrade();
	let element = element.clone();
	mx.event_loop().spawn_local(async move {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		if let Err(err) = load(&mx, &element, &url).await {
			error_log!(mx, "mx-load of '{}' failed: {}", url, err);
		}
	});
}

async fn load(mx: &Mx, element: &Node, url: &str) -> Result<()> {
	match strategy_for(element) {
		Some(strategy) => {
			let options = RequestOptions::get(url).strategies(vec![strategy]);
			request::request(mx, options).await
		}
		None => {
			let select = non_empty(element.get_attribute("mx-select"));
			request::request_into(mx, RequestOptions::get(url), element, select.as_deref()).await
		}
	}
}

/// `mx-link`: click navigation through the transport.
pub(crate) fn bind_link(mx: &Mx, element: &Node, value: &str) {
	let weak_mx = mx.downgrade();
	let link = element.clone();
	let explicit = non_empty(Some(value.to_string()));
	element.add_event_listener("click", move |event: &Event| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		let Some(url) = explicit.clone().or_else(|| non_empty(link.get_attribute("href"))) else {
			error_log!(mx, "mx-link without href");
			return;
		};
		event.prevent_default();
		let mut options = RequestOptions::get(&url).swap_options(SwapOptions::new().push_url(&url));
		if let Some(strategy) = strategy_for(&link) {
			options = options.strategies(vec![strategy]);
		}
		debug_log!("mx-link navigating to {}", url);
		let weak_mx = mx.downgrade();
		mx.event_loop().spawn_local(async move {
			let Some(mx) = weak_mx.upgrade() else {
				return;
			};
			if let Err(err) = request::request(&mx, options).await {
				error_log!(mx, "navigation to '{}' failed: {}", url, err);
			}
		});
	});
}

/// `mx-swap-template="name"` with `mx-trigger`.
pub(crate) fn bind_swap_template(mx: &Mx, element: &Node, name: &str) {
	let name = name.trim().to_string();
	let trigger = non_empty(element.get_attribute("mx-trigger")).unwrap_or_else(|| "click".to_string());
	let weak_mx = mx.downgrade();
	let source = element.clone();
	let event_type = trigger.clone();
	element.add_event_listener(&event_type, move |event: &Event| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		if trigger == "click" || trigger == "submit" {
			event.prevent_default();
		}
		let mut options = TemplateSwapOptions::new();
		options.target = non_empty(source.get_attribute("mx-target"));
		options.select = non_empty(source.get_attribute("mx-select"));
		if let Err(err) = mx.swap_template(&name, &options) {
			error_log!(mx, "mx-swap-template '{}' failed: {}", name, err);
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::request::{HttpRequest, HttpResponse, Transport, TransportError};
	use async_trait::async_trait;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::rc::Rc;

	struct Fixed {
		body: &'static str,
		seen: Rc<RefCell<Vec<HttpRequest>>>,
	}

	#[async_trait(?Send)]
	impl Transport for Fixed {
		async fn fetch(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
			self.seen.borrow_mut().push(request);
			Ok(HttpResponse::ok(self.body))
		}
	}

	fn mx_with(body: &'static str) -> (Mx, Rc<RefCell<Vec<HttpRequest>>>) {
		let mx = Mx::new();
		let seen = Rc::new(RefCell::new(Vec::new()));
		mx.set_transport(Fixed {
			body,
			seen: seen.clone(),
		});
		(mx, seen)
	}

	#[rstest]
	fn test_load_swaps_into_element() {
		let (mx, seen) = mx_with("<p>loaded</p><p>extra</p>");
		mx.document()
			.body()
			.set_inner_html(r#"<div mx-load="/part" mx-select="p:outerHTML"></div>"#);
		let div = mx.document().body().first_child().unwrap();
		bind_load(&mx, &div, "/part");
		mx.flush();
		assert_eq!(div.inner_html(), "<p>loaded</p>");
		assert_eq!(seen.borrow()[0].header("MX-Request"), Some("true"));
	}

	#[rstest]
	fn test_load_select_defaults_to_inner_content() {
		let (mx, _) = mx_with("<p>loaded</p><p>extra</p>");
		mx.document().body().set_inner_html(r#"<div mx-load="/part" mx-select="p"></div>"#);
		let div = mx.document().body().first_child().unwrap();
		bind_load(&mx, &div, "/part");
		mx.flush();
		assert_eq!(div.inner_html(), "loaded");
	}

	#[rstest]
	fn test_link_swaps_target_and_pushes_url() {
		let (mx, _) = mx_with(r#"<main id="main">next</main>"#);
		mx.document()
			.body()
			.set_inner_html(r##"<a href="/next" mx-target="#main"></a><main id="main">first</main>"##);
		let link = mx.document().body().first_child().unwrap();
		bind_link(&mx, &link, "");
		assert!(!link.click());
		mx.flush();
		assert_eq!(mx.document().get_element_by_id("main").unwrap().text_content(), "next");
		assert_eq!(mx.history().location().path(), "/next");
	}

	#[rstest]
	#[case(r#"<button mx-swap-template="row">add</button>"#, "click")]
	#[case(r#"<button mx-swap-template="row" mx-trigger="dblclick">add</button>"#, "dblclick")]
	fn test_swap_template_runs_on_trigger(#[case] button: &str, #[case] event_type: &str) {
		let (mx, _) = mx_with("");
		mx.document().body().set_inner_html(&format!(
			r##"<template mx-template="row" mx-target="#rows:beforeend"><li>row</li></template><ul id="rows"></ul>{button}"##
		));
		mx.start(crate::config::StartConfig::new().observe(false).history(false)).unwrap();
		let button = mx.document().query_selector("button").unwrap().unwrap();
		let not_prevented = button.dispatch_event(&Event::new(event_type));
		button.dispatch_event(&Event::new(event_type));
		assert_eq!(not_prevented, event_type != "click");
		assert_eq!(mx.document().get_element_by_id("rows").unwrap().inner_html(), "<li>row</li><li>row</li>");
	}

	#[rstest]
	fn test_link_without_href_logs() {
		let (mx, _) = mx_with("");
		mx.document().body().set_inner_html("<button></button>");
		let button = mx.document().body().first_child().unwrap();
		bind_link(&mx, &button, "");
		button.click();
		assert_eq!(mx.console().errors(), vec!["mx-link without href"]);
	}
}
