//! Network wrapper
//!
//! Requests go through a [`Transport`] supplied by the embedder; the runtime
//! itself never opens a connection. Every request carries `MX-Request: true`.
//! The response is applied according to its headers:
//!
//! | Header | Effect |
//! |--------|--------|
//! | `MX-Redirect` | GET the given location instead and apply that response |
//! | `X-Swap-Strategies` | JSON strategy list used for the body |
//! | `X-Cubo-Actions` | JSON action list run after the swap |
//!
//! Failures are returned to the caller; the DOM is left untouched and nothing
//! is retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::actions::{parse_actions, run_actions};
use crate::error::{MxError, Result};
use crate::registry::Mx;
use crate::swap::{self, SwapOptions, SwapStrategy};
use crate::{debug_log, error_log};

pub const REQUEST_HEADER: &str = "MX-Request";
pub const REDIRECT_HEADER: &str = "MX-Redirect";
pub const STRATEGIES_HEADER: &str = "X-Swap-Strategies";
pub const ACTIONS_HEADER: &str = "X-Cubo-Actions";

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers
		.iter()
		.find(|(key, _)| key.eq_ignore_ascii_case(name))
		.map(|(_, value)| value.as_str())
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
	pub method: String,
	/// Absolute URL.
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Option<String>,
}

impl HttpRequest {
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: "GET".to_string(),
			url: url.into(),
			headers: Vec::new(),
			body: None,
		}
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
	pub status: u16,
	pub headers: Vec<(String, String)>,
	pub body: String,
}

impl HttpResponse {
	/// `200` with `body` and no headers.
	pub fn ok(body: impl Into<String>) -> Self {
		Self {
			status: 200,
			headers: Vec::new(),
			body: body.into(),
		}
	}

	pub fn with_status(mut self, status: u16) -> Self {
		self.status = status;
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
	#[error("network error: {0}")]
	Network(String),
	#[error("HTTP {status} from {url}")]
	Status { status: u16, url: String },
	#[error("no transport configured")]
	Unavailable,
}

/// Performs HTTP requests for the runtime.
#[async_trait(?Send)]
pub trait Transport {
	async fn fetch(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// What to request and how to apply the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
	/// Resolved against the current location.
	pub url: String,
	pub method: String,
	pub headers: Vec<(String, String)>,
	pub body: Option<String>,
	/// Used when the response carries no `X-Swap-Strategies`; `None` smart-swaps.
	pub strategies: Option<Vec<SwapStrategy>>,
	pub swap: SwapOptions,
}

impl RequestOptions {
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			method: "GET".to_string(),
			headers: Vec::new(),
			body: None,
			strategies: None,
			swap: SwapOptions::default(),
		}
	}

	pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
		Self::get(url).method("POST").body(body)
	}

	pub fn method(mut self, method: impl Into<String>) -> Self {
		self.method = method.into().to_ascii_uppercase();
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());
		self
	}

	pub fn strategies(mut self, strategies: Vec<SwapStrategy>) -> Self {
		self.strategies = Some(strategies);
		self
	}

	pub fn swap_options(mut self, swap: SwapOptions) -> Self {
		self.swap = swap;
		self
	}
}

fn resolve_url(base: &Url, url: &str) -> Result<Url> {
	base.join(url).map_err(|_| MxError::InvalidUrl(url.to_string()))
}

/// The final response after following `MX-Redirect`, with its URL and whether
/// a redirect happened.
struct Fetched {
	response: HttpResponse,
	url: Url,
	redirected: bool,
}

async fn fetch(mx: &Mx, options: &RequestOptions) -> Result<Fetched> {
	let transport = mx.transport().ok_or(TransportError::Unavailable)?;
	let max_redirects = mx.config().max_redirects;
	let mut url = resolve_url(&mx.history().location(), &options.url)?;
	let mut request = HttpRequest {
		method: options.method.clone(),
		url: url.to_string(),
		headers: options.headers.clone(),
		body: options.body.clone(),
	};
	let mut redirects = 0;
	loop {
		request.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(REQUEST_HEADER));
		request.headers.push((REQUEST_HEADER.to_string(), "true".to_string()));
		debug_log!("{} {}", request.method, request.url);
		let response = transport.fetch(request.clone()).await?;
		if !response.is_success() {
			return Err(TransportError::Status {
				status: response.status,
				url: url.to_string(),
			}
			.into());
		}
		let Some(location) = response.header(REDIRECT_HEADER).map(str::to_string) else {
			return Ok(Fetched {
				response,
				url,
				redirected: redirects > 0,
			});
		};
		redirects += 1;
		if redirects > max_redirects {
			return Err(MxError::TooManyRedirects(max_redirects));
		}
		url = resolve_url(&url, &location)?;
		request = HttpRequest::get(url.to_string());
	}
}

/// Strategies sent by the server, if any. A malformed header is logged and
/// ignored.
fn header_strategies(mx: &Mx, response: &HttpResponse) -> Option<Vec<SwapStrategy>> {
	let raw = response.header(STRATEGIES_HEADER)?;
	match serde_json::from_str(raw) {
		Ok(strategies) => Some(strategies),
		Err(err) => {
			error_log!(mx, "invalid {} header: {}", STRATEGIES_HEADER, err);
			None
		}
	}
}

fn run_header_actions(mx: &Mx, response: &HttpResponse) {
	let Some(raw) = response.header(ACTIONS_HEADER) else {
		return;
	};
	match parse_actions(mx, raw) {
		Ok(actions) => run_actions(mx, &actions),
		Err(err) => error_log!(mx, "invalid {} header: {}", ACTIONS_HEADER, err),
	}
}

/// Requests `options.url` and applies the response to the document.
pub async fn request(mx: &Mx, options: RequestOptions) -> Result<()> {
	let fetched = fetch(mx, &options).await?;
	let strategies = header_strategies(mx, &fetched.response).or(options.strategies);
	let mut swap_options = options.swap;
	if fetched.redirected && swap_options.push_url.is_some() {
		swap_options.push_url = Some(fetched.url.to_string());
	}
	swap::swap(mx, &fetched.response.body, strategies.as_deref(), &swap_options)?;
	run_header_actions(mx, &fetched.response);
	Ok(())
}

/// Requests `options.url` and swaps the response into `element`, unless the
/// server sent strategies of its own.
pub async fn request_into(mx: &Mx, options: RequestOptions, element: &mx_dom::Node, select: Option<&str>) -> Result<()> {
	let fetched = fetch(mx, &options).await?;
	match header_strategies(mx, &fetched.response) {
		Some(strategies) => swap::swap(mx, &fetched.response.body, Some(&strategies), &options.swap)?,
		None => swap::swap_into(mx, element, &fetched.response.body, select)?,
	}
	run_header_actions(mx, &fetched.response);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::rc::Rc;

	/// Replies with queued responses and records every request.
	#[derive(Clone, Default)]
	struct Scripted {
		responses: Rc<RefCell<VecDeque<std::result::Result<HttpResponse, TransportError>>>>,
		seen: Rc<RefCell<Vec<HttpRequest>>>,
	}

	impl Scripted {
		fn reply(&self, response: HttpResponse) -> &Self {
			self.responses.borrow_mut().push_back(Ok(response));
			self
		}

		fn fail(&self, err: TransportError) -> &Self {
			self.responses.borrow_mut().push_back(Err(err));
			self
		}
	}

	#[async_trait(?Send)]
	impl Transport for Scripted {
		async fn fetch(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
			self.seen.borrow_mut().push(request);
			self.responses
				.borrow_mut()
				.pop_front()
				.unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
		}
	}

	fn setup(body: &str) -> (Mx, Scripted) {
		let mx = Mx::new();
		mx.document().body().set_inner_html(body);
		let transport = Scripted::default();
		mx.set_transport(transport.clone());
		(mx, transport)
	}

	#[rstest]
	fn test_request_sends_marker_header_and_resolves_url() {
		let (mx, transport) = setup(r#"<div id="out"></div>"#);
		transport.reply(HttpResponse::ok("<p>hi</p>"));
		let options = RequestOptions::post("/save", "a=1").strategies(vec![SwapStrategy::new("#out:innerHTML")]);
		block_on(request(&mx, options)).unwrap();

		let seen = transport.seen.borrow();
		assert_eq!(seen[0].method, "POST");
		assert_eq!(seen[0].url, "http://localhost/save");
		assert_eq!(seen[0].header("mx-request"), Some("true"));
		assert_eq!(mx.document().get_element_by_id("out").unwrap().inner_html(), "<p>hi</p>");
	}

	#[rstest]
	fn test_header_strategies_and_actions() {
		let (mx, transport) = setup(r#"<div id="a">1</div><div id="b">2</div>"#);
		transport.reply(
			HttpResponse::ok("<i>x</i>")
				.with_header(STRATEGIES_HEADER, r##"[{"target": "#b:innerHTML"}]"##)
				.with_header(ACTIONS_HEADER, r##"[{"action": "addClass", "selector": "#a", "class": "done"}]"##),
		);
		block_on(request(&mx, RequestOptions::get("/x").strategies(vec![SwapStrategy::new("#a")]))).unwrap();
		assert_eq!(
			mx.document().body().inner_html(),
			r#"<div id="a" class="done">1</div><div id="b"><i>x</i></div>"#
		);
	}

	#[rstest]
	fn test_redirect_is_followed_and_pushed() {
		let (mx, transport) = setup(r#"<main id="main">old</main>"#);
		transport
			.reply(HttpResponse::ok("").with_header(REDIRECT_HEADER, "/login"))
			.reply(HttpResponse::ok(r#"<main id="main">login</main>"#));
		let options = RequestOptions::get("/account").swap_options(SwapOptions::new().push_url("/account"));
		block_on(request(&mx, options)).unwrap();

		assert_eq!(transport.seen.borrow()[1].url, "http://localhost/login");
		assert_eq!(mx.document().get_element_by_id("main").unwrap().text_content(), "login");
		assert_eq!(mx.history().location().path(), "/login");
	}

	#[rstest]
	fn test_redirect_chain_is_bounded() {
		let (mx, transport) = setup("");
		for _ in 0..10 {
			transport.reply(HttpResponse::ok("").with_header(REDIRECT_HEADER, "/again"));
		}
		let err = block_on(request(&mx, RequestOptions::get("/loop"))).unwrap_err();
		assert!(matches!(err, MxError::TooManyRedirects(5)));
		assert_eq!(transport.seen.borrow().len(), 6);
	}

	#[rstest]
	fn test_failures_leave_dom_untouched() {
		let (mx, transport) = setup(r#"<div id="content">keep</div>"#);
		transport
			.fail(TransportError::Network("offline".to_string()))
			.reply(HttpResponse::ok(r#"<div id="content">error page</div>"#).with_status(500));

		let err = block_on(request(&mx, RequestOptions::get("/a"))).unwrap_err();
		assert_eq!(err.to_string(), "network error: offline");
		let err = block_on(request(&mx, RequestOptions::get("/b"))).unwrap_err();
		assert_eq!(err.to_string(), "HTTP 500 from http://localhost/b");
		assert_eq!(mx.document().body().inner_html(), r#"<div id="content">keep</div>"#);
	}

	#[rstest]
	fn test_missing_transport() {
		let mx = Mx::new();
		let err = block_on(request(&mx, RequestOptions::get("/"))).unwrap_err();
		assert!(matches!(err, MxError::Transport(TransportError::Unavailable)));
	}
}
