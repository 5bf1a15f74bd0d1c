//! The browsing context tying a document to its history and event loop.

use url::Url;

use crate::console::Console;
use crate::document::Document;
use crate::error::DomError;
use crate::event::{Event, EventHandle};
use crate::event_loop::EventLoop;
use crate::history::History;

/// Default location of a fresh window.
pub const DEFAULT_URL: &str = "http://localhost/";

#[derive(Debug, Clone)]
pub struct Window {
	document: Document,
	history: History,
}

impl Default for Window {
	fn default() -> Self {
		Self::new()
	}
}

impl Window {
	pub fn new() -> Self {
		let url = Url::parse(DEFAULT_URL).unwrap_or_else(|_| unreachable!("default url is valid"));
		Self::with_location(url)
	}

	/// Creates a window whose initial location is `url`.
	pub fn with_url(url: &str) -> Result<Self, DomError> {
		let url = Url::parse(url).map_err(|_| DomError::InvalidUrl(url.to_string()))?;
		Ok(Self::with_location(url))
	}

	fn with_location(url: Url) -> Self {
		let document = Document::with_env(EventLoop::new(), Console::new());
		let history = History::new(document.clone(), url);
		Self { document, history }
	}

	pub fn document(&self) -> &Document {
		&self.document
	}

	pub fn history(&self) -> &History {
		&self.history
	}

	pub fn location(&self) -> Url {
		self.history.location()
	}

	pub fn event_loop(&self) -> &EventLoop {
		self.document.event_loop()
	}

	pub fn console(&self) -> &Console {
		self.document.console()
	}

	pub fn add_event_listener(&self, event_type: &str, callback: impl Fn(&Event) + 'static) -> EventHandle {
		self.document.add_window_listener(event_type, callback)
	}

	pub fn dispatch_event(&self, event: &Event) -> bool {
		self.document.dispatch_window_event(event)
	}
}
