//! Headless DOM for the mx runtime.
//!
//! `mx-dom` provides the pieces of a browser the reactive runtime talks to: an
//! arena-backed document with web-style node handles, HTML parsing through
//! `scraper`, CSS selectors, bubbling events, a `MutationObserver`, session
//! history and a cooperative event loop. Everything runs on one thread and is
//! driven explicitly, which keeps hydration and swap behaviour deterministic in
//! tests.
//!
//! ```ignore
//! use mx_dom::Window;
//!
//! let window = Window::new();
//! let body = window.document().body();
//! body.set_inner_html(r#"<p id="greeting">Hello</p>"#);
//! assert_eq!(window.document().get_element_by_id("greeting").unwrap().text_content(), "Hello");
//! ```

mod console;
mod document;
mod error;
mod event;
mod event_loop;
mod history;
mod html;
mod node;
mod observer;
mod selector;
mod tree;
mod window;

pub use console::{Console, ConsoleEntry, ConsoleLevel};
pub use document::Document;
pub use error::DomError;
pub use event::{Event, EventBuilder, EventHandle};
pub use event_loop::{EventLoop, FRAME_MS};
pub use history::{History, HistoryEntry};
pub use html::is_full_document;
pub use node::{InsertPosition, Node, NodeType};
pub use observer::{MutationObserver, MutationRecord, ObserverInit};
pub use selector::{Selector, SelectorError};
pub use window::{DEFAULT_URL, Window};

pub use url::Url;
