//! # mx
//!
//! A directive-driven reactive runtime: server-rendered HTML declares its
//! state and bindings with `mx-*` attributes, and the runtime keeps the DOM in
//! step with that state.
//!
//! ## Crates
//!
//! - [`dom`] (`mx-dom`) - headless DOM, event loop, mutation observer and session history
//! - [`pages`] (`mx-pages`) - proxies, hydration, item arrays, swaps and the public registry
//!
//! ## Feature Flags
//!
//! - `debug-hooks` - routes the runtime's internal debug logging to `tracing`
//!
//! ## Example
//!
//! ```rust,ignore
//! use mx::prelude::*;
//! use serde_json::json;
//!
//! let mx = Mx::new();
//! mx.component("counter", json!({"count": 0}));
//! mx.document().body().set_inner_html(
//! 	r#"<div mx-data="counter"><span :text="count">0</span></div>"#,
//! );
//! mx.start(StartConfig::default())?;
//! mx.get("counter").unwrap().set("count", Value::Number(1.0));
//! ```

pub use mx_dom as dom;
pub use mx_pages as pages;

pub use mx_pages::{
	Action, ClassList, Definition, HistoryState, HttpRequest, HttpResponse, ItemArray, Mx, MxError,
	ObjectDef, Proxy, RequestOptions, Result, StartConfig, SubArray, SwapMode, SwapOptions,
	SwapStrategy, Template, TemplateSwapOptions, Transport, TransportError, Value,
};

/// Commonly used types.
pub mod prelude {
	pub use mx_dom::{Document, Event, Node, Window};
	pub use mx_pages::{
		ClassList, Definition, ItemArray, Mx, ObjectDef, Proxy, RequestOptions, StartConfig,
		SubArray, SwapOptions, SwapStrategy, TemplateSwapOptions, Value,
	};
}
