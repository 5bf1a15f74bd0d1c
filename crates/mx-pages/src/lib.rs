//! mx Pages - directive-driven reactive runtime
//!
//! Server-rendered HTML declares its bindings with `mx-*` attributes; the
//! runtime reads the initial state out of the DOM, keeps it in observable
//! proxies and re-renders exactly the bound DOM aspects whenever a property is
//! written.
//!
//! ## Features
//!
//! - **Proxy reactivity**: explicit `get`/`set` with per-property reactions
//! - **Hydration**: `mx-data`, `:attr`, `mx-attrs`, `@event`, `mx-show`, `mx-cloak`
//! - **Collections**: `mx-item` arrays with template cloning and sub-arrays
//! - **Swaps**: HTML-over-the-wire with strategies, smart swap and morphing
//! - **History**: swaps snapshot what they replace; `popstate` restores it
//! - **Network**: `mx-load`, `mx-link` and a request wrapper over a pluggable transport
//!
//! ## Architecture
//!
//! - [`registry`]: the [`Mx`] context (components, stores, lifecycle)
//! - [`proxy`], [`reaction`], [`class_list`]: the reactive core
//! - [`hydration`]: directive scan and bindings
//! - [`items`]: item arrays and sub-arrays
//! - [`swap`], [`history`], [`request`], [`actions`]: server interaction
//! - [`expr`]: the directive expression language
//!
//! ## Example
//!
//! ```ignore
//! use mx_pages::{Mx, StartConfig};
//! use serde_json::json;
//!
//! let mx = Mx::new();
//! mx.component("counter", json!({"count": 0}));
//! mx.document().body().set_inner_html(
//! 	r#"<div mx-data="counter"><span :text="count">0</span><button @click="count++">+</button></div>"#,
//! );
//! mx.start(StartConfig::default())?;
//! ```

pub mod logging;

pub mod actions;
pub mod class_list;
pub mod config;
pub mod definition;
pub mod directive;
pub mod error;
pub mod expr;
pub mod history;
pub mod hydration;
pub mod items;
mod observer;
pub mod parse;
pub mod proxy;
pub mod reaction;
pub mod registry;
pub mod request;
pub mod swap;
pub mod value;

pub use actions::Action;
pub use class_list::ClassList;
pub use config::StartConfig;
pub use definition::{Definition, ObjectDef};
pub use error::{MxError, Result};
pub use history::HistoryState;
pub use hydration::{EventBinding, HydrationError, hydrate};
pub use items::{ItemArray, SubArray};
pub use parse::{NumberParser, ValueParser};
pub use proxy::{Proxy, WeakProxy};
pub use reaction::{Reaction, ReactionKind};
pub use registry::{Mx, WeakMx};
pub use request::{HttpRequest, HttpResponse, RequestOptions, Transport, TransportError};
pub use swap::{SwapMode, SwapOptions, SwapStrategy, Template, TemplateSwapOptions};
pub use value::{CallContext, Function, Value};

pub use mx_dom;
