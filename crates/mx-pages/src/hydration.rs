//! Client-side hydration.
//!
//! Scans server-rendered markup for `mx-*` directives and wires the DOM to
//! component state. See [`hydrate`] for the order of the passes.

mod attrs;
mod bindings;
mod events;
mod navigation;
mod runtime;
mod scope;
mod show;

pub use events::{EventBinding, EventRegistry, attach_event};
pub use runtime::{HydrationError, hydrate};
pub use scope::{resolve_path, walk_path};

pub(crate) use bindings::{BoundParser, bind_property, read_dom};
pub(crate) use runtime::hydrate_item_node;
