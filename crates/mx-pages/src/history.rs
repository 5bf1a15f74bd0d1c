//! History integration
//!
//! Before a history-affecting swap, the current markup of every touched
//! element is stored in the current history entry:
//!
//! ```json
//! {"swaps": [{"selector": "#main:outerHTML", "htmls": ["<main id=\"main\">...</main>"]}], "title": "Home"}
//! ```
//!
//! Each selector carries the mode it was captured with, so the `popstate`
//! handler knows whether to write the saved markup back as outer or inner
//! HTML.

use mx_dom::{Event, EventHandle};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::Mx;
use crate::swap::{SelectorSpec, SwapMode};
use crate::{debug_log, warn_log};

/// Saved markup of the elements one selector matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSnapshot {
	pub selector: String,
	pub htmls: Vec<String>,
}

/// State object stored in history entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
	#[serde(default)]
	pub swaps: Vec<SwapSnapshot>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
}

impl HistoryState {
	pub fn is_empty(&self) -> bool {
		self.swaps.is_empty() && self.title.is_none()
	}

	/// Reads a state object; anything that is not ours yields `None`.
	pub fn from_json(value: &serde_json::Value) -> Option<Self> {
		serde_json::from_value(value.clone()).ok()
	}
}

/// Outer or inner HTML is captured depending on what the swap replaces.
fn capture_mode(mode: SwapMode) -> SwapMode {
	match mode {
		SwapMode::OuterHtml | SwapMode::BeforeBegin | SwapMode::AfterEnd => SwapMode::OuterHtml,
		SwapMode::InnerHtml | SwapMode::AfterBegin | SwapMode::BeforeEnd => SwapMode::InnerHtml,
	}
}

/// Snapshots every distinct selector in `touched` together with the title.
pub fn capture(mx: &Mx, touched: &[SelectorSpec]) -> HistoryState {
	let mut swaps: Vec<SwapSnapshot> = Vec::new();
	for spec in touched {
		let spec = SelectorSpec {
			selector: spec.selector.clone(),
			mode: capture_mode(spec.mode),
		};
		let key = spec.to_string();
		if swaps.iter().any(|snapshot| snapshot.selector == key) {
			continue;
		}
		let Ok(elements) = mx.document().query_selector_all(&spec.selector) else {
			continue;
		};
		let htmls = elements
			.iter()
			.map(|element| match spec.mode {
				SwapMode::OuterHtml => element.outer_html(),
				_ => element.inner_html(),
			})
			.collect();
		swaps.push(SwapSnapshot { selector: key, htmls });
	}
	HistoryState {
		swaps,
		title: Some(mx.document().title()),
	}
}

/// Stores `state` in the current history entry, keeping its URL.
pub fn remember(mx: &Mx, state: &HistoryState) -> Result<()> {
	let json = serde_json::to_value(state)?;
	let title = mx.document().title();
	mx.history().replace_state(Some(json), &title, None)?;
	Ok(())
}

/// Writes saved markup back and restores the title.
pub fn restore(mx: &Mx, state: &HistoryState) {
	for snapshot in &state.swaps {
		let spec = SelectorSpec::parse(&snapshot.selector, SwapMode::OuterHtml);
		let elements = match mx.document().query_selector_all(&spec.selector) {
			Ok(elements) if !elements.is_empty() => elements,
			_ => {
				warn_log!(mx, "cannot restore '{}': no matching element", snapshot.selector);
				continue;
			}
		};
		for (element, html) in elements.iter().zip(&snapshot.htmls) {
			match spec.mode {
				SwapMode::OuterHtml => {
					if let Err(err) = element.set_outer_html(html) {
						warn_log!(mx, "cannot restore '{}': {}", snapshot.selector, err);
					}
				}
				_ => element.set_inner_html(html),
			}
		}
	}
	if let Some(title) = &state.title {
		mx.document().set_title(title);
	}
	debug_log!("restored {} snapshot(s) from history", state.swaps.len());
}

/// Installs the `popstate` handler.
pub(crate) fn install(mx: &Mx) -> EventHandle {
	let weak_mx = mx.downgrade();
	mx.window().add_event_listener("popstate", move |event: &Event| {
		let Some(mx) = weak_mx.upgrade() else {
			return;
		};
		let Some(state) = event.state().and_then(HistoryState::from_json) else {
			return;
		};
		if !state.is_empty() {
			restore(&mx, &state);
		}
	})
}
