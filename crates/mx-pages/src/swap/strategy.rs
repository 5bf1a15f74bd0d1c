//! Swap strategies and options.

use std::fmt;
use std::str::FromStr;

use mx_dom::InsertPosition;
use serde::{Deserialize, Serialize};

/// How incoming content is applied to a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapMode {
	InnerHtml,
	OuterHtml,
	BeforeBegin,
	AfterBegin,
	BeforeEnd,
	AfterEnd,
}

impl SwapMode {
	pub const ALL: [SwapMode; 6] = [
		Self::InnerHtml,
		Self::OuterHtml,
		Self::BeforeBegin,
		Self::AfterBegin,
		Self::BeforeEnd,
		Self::AfterEnd,
	];

	/// Case-insensitive lookup of `innerHTML`, `beforeend`, ...
	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::InnerHtml => "innerHTML",
			Self::OuterHtml => "outerHTML",
			Self::BeforeBegin => "beforebegin",
			Self::AfterBegin => "afterbegin",
			Self::BeforeEnd => "beforeend",
			Self::AfterEnd => "afterend",
		}
	}

	/// The `insertAdjacent*` position of the four insertion modes.
	pub fn insert_position(&self) -> Option<InsertPosition> {
		match self {
			Self::BeforeBegin => Some(InsertPosition::BeforeBegin),
			Self::AfterBegin => Some(InsertPosition::AfterBegin),
			Self::BeforeEnd => Some(InsertPosition::BeforeEnd),
			Self::AfterEnd => Some(InsertPosition::AfterEnd),
			Self::InnerHtml | Self::OuterHtml => None,
		}
	}
}

impl fmt::Display for SwapMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SwapMode {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::parse(value).ok_or_else(|| format!("unknown swap mode '{}'", value))
	}
}

/// A CSS selector with its trailing `:mode`.
///
/// The suffix is only split off when it names a mode, so pseudo-classes such
/// as `li:first-child` stay part of the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSpec {
	pub selector: String,
	pub mode: SwapMode,
}

impl SelectorSpec {
	pub fn parse(raw: &str, default: SwapMode) -> Self {
		let raw = raw.trim();
		if let Some((selector, suffix)) = raw.rsplit_once(':')
			&& let Some(mode) = SwapMode::parse(suffix)
		{
			return Self {
				selector: selector.trim().to_string(),
				mode,
			};
		}
		Self {
			selector: raw.to_string(),
			mode: default,
		}
	}
}

impl fmt::Display for SelectorSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.selector, self.mode)
	}
}

/// One `{select?, target}` pair, as accepted by `swap` and sent in the
/// `X-Swap-Strategies` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStrategy {
	/// Source selector (`innerHTML` by default).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub select: Option<String>,
	/// Destination selector (`outerHTML` by default).
	pub target: String,
}

impl SwapStrategy {
	pub fn new(target: impl Into<String>) -> Self {
		Self {
			select: None,
			target: target.into(),
		}
	}

	pub fn select(mut self, select: impl Into<String>) -> Self {
		self.select = Some(select.into());
		self
	}

	pub fn target_spec(&self) -> SelectorSpec {
		SelectorSpec::parse(&self.target, SwapMode::OuterHtml)
	}

	pub fn select_spec(&self) -> Option<SelectorSpec> {
		self.select
			.as_deref()
			.map(|select| SelectorSpec::parse(select, SwapMode::InnerHtml))
	}
}

/// History and title options of a swap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOptions {
	/// URL pushed after the swap.
	#[serde(default)]
	pub push_url: Option<String>,
	/// Push a history entry even without a new URL.
	#[serde(default)]
	pub history: bool,
	/// Document title set after the swap.
	#[serde(default)]
	pub title: Option<String>,
}

impl SwapOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_url(mut self, url: impl Into<String>) -> Self {
		self.push_url = Some(url.into());
		self
	}

	pub fn history(mut self, history: bool) -> Self {
		self.history = history;
		self
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Whether the swap records and pushes a history entry.
	pub fn affects_history(&self) -> bool {
		self.history || self.push_url.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("#main", "#main", SwapMode::OuterHtml)]
	#[case("#main:innerHTML", "#main", SwapMode::InnerHtml)]
	#[case("#list:BeforeEnd", "#list", SwapMode::BeforeEnd)]
	#[case("li:first-child", "li:first-child", SwapMode::OuterHtml)]
	#[case("ul li:last-child:afterend", "ul li:last-child", SwapMode::AfterEnd)]
	fn test_selector_spec_parse(#[case] raw: &str, #[case] selector: &str, #[case] mode: SwapMode) {
		let spec = SelectorSpec::parse(raw, SwapMode::OuterHtml);
		assert_eq!(spec.selector, selector);
		assert_eq!(spec.mode, mode);
	}

	#[rstest]
	fn test_strategy_defaults() {
		let strategy = SwapStrategy::new("#content").select(".body");
		assert_eq!(strategy.target_spec().mode, SwapMode::OuterHtml);
		assert_eq!(strategy.select_spec().unwrap().mode, SwapMode::InnerHtml);
	}

	#[rstest]
	fn test_strategies_deserialize_from_header_json() {
		let strategies: Vec<SwapStrategy> =
			serde_json::from_value(json!([{"target": "#a"}, {"select": "#b", "target": "#c:innerHTML"}])).unwrap();
		assert_eq!(strategies[0], SwapStrategy::new("#a"));
		assert_eq!(strategies[1].select.as_deref(), Some("#b"));
	}

	#[rstest]
	fn test_options_affect_history() {
		assert!(!SwapOptions::new().title("x").affects_history());
		assert!(SwapOptions::new().push_url("/a").affects_history());
		assert!(SwapOptions::new().history(true).affects_history());
	}
}
