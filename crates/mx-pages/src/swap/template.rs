//! Named client-side templates.
//!
//! ```html
//! <template mx-template="toast" mx-target="#toasts:beforeend">
//!   <div class="toast">{{ message }}</div>
//! </template>
//! ```
//!
//! `{{ path }}` placeholders are filled from JSON data; missing values render
//! as the empty string. Values are inserted verbatim.

use std::sync::LazyLock;

use mx_dom::Node;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::directive::TEMPLATE_ATTR;
use crate::error::{MxError, Result};
use crate::registry::Mx;

use super::engine::swap;
use super::strategy::{SwapOptions, SwapStrategy};

static PLACEHOLDER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern is valid"));

/// A collected `<template mx-template>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
	pub name: String,
	/// Template markup with unrendered placeholders.
	pub html: String,
	pub target: Option<String>,
	pub select: Option<String>,
	pub push_url: Option<String>,
	pub title: Option<String>,
}

fn attribute(element: &Node, name: &str) -> Option<String> {
	element
		.get_attribute(name)
		.map(|value| value.trim().to_string())
		.filter(|value| !value.is_empty())
}

impl Template {
	/// Reads a template element; `None` when it has no name.
	pub fn from_element(element: &Node) -> Option<Self> {
		Some(Self {
			name: attribute(element, TEMPLATE_ATTR)?,
			html: element.inner_html().trim().to_string(),
			target: attribute(element, "mx-target"),
			select: attribute(element, "mx-select"),
			push_url: attribute(element, "mx-push-url"),
			title: attribute(element, "mx-title"),
		})
	}
}

/// Per-call data and overrides for [`swap_template`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSwapOptions {
	#[serde(default)]
	pub data: serde_json::Value,
	#[serde(default)]
	pub target: Option<String>,
	#[serde(default)]
	pub select: Option<String>,
	#[serde(default)]
	pub push_url: Option<String>,
	#[serde(default)]
	pub title: Option<String>,
}

impl TemplateSwapOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn data(mut self, data: serde_json::Value) -> Self {
		self.data = data;
		self
	}

	pub fn target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}
}

fn lookup<'a>(data: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
	path.split('.').try_fold(data, |current, segment| match current {
		serde_json::Value::Object(map) => map.get(segment),
		serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
		_ => None,
	})
}

fn display(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::Null => String::new(),
		serde_json::Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

/// Substitutes `{{ path }}` placeholders in `source` from `data`.
pub fn render(source: &str, data: &serde_json::Value) -> String {
	PLACEHOLDER
		.replace_all(source, |captures: &Captures<'_>| {
			lookup(data, &captures[1]).map(display).unwrap_or_default()
		})
		.into_owned()
}

/// Renders the template `name` and swaps it, per-call options overriding the
/// template's own metadata. Without any target the result is smart-swapped.
pub fn swap_template(mx: &Mx, name: &str, options: &TemplateSwapOptions) -> Result<()> {
	let template = mx
		.get_template(name)
		.ok_or_else(|| MxError::TemplateNotFound(name.to_string()))?;
	let html = render(&template.html, &options.data);
	let target = options.target.clone().or(template.target);
	let select = options.select.clone().or(template.select);
	let strategies = target.map(|target| {
		vec![SwapStrategy {
			select,
			target,
		}]
	});
	let swap_options = SwapOptions {
		push_url: options.push_url.clone().or(template.push_url),
		history: false,
		title: options.title.clone().or(template.title),
	};
	swap(mx, &html, strategies.as_deref(), &swap_options)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StartConfig;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("<b>{{ name }}</b>", json!({"name": "Ada"}), "<b>Ada</b>")]
	#[case("{{user.age}} / {{ tags.1 }}", json!({"user": {"age": 36}, "tags": ["a", "b"]}), "36 / b")]
	#[case("[{{ missing }}][{{ nothing }}]", json!({"nothing": null}), "[][]")]
	#[case("{{ ok }}", json!({"ok": true}), "true")]
	fn test_render(#[case] source: &str, #[case] data: serde_json::Value, #[case] expected: &str) {
		assert_eq!(render(source, &data), expected);
	}

	#[rstest]
	fn test_swap_template_uses_metadata_and_overrides() {
		let mx = Mx::new();
		mx.document().body().set_inner_html(
			r##"<ul id="a"></ul><ul id="b"></ul><template mx-template="row" mx-target="#a:beforeend"><li>{{ n }}</li></template>"##,
		);
		mx.start(StartConfig::new().observe(false).history(false)).unwrap();

		mx.swap_template("row", &TemplateSwapOptions::new().data(json!({"n": 1}))).unwrap();
		mx.swap_template("row", &TemplateSwapOptions::new().data(json!({"n": 2})).target("#b:beforeend"))
			.unwrap();
		assert_eq!(mx.document().get_element_by_id("a").unwrap().inner_html(), "<li>1</li>");
		assert_eq!(mx.document().get_element_by_id("b").unwrap().inner_html(), "<li>2</li>");

		let err = mx.swap_template("nope", &TemplateSwapOptions::new()).unwrap_err();
		assert_eq!(err.to_string(), "template 'nope' not found");
	}
}
