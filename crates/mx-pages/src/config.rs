//! Start-up configuration

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Options for [`Mx::start`](crate::Mx::start).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConfig {
	/// Selector of the hydration root
	#[serde(default = "default_root")]
	pub root: String,

	/// Attach the mutation observer after the first pass
	#[serde(default = "default_true")]
	pub observe: bool,

	/// Install the `popstate` restoration handler
	#[serde(default = "default_true")]
	pub history: bool,

	/// Configuration handed to named value parsers, keyed by parser name
	#[serde(default)]
	pub parsers: HashMap<String, serde_json::Value>,

	/// Upper bound on `MX-Redirect` chains
	#[serde(default = "default_max_redirects")]
	pub max_redirects: usize,
}

fn default_root() -> String {
	"body".to_string()
}

fn default_true() -> bool {
	true
}

fn default_max_redirects() -> usize {
	5
}

impl Default for StartConfig {
	fn default() -> Self {
		Self {
			root: default_root(),
			observe: true,
			history: true,
			parsers: HashMap::new(),
			max_redirects: default_max_redirects(),
		}
	}
}

impl StartConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
		serde_json::from_value(json)
	}

	pub fn root(mut self, selector: impl Into<String>) -> Self {
		self.root = selector.into();
		self
	}

	pub fn observe(mut self, observe: bool) -> Self {
		self.observe = observe;
		self
	}

	pub fn history(mut self, history: bool) -> Self {
		self.history = history;
		self
	}

	pub fn parser_config(mut self, parser: &str, config: serde_json::Value) -> Self {
		self.parsers.insert(parser.to_string(), config);
		self
	}

	pub fn max_redirects(mut self, max: usize) -> Self {
		self.max_redirects = max;
		self
	}

	/// Configuration for `parser`, `null` when none was given.
	pub fn parser_settings(&self, parser: &str) -> serde_json::Value {
		self.parsers.get(parser).cloned().unwrap_or(serde_json::Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_defaults_fill_missing_fields() {
		let config = StartConfig::from_json(json!({"root": "#app", "maxRedirects": 2})).unwrap();
		assert_eq!(config.root, "#app");
		assert!(config.observe);
		assert!(config.history);
		assert_eq!(config.max_redirects, 2);
	}

	#[rstest]
	fn test_builder() {
		let config = StartConfig::new()
			.observe(false)
			.parser_config("number", json!({"decimals": 2}));
		assert!(!config.observe);
		assert_eq!(config.parser_settings("number"), json!({"decimals": 2}));
		assert_eq!(config.parser_settings("currency"), serde_json::Value::Null);
	}
}
