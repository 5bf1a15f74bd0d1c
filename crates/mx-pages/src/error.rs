//! Error types for the runtime.

use mx_dom::{DomError, SelectorError};

use crate::expr::ExprError;
use crate::hydration::HydrationError;
use crate::request::TransportError;

/// Errors surfaced by the public API.
///
/// Most runtime problems are logged and skipped; only the cases callers can act
/// on are returned.
#[derive(Debug, thiserror::Error)]
pub enum MxError {
	/// `mx-data` (or a lookup) names a component that was never registered.
	#[error("component '{0}' is not registered")]
	UnregisteredComponent(String),
	/// A directive path could not be resolved to a proxy.
	#[error("cannot resolve scope for '{0}'")]
	UnresolvedScope(String),
	/// `add`/`prepend`/`insert`/`replace` on an item array without a template.
	#[error("item array '{0}' has no template element")]
	MissingTemplate(String),
	/// A deferred operation outlived the runtime that created it.
	#[error("the runtime owning '{0}' has been dropped")]
	RuntimeDropped(String),
	/// Expression failed to parse or evaluate.
	#[error(transparent)]
	Expression(#[from] ExprError),
	/// `swap_template` or `get_template` with an unknown name.
	#[error("template '{0}' not found")]
	TemplateNotFound(String),
	/// The transport failed.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// `MX-Redirect` chain exceeded the configured bound.
	#[error("too many redirects (limit {0})")]
	TooManyRedirects(usize),
	/// A URL could not be resolved against the current location.
	#[error("invalid url '{0}'")]
	InvalidUrl(String),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Dom(#[from] DomError),
	#[error(transparent)]
	Selector(#[from] SelectorError),
	#[error(transparent)]
	Hydration(#[from] HydrationError),
}

/// Result alias used across the crate.
pub type Result<T, E = MxError> = std::result::Result<T, E>;
