//! Error types for DOM operations.

use crate::selector::SelectorError;

/// Errors raised by structural DOM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The operation would create a cycle or insert into a leaf node.
	#[error("hierarchy request error: {0}")]
	Hierarchy(String),
	/// A reference node is not a child of the node operated on.
	#[error("node not found: {0}")]
	NotFound(String),
	/// The operation requires a parent node.
	#[error("node has no parent")]
	NoParent,
	/// Both nodes must belong to the same document.
	#[error("node belongs to another document")]
	WrongDocument,
	/// Invalid CSS selector.
	#[error(transparent)]
	Selector(#[from] SelectorError),
	/// A history URL could not be resolved.
	#[error("invalid url '{0}'")]
	InvalidUrl(String),
	/// Unknown `insertAdjacent*` position.
	#[error("invalid insert position '{0}'")]
	InvalidPosition(String),
}
