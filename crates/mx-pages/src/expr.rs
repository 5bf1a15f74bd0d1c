//! Directive expression language.
//!
//! Expressions such as `count++`, `open = !open` or
//! `$cart.items.add({name: 'x'})` are parsed into an [`Expr`] tree and
//! evaluated against a [`Scope`]. Evaluation runs with the full privileges of
//! the host: there is no sandbox.

mod ast;
mod deps;
mod eval;
mod lexer;
mod parser;

pub use ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
pub use deps::{Dependency, DependencyRoot, dependencies};
pub use eval::{Scope, call_method, evaluate, evaluate_str, get_member};
pub use parser::parse_expression;

/// Parse and evaluation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
	#[error("syntax error: {0}")]
	Syntax(String),
	#[error("'{0}' is not a function")]
	NotCallable(String),
	#[error("cannot read properties of {receiver} (reading '{property}')")]
	NullReceiver { receiver: String, property: String },
	#[error("invalid assignment target: {0}")]
	InvalidAssignment(String),
	#[error("{receiver} has no method '{method}'")]
	UnknownMethod { receiver: String, method: String },
}
